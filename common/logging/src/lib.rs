#[macro_use]
extern crate lazy_static;

use consensus_metrics::{inc_counter, try_create_int_counter, IntCounter, Result as MetricsResult};
use slog::{o, Drain, Logger, OwnedKVList, Record};
use sloggers::types::Severity;
use sloggers::Build;

lazy_static! {
    pub static ref INFOS_TOTAL: MetricsResult<IntCounter> =
        try_create_int_counter("info_total", "Count of infos logged");
    pub static ref WARNS_TOTAL: MetricsResult<IntCounter> =
        try_create_int_counter("warn_total", "Count of warns logged");
    pub static ref ERRORS_TOTAL: MetricsResult<IntCounter> =
        try_create_int_counter("error_total", "Count of errors logged");
    pub static ref CRITS_TOTAL: MetricsResult<IntCounter> =
        try_create_int_counter("crit_total", "Count of crits logged");
}

/// A `Drain` that counts records by level before handing them to the wrapped drain.
pub struct CountingDrain<D> {
    wrapped: D,
}

impl<D> CountingDrain<D> {
    pub fn new(wrapped: D) -> Self {
        Self { wrapped }
    }
}

impl<D: Drain> Drain for CountingDrain<D> {
    type Ok = D::Ok;
    type Err = D::Err;

    fn log(&self, record: &Record, values: &OwnedKVList) -> Result<Self::Ok, Self::Err> {
        match record.level() {
            slog::Level::Info => inc_counter(&INFOS_TOTAL),
            slog::Level::Warning => inc_counter(&WARNS_TOTAL),
            slog::Level::Error => inc_counter(&ERRORS_TOTAL),
            slog::Level::Critical => inc_counter(&CRITS_TOTAL),
            _ => (),
        }
        self.wrapped.log(record, values)
    }
}

/// Build a logger that writes to stderr at `level` and above, counting records as it goes.
///
/// `level` is one of `trace`, `debug`, `info`, `warning`, `error` or `critical`.
pub fn terminal_logger(level: &str) -> Result<Logger, String> {
    let severity = level
        .parse::<Severity>()
        .map_err(|e| format!("Invalid log level {:?}: {:?}", level, e))?;
    let inner = sloggers::terminal::TerminalLoggerBuilder::new()
        .level(severity)
        .destination(sloggers::terminal::Destination::Stderr)
        .build()
        .map_err(|e| format!("Unable to build terminal logger: {:?}", e))?;
    Ok(Logger::root(CountingDrain::new(inner).fuse(), o!()))
}

/// Return a logger suitable for test usage.
///
/// By default no logs will be printed, but they can be enabled via the `test_logger` feature:
///
/// ```bash
/// cargo test -p beacon_transition --features 'logging/test_logger'
/// ```
pub fn test_logger() -> Logger {
    if cfg!(feature = "test_logger") {
        sloggers::terminal::TerminalLoggerBuilder::new()
            .level(Severity::Debug)
            .build()
            .expect("Should build test_logger")
    } else {
        sloggers::null::NullLoggerBuilder
            .build()
            .expect("Should build null_logger")
    }
}
