pub use consensus_metrics::*;

lazy_static::lazy_static! {
    /*
     * Engine
     */
    pub static ref ENGINE_BLOCK_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_transition_block_seconds",
        "Full runtime of applying a block through the engine, including skipped slots"
    );
    pub static ref ENGINE_BLOCK_PROCESSING_SUCCESSES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_block_successes_total",
        "Count of blocks applied without error"
    );
    pub static ref ENGINE_SLOT_PROCESSING_TIMES: Result<Histogram> = try_create_histogram(
        "beacon_transition_slots_seconds",
        "Runtime of advancing the engine's state through empty slots"
    );
    pub static ref ENGINE_TRANSITION_FAILURES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_failures_total",
        "Count of transitions rejected by the engine"
    );
    pub static ref ENGINE_HEAD_SLOT: Result<IntGauge> = try_create_int_gauge(
        "beacon_transition_head_slot",
        "Slot of the engine's state"
    );
    pub static ref ENGINE_FINALIZED_EPOCH: Result<IntGauge> = try_create_int_gauge(
        "beacon_transition_finalized_epoch",
        "Finalized epoch of the engine's state"
    );

    /*
     * Caches
     */
    pub static ref SHUFFLING_CACHE_HITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_shuffling_cache_hits_total",
        "Count of committee cache lookups served from the shuffling cache"
    );
    pub static ref SHUFFLING_CACHE_MISSES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_shuffling_cache_misses_total",
        "Count of committee cache lookups that computed a shuffling"
    );
    pub static ref SHUFFLING_CACHE_PROMISE_WAITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_shuffling_cache_promise_waits_total",
        "Count of shuffling lookups that waited on another caller's computation"
    );
    pub static ref SHUFFLING_CACHE_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_transition_shuffling_cache_size",
        "Number of entries in the shuffling cache"
    );
    pub static ref PROPOSER_CACHE_HITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_proposer_cache_hits_total",
        "Count of proposer lookups served from the proposer cache"
    );
    pub static ref PROPOSER_CACHE_MISSES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_proposer_cache_misses_total",
        "Count of proposer lookups that computed the proposers for an epoch"
    );
    pub static ref PROPOSER_CACHE_PROMISE_WAITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_proposer_cache_promise_waits_total",
        "Count of proposer lookups that waited on another caller's computation"
    );
    pub static ref PROPOSER_CACHE_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_transition_proposer_cache_size",
        "Number of entries in the proposer cache"
    );
    pub static ref TOTAL_ACTIVE_BALANCE_CACHE_HITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_total_active_balance_cache_hits_total",
        "Count of total active balance lookups served from the cache"
    );
    pub static ref TOTAL_ACTIVE_BALANCE_CACHE_MISSES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_total_active_balance_cache_misses_total",
        "Count of total active balance lookups that summed the registry"
    );
    pub static ref TOTAL_ACTIVE_BALANCE_CACHE_PROMISE_WAITS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_total_active_balance_cache_promise_waits_total",
        "Count of total active balance lookups that waited on another caller's computation"
    );
    pub static ref TOTAL_ACTIVE_BALANCE_CACHE_SIZE: Result<IntGauge> = try_create_int_gauge(
        "beacon_transition_total_active_balance_cache_size",
        "Number of entries in the total active balance cache"
    );
    pub static ref CACHE_MAINTENANCE_FAILURES: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_cache_maintenance_failures_total",
        "Count of cache maintenance failures which did not fail a transition"
    );
    pub static ref CACHE_CLEARS: Result<IntCounter> = try_create_int_counter(
        "beacon_transition_cache_clears_total",
        "Count of times every cache was cleared"
    );
}
