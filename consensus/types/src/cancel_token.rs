use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How many items a long-running loop processes between checks of its `CancelToken`.
pub const CANCEL_CHECK_INTERVAL: usize = 1024;

/// A shared flag that lets the owner of a transition abandon expensive cache builds.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `true` if the loop at `index` should stop.
    ///
    /// The flag is only read every `CANCEL_CHECK_INTERVAL` indices.
    pub fn should_stop_at(&self, index: usize) -> bool {
        index % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn checks_at_interval() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.should_stop_at(0));
        assert!(!token.should_stop_at(1));
        assert!(token.should_stop_at(CANCEL_CHECK_INTERVAL));
    }
}
