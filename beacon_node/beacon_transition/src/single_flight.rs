//! The locking layer shared by every transition cache.
//!
//! A `SingleFlightCache` wraps a `PromiseCache` in a mutex. The first caller to miss on a key
//! leaves a promise in the cache and computes the value with the lock released; callers that miss
//! on the same key meanwhile wait on the promise instead of repeating the work.
use crate::errors::CacheMaintenanceError;
use crate::metrics::{self, IntCounter, IntGauge, Result as MetricsResult};
use parking_lot::Mutex;
use promise_cache::{CacheItem, PromiseCache, PromiseCacheError, Protect};
use slog::{debug, warn, Logger};
use std::sync::Arc;
use types::{Epoch, Hash256};

/// Identifies a value by the epoch it applies to and the root that decided it.
///
/// Two states that agree on the decision root agree on the value, whichever block they are at.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct EpochKey {
    pub epoch: Epoch,
    pub decision_root: Hash256,
}

impl EpochKey {
    pub fn new(epoch: Epoch, decision_root: Hash256) -> Self {
        Self {
            epoch,
            decision_root,
        }
    }
}

/// Evicts the oldest epochs first and keeps the head and finalized epochs no matter what.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochProtector {
    pub head_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

impl Protect<EpochKey> for EpochProtector {
    type SortKey = Epoch;

    fn sort_key(&self, k: &EpochKey) -> Epoch {
        k.epoch
    }

    fn protect_from_eviction(&self, k: &EpochKey) -> bool {
        k.epoch == self.head_epoch || k.epoch == self.finalized_epoch
    }

    fn notify_eviction(&self, k: &EpochKey, log: &Logger) {
        debug!(
            log,
            "Evicting cache entry";
            "epoch" => k.epoch.as_u64(),
            "decision_root" => ?k.decision_root,
            "head_epoch" => self.head_epoch.as_u64(),
        );
    }
}

/// The counters one cache reports to.
pub struct CacheMetrics {
    pub hits: &'static MetricsResult<IntCounter>,
    pub misses: &'static MetricsResult<IntCounter>,
    pub promise_waits: &'static MetricsResult<IntCounter>,
    pub size: &'static MetricsResult<IntGauge>,
}

enum Lookup<V> {
    Found(CacheItem<V>),
    Promised(oneshot_broadcast::Sender<Arc<V>>),
    Unavailable(PromiseCacheError),
}

pub struct SingleFlightCache<V> {
    name: &'static str,
    cache: Mutex<PromiseCache<EpochKey, V, EpochProtector>>,
    metrics: CacheMetrics,
    log: Logger,
}

impl<V> SingleFlightCache<V> {
    pub fn new(name: &'static str, capacity: usize, metrics: CacheMetrics, log: Logger) -> Self {
        Self {
            name,
            cache: Mutex::new(PromiseCache::new(
                capacity,
                EpochProtector::default(),
                log.clone(),
            )),
            metrics,
            log,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.lock().is_enabled()
    }

    /// Returns the value for `key`, computing it with `compute` if no other caller has.
    ///
    /// An error from `compute` is returned as-is and leaves nothing in the cache. Problems with the
    /// cache itself are pushed onto `maintenance` and the value is computed without it.
    pub fn get_or_compute<F, Err>(
        &self,
        key: EpochKey,
        compute: F,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<Arc<V>, Err>
    where
        F: FnOnce() -> Result<Arc<V>, Err>,
    {
        let lookup = {
            let mut cache = self.cache.lock();
            if !cache.is_enabled() {
                drop(cache);
                return compute();
            }
            match cache.get(&key) {
                Some(item) => Lookup::Found(item),
                None => match cache.create_promise(key) {
                    Ok(sender) => Lookup::Promised(sender),
                    Err(e) => Lookup::Unavailable(e),
                },
            }
        };

        match lookup {
            Lookup::Found(item) => {
                metrics::inc_counter(self.metrics.hits);
                if item.is_promise() {
                    metrics::inc_counter(self.metrics.promise_waits);
                }
                match item.wait() {
                    Ok(value) => Ok(value),
                    // Whoever held the promise gave up. Their error is theirs to report; all we can
                    // do is try for ourselves.
                    Err(e) => {
                        self.record(e, maintenance);
                        compute()
                    }
                }
            }
            Lookup::Promised(sender) => {
                metrics::inc_counter(self.metrics.misses);
                debug!(
                    self.log,
                    "Cache miss";
                    "cache" => self.name,
                    "epoch" => key.epoch.as_u64(),
                    "decision_root" => ?key.decision_root,
                );
                match compute() {
                    Ok(value) => {
                        let mut cache = self.cache.lock();
                        cache.resolve_promise(sender, key, &value);
                        metrics::set_gauge(self.metrics.size, cache.len() as i64);
                        Ok(value)
                    }
                    Err(e) => {
                        // Waiters see `SenderDropped` and compute for themselves.
                        drop(sender);
                        self.cache.lock().remove(&key);
                        Err(e)
                    }
                }
            }
            Lookup::Unavailable(e) => {
                metrics::inc_counter(self.metrics.misses);
                self.record(e, maintenance);
                compute()
            }
        }
    }

    /// Returns the value for `key` if it is complete, without waiting on promises.
    pub fn peek(&self, key: &EpochKey) -> Option<Arc<V>> {
        match self.cache.lock().get(key)? {
            CacheItem::Complete(value) => Some(value),
            CacheItem::Promise(_) => None,
        }
    }

    /// Store a value that was computed outside of `get_or_compute`.
    pub fn insert(&self, key: EpochKey, value: Arc<V>) {
        let mut cache = self.cache.lock();
        cache.insert_value(key, &value);
        metrics::set_gauge(self.metrics.size, cache.len() as i64);
    }

    pub fn contains(&self, key: &EpochKey) -> bool {
        self.cache.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
        metrics::set_gauge(self.metrics.size, 0);
    }

    pub fn update_protector(&self, protector: EpochProtector) {
        self.cache.lock().update_protector(protector);
    }

    fn record(&self, error: PromiseCacheError, maintenance: &mut Vec<CacheMaintenanceError>) {
        metrics::inc_counter(&metrics::CACHE_MAINTENANCE_FAILURES);
        warn!(
            self.log,
            "Transition cache unavailable";
            "cache" => self.name,
            "error" => ?error,
        );
        maintenance.push(CacheMaintenanceError::PromiseCache {
            cache: self.name,
            error,
        });
    }
}

/// Count, log and collect a maintenance failure raised outside of a `SingleFlightCache`.
pub fn record_maintenance_error(
    log: &Logger,
    error: CacheMaintenanceError,
    maintenance: &mut Vec<CacheMaintenanceError>,
) {
    metrics::inc_counter(&metrics::CACHE_MAINTENANCE_FAILURES);
    warn!(
        log,
        "Transition cache maintenance failed";
        "cache" => error.cache(),
        "error" => ?error,
    );
    maintenance.push(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::test_logger;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn test_metrics() -> CacheMetrics {
        CacheMetrics {
            hits: &metrics::SHUFFLING_CACHE_HITS,
            misses: &metrics::SHUFFLING_CACHE_MISSES,
            promise_waits: &metrics::SHUFFLING_CACHE_PROMISE_WAITS,
            size: &metrics::SHUFFLING_CACHE_SIZE,
        }
    }

    fn key(epoch: u64) -> EpochKey {
        EpochKey::new(Epoch::new(epoch), Hash256::from_low_u64_be(epoch))
    }

    #[test]
    fn concurrent_misses_compute_once() {
        let cache = Arc::new(SingleFlightCache::<u64>::new(
            "test",
            16,
            test_metrics(),
            test_logger(),
        ));
        let computed = Arc::new(AtomicUsize::new(0));
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles = (0..threads)
            .map(|_| {
                let cache = cache.clone();
                let computed = computed.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let mut maintenance = vec![];
                    let value = cache
                        .get_or_compute(
                            key(3),
                            || -> Result<Arc<u64>, ()> {
                                computed.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(Duration::from_millis(50));
                                Ok(Arc::new(42))
                            },
                            &mut maintenance,
                        )
                        .unwrap();
                    assert!(maintenance.is_empty());
                    *value
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&key(3)).as_deref(), Some(&42));
    }

    #[test]
    fn failed_compute_leaves_no_entry() {
        let cache = SingleFlightCache::<u64>::new("test", 4, test_metrics(), test_logger());
        let mut maintenance = vec![];
        let result = cache.get_or_compute(key(1), || Err::<Arc<u64>, _>("nope"), &mut maintenance);
        assert_eq!(result, Err("nope"));
        assert!(!cache.contains(&key(1)));

        let value = cache
            .get_or_compute(key(1), || Ok::<_, ()>(Arc::new(7)), &mut maintenance)
            .unwrap();
        assert_eq!(*value, 7);
        assert!(maintenance.is_empty());
    }

    #[test]
    fn disabled_cache_always_computes() {
        let cache = SingleFlightCache::<u64>::new("test", 0, test_metrics(), test_logger());
        let mut maintenance = vec![];
        let mut computed = 0;
        for _ in 0..3 {
            let value = cache
                .get_or_compute(
                    key(1),
                    || {
                        computed += 1;
                        Ok::<_, ()>(Arc::new(9))
                    },
                    &mut maintenance,
                )
                .unwrap();
            assert_eq!(*value, 9);
        }
        assert_eq!(computed, 3);
        assert!(cache.is_empty());
        assert!(maintenance.is_empty());
    }

    #[test]
    fn head_and_finalized_epochs_survive_eviction() {
        let cache = SingleFlightCache::<u64>::new("test", 2, test_metrics(), test_logger());
        cache.update_protector(EpochProtector {
            head_epoch: Epoch::new(1),
            finalized_epoch: Epoch::new(0),
        });
        for epoch in 0..6 {
            cache.insert(key(epoch), Arc::new(epoch));
        }
        assert!(cache.contains(&key(0)));
        assert!(cache.contains(&key(1)));
        assert!(cache.contains(&key(5)));
        assert!(!cache.contains(&key(2)));
    }

    #[test]
    fn exhausted_promises_are_reported() {
        let cache = SingleFlightCache::<u64>::new("test", 16, test_metrics(), test_logger());
        let held = (0..2)
            .map(|epoch| cache.cache.lock().create_promise(key(epoch)).unwrap())
            .collect::<Vec<_>>();

        let mut maintenance = vec![];
        let value = cache
            .get_or_compute(key(10), || Ok::<_, ()>(Arc::new(5)), &mut maintenance)
            .unwrap();
        assert_eq!(*value, 5);
        assert_eq!(
            maintenance,
            vec![CacheMaintenanceError::PromiseCache {
                cache: "test",
                error: PromiseCacheError::MaxConcurrentPromises(2),
            }]
        );
        drop(held);
    }
}
