//! A bounded cache whose entries may be values or promises of values.
//!
//! A caller that misses creates a promise while holding the cache lock, releases the lock,
//! computes the value and then resolves the promise. Concurrent callers that ask for the same key
//! in the meantime receive the promise and block on it instead of repeating the work.
//!
//! The cache itself is not synchronised; wrap it in a mutex.
use derivative::Derivative;
use itertools::Itertools;
use oneshot_broadcast::{oneshot, Receiver, Sender};
use slog::Logger;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug)]
pub struct PromiseCache<K, V, P>
where
    K: Hash + Eq + Clone,
    P: Protect<K>,
{
    cache: HashMap<K, CacheItem<V>>,
    capacity: usize,
    protector: P,
    max_concurrent_promises: usize,
    logger: Logger,
}

/// Decides which keys may be evicted, and in which order.
pub trait Protect<K> {
    type SortKey: Ord;

    /// Keys with the lowest sort key are evicted first.
    fn sort_key(&self, k: &K) -> Self::SortKey;

    /// Protected keys are never evicted, even if that takes the cache over capacity.
    fn protect_from_eviction(&self, k: &K) -> bool;

    fn notify_eviction(&self, _k: &K, _log: &Logger) {}
}

#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub enum CacheItem<T> {
    Complete(Arc<T>),
    Promise(Receiver<Arc<T>>),
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheItem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            CacheItem::Complete(value) => value.fmt(f),
            CacheItem::Promise(_) => "Promise(..)".fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromiseCacheError {
    /// The computation behind a promise was abandoned before it produced a value.
    Failed(oneshot_broadcast::Error),
    MaxConcurrentPromises(usize),
    /// The cache was created with zero capacity.
    Disabled,
}

pub trait ToArc<T> {
    fn to_arc(&self) -> Arc<T>;
}

impl<T> CacheItem<T> {
    pub fn is_promise(&self) -> bool {
        matches!(self, CacheItem::Promise(_))
    }

    /// Return the value, blocking until it is available if this is a promise.
    pub fn wait(self) -> Result<Arc<T>, PromiseCacheError> {
        match self {
            CacheItem::Complete(value) => Ok(value),
            CacheItem::Promise(receiver) => receiver.recv().map_err(PromiseCacheError::Failed),
        }
    }
}

impl<T> ToArc<T> for Arc<T> {
    fn to_arc(&self) -> Arc<T> {
        self.clone()
    }
}

impl<T> ToArc<T> for T
where
    T: Clone,
{
    fn to_arc(&self) -> Arc<T> {
        Arc::new(self.clone())
    }
}

impl<K, V, P> PromiseCache<K, V, P>
where
    K: Hash + Eq + Clone,
    P: Protect<K>,
{
    /// A cache holding at most `capacity` unprotected entries. A `capacity` of zero disables it.
    pub fn new(capacity: usize, protector: P, logger: Logger) -> Self {
        // Derived from the capacity rather than configured separately.
        let max_concurrent_promises = std::cmp::max(2, capacity / 8);
        Self {
            cache: HashMap::new(),
            capacity,
            protector,
            max_concurrent_promises,
            logger,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn get(&mut self, key: &K) -> Option<CacheItem<V>> {
        match self.cache.get(key) {
            item @ Some(CacheItem::Complete(_)) => item.cloned(),
            // Check whether the promise has resolved, without waiting for it.
            item @ Some(CacheItem::Promise(receiver)) => match receiver.try_recv() {
                // Resolved: upgrade the entry to `Complete`.
                Ok(Some(value)) => {
                    let ready = CacheItem::Complete(value);
                    self.insert_cache_item(key.clone(), ready.clone());
                    Some(ready)
                }
                // Still in progress, the caller may wait on it.
                Ok(None) => item.cloned(),
                // The sender was dropped without a value, so the computation failed. Forget the
                // key so the caller can compute it afresh.
                Err(oneshot_broadcast::Error::SenderDropped) => {
                    self.cache.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }

    /// Store `value` under `key` unless a complete value is already present.
    pub fn insert_value<C: ToArc<V>>(&mut self, key: K, value: &C) {
        if self
            .cache
            .get(&key)
            // A finished value replaces an outstanding promise.
            .map_or(true, CacheItem::is_promise)
        {
            self.insert_cache_item(key, CacheItem::Complete(value.to_arc()));
        }
    }

    /// Deliver `value` to everyone waiting on `sender`'s promise and keep it for later callers.
    pub fn resolve_promise<C: ToArc<V>>(&mut self, sender: Sender<Arc<V>>, key: K, value: &C) {
        let arc_value = value.to_arc();
        sender.send(arc_value.clone());

        // The promise may have been evicted meanwhile; a freshly resolved value is still worth
        // keeping over older entries.
        self.insert_value(key, &arc_value);
    }

    /// Prunes the cache first before inserting a new item.
    fn insert_cache_item(&mut self, key: K, cache_item: CacheItem<V>) {
        if !self.is_enabled() {
            return;
        }
        self.prune_cache();
        self.cache.insert(key, cache_item);
    }

    /// Record that the value for `key` is being computed.
    ///
    /// Callers must check `get` first, under the same lock, so that a key is only promised once.
    pub fn create_promise(&mut self, key: K) -> Result<Sender<Arc<V>>, PromiseCacheError> {
        if !self.is_enabled() {
            return Err(PromiseCacheError::Disabled);
        }

        let num_active_promises = self.cache.values().filter(|item| item.is_promise()).count();
        if num_active_promises >= self.max_concurrent_promises {
            return Err(PromiseCacheError::MaxConcurrentPromises(
                num_active_promises,
            ));
        }

        let (sender, receiver) = oneshot();
        self.insert_cache_item(key, CacheItem::Promise(receiver));
        Ok(sender)
    }

    fn prune_cache(&mut self) {
        let target_cache_size = self.capacity.saturating_sub(1);
        if let Some(prune_count) = self.cache.len().checked_sub(target_cache_size) {
            let keys_to_prune = self
                .cache
                .keys()
                .filter(|k| !self.protector.protect_from_eviction(*k))
                .sorted_by_key(|k| self.protector.sort_key(k))
                .take(prune_count)
                .cloned()
                .collect::<Vec<_>>();

            for key in &keys_to_prune {
                self.protector.notify_eviction(key, &self.logger);
                self.cache.remove(key);
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<CacheItem<V>> {
        self.cache.remove(key)
    }

    /// Drop every entry, promises included. Waiters on dropped promises still receive their value
    /// when it resolves; it just won't be cached.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn update_protector(&mut self, protector: P) {
        self.protector = protector;
    }

    pub fn protector(&self) -> &P {
        &self.protector
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_concurrent_promises(&self) -> usize {
        self.max_concurrent_promises
    }
}
