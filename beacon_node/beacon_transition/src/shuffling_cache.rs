use crate::errors::CacheMaintenanceError;
use crate::metrics;
use crate::single_flight::{
    record_maintenance_error, CacheMetrics, EpochKey, EpochProtector, SingleFlightCache,
};
use slog::Logger;
use std::sync::Arc;
use types::beacon_state::CommitteeCache;
use types::{BeaconState, BeaconStateError, CancelToken, ChainSpec, EthSpec, Hash256, RelativeEpoch};

const CACHE_NAME: &str = "shuffling";

/// Keeps `CommitteeCache`s across states, keyed by the block that decided their shuffling.
///
/// It has been named `ShufflingCache` because `CommitteeCacheCache` is a bit weird and looks like
/// a find/replace error.
pub struct ShufflingCache {
    cache: SingleFlightCache<CommitteeCache>,
}

impl ShufflingCache {
    pub fn new(capacity: usize, log: Logger) -> Self {
        let metrics = CacheMetrics {
            hits: &metrics::SHUFFLING_CACHE_HITS,
            misses: &metrics::SHUFFLING_CACHE_MISSES,
            promise_waits: &metrics::SHUFFLING_CACHE_PROMISE_WAITS,
            size: &metrics::SHUFFLING_CACHE_SIZE,
        };
        Self {
            cache: SingleFlightCache::new(CACHE_NAME, capacity, metrics, log),
        }
    }

    /// The key of the shuffling for `relative_epoch` of `state`.
    ///
    /// `head_block_root` must be the root of the latest block applied to `state`.
    pub fn shuffling_id<E: EthSpec>(
        state: &BeaconState<E>,
        head_block_root: Hash256,
        relative_epoch: RelativeEpoch,
    ) -> Result<EpochKey, BeaconStateError> {
        let epoch = relative_epoch.into_epoch(state.current_epoch());
        let decision_root = state.attester_shuffling_decision_root(head_block_root, relative_epoch)?;
        Ok(EpochKey::new(epoch, decision_root))
    }

    /// Return the committee cache for `relative_epoch`, from the cache if possible.
    ///
    /// The committee cache already on `state` is preferred over both.
    pub fn get_or_compute<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        head_block_root: Hash256,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
        cancel: &CancelToken,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<Arc<CommitteeCache>, BeaconStateError> {
        if let Ok(committee_cache) = state.committee_cache(relative_epoch) {
            return Ok(committee_cache.clone());
        }

        let epoch = relative_epoch.into_epoch(state.current_epoch());
        let compute = || CommitteeCache::initialized_with_cancel(state, epoch, spec, cancel);

        match Self::shuffling_id(state, head_block_root, relative_epoch) {
            Ok(key) => self.cache.get_or_compute(key, compute, maintenance),
            Err(error) => {
                record_maintenance_error(
                    self.cache.log(),
                    CacheMaintenanceError::KeyUnavailable {
                        cache: CACHE_NAME,
                        error,
                    },
                    maintenance,
                );
                compute()
            }
        }
    }

    /// Make sure `state` has a committee cache for `relative_epoch`.
    ///
    /// A cache the state already holds is stored for other states to use.
    pub fn prime<E: EthSpec>(
        &self,
        state: &mut BeaconState<E>,
        head_block_root: Hash256,
        relative_epoch: RelativeEpoch,
        spec: &ChainSpec,
        cancel: &CancelToken,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<(), BeaconStateError> {
        if state.committee_cache_is_initialized(relative_epoch) {
            self.remember(state, head_block_root, relative_epoch, maintenance);
            return Ok(());
        }

        let committee_cache = self.get_or_compute(
            state,
            head_block_root,
            relative_epoch,
            spec,
            cancel,
            maintenance,
        )?;
        if let Err(error) = state.install_committee_cache(relative_epoch, committee_cache) {
            record_maintenance_error(
                self.cache.log(),
                CacheMaintenanceError::InstallFailed {
                    cache: CACHE_NAME,
                    error,
                },
                maintenance,
            );
            state.build_committee_cache_with_cancel(relative_epoch, spec, cancel)?;
        }
        Ok(())
    }

    /// Store the committee cache that `state` holds for `relative_epoch`, if it has one.
    pub fn remember<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        head_block_root: Hash256,
        relative_epoch: RelativeEpoch,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) {
        let Ok(committee_cache) = state.committee_cache(relative_epoch) else {
            return;
        };
        match Self::shuffling_id(state, head_block_root, relative_epoch) {
            Ok(key) => {
                if !self.cache.contains(&key) {
                    self.cache.insert(key, committee_cache.clone());
                }
            }
            Err(error) => record_maintenance_error(
                self.cache.log(),
                CacheMaintenanceError::KeyUnavailable {
                    cache: CACHE_NAME,
                    error,
                },
                maintenance,
            ),
        }
    }

    pub fn contains(&self, key: &EpochKey) -> bool {
        self.cache.contains(key)
    }

    pub fn peek(&self, key: &EpochKey) -> Option<Arc<CommitteeCache>> {
        self.cache.peek(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear()
    }

    pub fn update_protector(&self, protector: EpochProtector) {
        self.cache.update_protector(protector)
    }
}
