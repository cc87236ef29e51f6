//! Total active balances, keyed by the epoch and the root of the state that closed the epoch
//! before it.
//!
//! Effective balances and activation/exit epochs only move during the epoch transition, and exits
//! initiated by blocks never take effect inside the current epoch. The active balance of an epoch
//! is therefore fixed by the last state before its first slot.
use crate::errors::CacheMaintenanceError;
use crate::metrics;
use crate::single_flight::{
    record_maintenance_error, CacheMetrics, EpochKey, EpochProtector, SingleFlightCache,
};
use slog::Logger;
use std::sync::Arc;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, Slot};

const CACHE_NAME: &str = "total_active_balance";

pub struct TotalActiveBalanceCache {
    cache: SingleFlightCache<u64>,
}

impl TotalActiveBalanceCache {
    pub fn new(capacity: usize, log: Logger) -> Self {
        let metrics = CacheMetrics {
            hits: &metrics::TOTAL_ACTIVE_BALANCE_CACHE_HITS,
            misses: &metrics::TOTAL_ACTIVE_BALANCE_CACHE_MISSES,
            promise_waits: &metrics::TOTAL_ACTIVE_BALANCE_CACHE_PROMISE_WAITS,
            size: &metrics::TOTAL_ACTIVE_BALANCE_CACHE_SIZE,
        };
        Self {
            cache: SingleFlightCache::new(CACHE_NAME, capacity, metrics, log),
        }
    }

    /// The key of the current epoch's total active balance.
    ///
    /// The genesis epoch has no preceding state, so it is keyed by the genesis validators root.
    pub fn balance_id<E: EthSpec>(state: &BeaconState<E>) -> Result<EpochKey, BeaconStateError> {
        let epoch = state.current_epoch();
        let start_slot = epoch.start_slot(E::slots_per_epoch());
        let root = match start_slot.as_u64().checked_sub(1) {
            Some(slot) => *state.get_state_root(Slot::new(slot))?,
            None => state.genesis_validators_root,
        };
        Ok(EpochKey::new(epoch, root))
    }

    pub fn get_or_compute<E: EthSpec>(
        &self,
        state: &BeaconState<E>,
        spec: &ChainSpec,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<u64, BeaconStateError> {
        let current_epoch = state.current_epoch();
        if let Ok(balance) = state.get_total_active_balance_at_epoch(current_epoch) {
            return Ok(balance);
        }

        let compute = || state.compute_total_active_balance_slow(spec).map(Arc::new);
        let balance = match Self::balance_id(state) {
            Ok(key) => self.cache.get_or_compute(key, compute, maintenance)?,
            Err(error) => {
                record_maintenance_error(
                    self.cache.log(),
                    CacheMaintenanceError::KeyUnavailable {
                        cache: CACHE_NAME,
                        error,
                    },
                    maintenance,
                );
                compute()?
            }
        };
        Ok(*balance)
    }

    /// Set the total active balance of `state` for its current epoch, if it isn't already.
    pub fn prime<E: EthSpec>(
        &self,
        state: &mut BeaconState<E>,
        spec: &ChainSpec,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<(), BeaconStateError> {
        let current_epoch = state.current_epoch();
        if state
            .get_total_active_balance_at_epoch(current_epoch)
            .is_err()
        {
            let balance = self.get_or_compute(state, spec, maintenance)?;
            state.set_total_active_balance(current_epoch, balance, spec);
        }
        Ok(())
    }

    pub fn contains(&self, key: &EpochKey) -> bool {
        self.cache.contains(key)
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
