use crate::beacon_proposer_cache::BeaconProposerCache;
use crate::config::EngineConfig;
use crate::errors::CacheMaintenanceError;
use crate::metrics;
use crate::shuffling_cache::ShufflingCache;
use crate::single_flight::EpochProtector;
use crate::total_active_balance_cache::TotalActiveBalanceCache;
use slog::{debug, Logger};
use types::{BeaconState, BeaconStateError, CancelToken, ChainSpec, EthSpec, Hash256, RelativeEpoch};

/// Every cache the `TransitionEngine` consults, bundled so they can be shared between engines
/// following different forks of the same chain.
pub struct TransitionCaches {
    pub shuffling: ShufflingCache,
    pub proposers: BeaconProposerCache,
    pub total_active_balance: TotalActiveBalanceCache,
    log: Logger,
}

impl TransitionCaches {
    pub fn new(config: &EngineConfig, log: Logger) -> Self {
        Self {
            shuffling: ShufflingCache::new(config.shuffling_cache_size, log.clone()),
            proposers: BeaconProposerCache::new(config.proposer_cache_size, log.clone()),
            total_active_balance: TotalActiveBalanceCache::new(
                config.total_active_balance_cache_size,
                log.clone(),
            ),
            log,
        }
    }

    /// Drop every entry. Values computed under an old `ChainSpec` are not valid under a new one.
    pub fn clear(&self) {
        metrics::inc_counter(&metrics::CACHE_CLEARS);
        debug!(self.log, "Clearing transition caches");
        self.shuffling.clear();
        self.proposers.clear();
        self.total_active_balance.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.shuffling.is_empty() && self.proposers.is_empty() && self.total_active_balance.is_empty()
    }

    /// Keep the entries for `head_epoch` and the finalized epoch of the head from eviction.
    pub fn update_protector(&self, protector: EpochProtector) {
        self.shuffling.update_protector(protector);
        self.proposers.update_protector(protector);
        self.total_active_balance.update_protector(protector);
    }

    /// Fill the committee caches and total active balance that the epoch transition of `state`
    /// reads, from the caches where possible.
    pub fn prime_epoch_transition<E: EthSpec>(
        &self,
        state: &mut BeaconState<E>,
        head_block_root: Hash256,
        spec: &ChainSpec,
        cancel: &CancelToken,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<(), BeaconStateError> {
        self.total_active_balance.prime(state, spec, maintenance)?;
        for relative_epoch in [
            RelativeEpoch::Previous,
            RelativeEpoch::Current,
            RelativeEpoch::Next,
        ] {
            self.shuffling.prime(
                state,
                head_block_root,
                relative_epoch,
                spec,
                cancel,
                maintenance,
            )?;
        }
        Ok(())
    }

    /// Fill the committee caches and total active balance that block processing reads.
    pub fn prime_block<E: EthSpec>(
        &self,
        state: &mut BeaconState<E>,
        head_block_root: Hash256,
        spec: &ChainSpec,
        cancel: &CancelToken,
        maintenance: &mut Vec<CacheMaintenanceError>,
    ) -> Result<(), BeaconStateError> {
        self.total_active_balance.prime(state, spec, maintenance)?;
        for relative_epoch in [RelativeEpoch::Previous, RelativeEpoch::Current] {
            self.shuffling.prime(
                state,
                head_block_root,
                relative_epoch,
                spec,
                cancel,
                maintenance,
            )?;
        }
        Ok(())
    }
}
