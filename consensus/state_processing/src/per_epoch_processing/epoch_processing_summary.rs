use super::ParticipationCache;
use types::consts::participation::NUM_FLAG_INDICES;
use types::BeaconStateError;

/// Provides a summary of validator participation during the epoch.
#[derive(PartialEq, Debug, Clone)]
pub struct EpochProcessingSummary {
    participation_cache: ParticipationCache,
}

impl EpochProcessingSummary {
    pub fn new(participation_cache: ParticipationCache) -> Self {
        Self {
            participation_cache,
        }
    }

    /// Returns the sum of the effective balance of all validators in the current epoch.
    pub fn current_epoch_total_active_balance(&self) -> u64 {
        self.participation_cache.current_epoch_total_active_balance()
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch.
    pub fn previous_epoch_total_active_balance(&self) -> u64 {
        self.participation_cache
            .previous_epoch_total_active_balance()
    }

    /// The unslashed participating balance of the previous epoch for every flag, in flag order.
    pub fn previous_epoch_flag_attesting_balances(
        &self,
    ) -> Result<[u64; NUM_FLAG_INDICES], BeaconStateError> {
        let mut balances = [0; NUM_FLAG_INDICES];
        for (flag_index, balance) in balances.iter_mut().enumerate() {
            *balance = self
                .participation_cache
                .previous_epoch_flag_attesting_balance(flag_index)?;
        }
        Ok(balances)
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch who
    /// included an attestation that matched the target.
    pub fn previous_epoch_target_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.participation_cache
            .previous_epoch_target_attesting_balance()
    }

    /// Returns the sum of the effective balance of all validators in the previous epoch who
    /// included a timely attestation that matched the head.
    pub fn previous_epoch_head_attesting_balance(&self) -> Result<u64, BeaconStateError> {
        self.participation_cache
            .previous_epoch_head_attesting_balance()
    }

    /// The ascending indices of validators with at least one flag set in the previous epoch.
    pub fn previous_epoch_participating_indices(&self) -> Vec<usize> {
        self.participation_cache
            .previous_epoch_participating_indices()
    }

    /// Returns `true` if `val_index` was active and unslashed in the previous epoch.
    ///
    /// ## Notes
    ///
    /// Always returns `false` for an unknown `val_index`.
    pub fn is_active_unslashed_in_previous_epoch(&self, val_index: usize) -> bool {
        self.participation_cache
            .is_active_unslashed_in_previous_epoch(val_index)
    }

    /// Returns `true` if `val_index` had a timely target attestation included in the previous
    /// epoch.
    pub fn is_previous_epoch_target_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.participation_cache
            .is_previous_epoch_timely_target_attester(val_index)
    }

    pub fn is_previous_epoch_head_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.participation_cache
            .is_previous_epoch_timely_head_attester(val_index)
    }

    pub fn is_previous_epoch_source_attester(
        &self,
        val_index: usize,
    ) -> Result<bool, BeaconStateError> {
        self.participation_cache
            .is_previous_epoch_timely_source_attester(val_index)
    }

    pub fn participation_cache(&self) -> &ParticipationCache {
        &self.participation_cache
    }
}
