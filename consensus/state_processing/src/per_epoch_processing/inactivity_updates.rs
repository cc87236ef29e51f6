use super::ParticipationCache;
use crate::EpochProcessingError;
use safe_arith::SafeArith;
use std::cmp::min;
use types::{BeaconState, ChainSpec, EthSpec};

pub fn process_inactivity_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    participation_cache: &ParticipationCache,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    // Score updates based on previous epoch participation, skip genesis epoch
    if state.current_epoch() == E::genesis_epoch() {
        return Ok(());
    }

    let previous_epoch = state.previous_epoch();
    let is_in_inactivity_leak = state.is_in_inactivity_leak(previous_epoch, spec)?;

    for &index in participation_cache.eligible_validator_indices() {
        let is_target_attester =
            participation_cache.is_previous_epoch_timely_target_attester(index)?;
        let inactivity_score = state.get_inactivity_score_mut(index)?;

        // Increase inactivity score of inactive validators
        if is_target_attester {
            inactivity_score.safe_sub_assign(min(1, *inactivity_score))?;
        } else {
            inactivity_score.safe_add_assign(spec.inactivity_score_bias)?;
        }

        // Decrease the score of all validators for forgiveness when not during a leak
        if !is_in_inactivity_leak {
            inactivity_score
                .safe_sub_assign(min(spec.inactivity_score_recovery_rate, *inactivity_score))?;
        }
    }
    Ok(())
}
