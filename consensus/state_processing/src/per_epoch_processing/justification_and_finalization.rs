use crate::per_epoch_processing::{
    weigh_justification_and_finalization, Error, JustificationAndFinalizationState,
    ParticipationCache,
};
use safe_arith::SafeArith;
use types::{BeaconState, EthSpec};

/// Process justification and finalization using the balances tallied by the participation cache.
pub fn process_justification_and_finalization<E: EthSpec>(
    state: &BeaconState<E>,
    participation_cache: &ParticipationCache,
) -> Result<JustificationAndFinalizationState<E>, Error> {
    let justification_and_finalization_state = JustificationAndFinalizationState::new(state);

    if state.current_epoch() <= E::genesis_epoch().safe_add(1)? {
        return Ok(justification_and_finalization_state);
    }

    let previous_target_balance = participation_cache.previous_epoch_target_attesting_balance()?;
    let current_target_balance = participation_cache.current_epoch_target_attesting_balance()?;
    let total_active_balance = participation_cache.current_epoch_total_active_balance();

    weigh_justification_and_finalization(
        justification_and_finalization_state,
        total_active_balance,
        previous_target_balance,
        current_target_balance,
    )
}
