use super::errors::EpochProcessingError;
use safe_arith::SafeArith;
use types::{BeaconState, EthSpec, Unsigned, VariableList};

/// Clear the execution-data votes when the next slot starts a new voting period.
pub fn process_execution_data_reset<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    if state
        .slot
        .safe_add(1)?
        .safe_rem(E::SlotsPerEth1VotingPeriod::to_u64())?
        == 0
    {
        state.execution_data_votes = VariableList::empty();
    }
    Ok(())
}

pub fn process_slashings_reset<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    let next_epoch = state.next_epoch()?;
    state.set_slashings(next_epoch, 0)?;
    Ok(())
}

pub fn process_randao_mixes_reset<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    let current_epoch = state.current_epoch();
    let next_epoch = state.next_epoch()?;
    state.set_randao_mix(next_epoch, *state.get_randao_mix(current_epoch)?)?;
    Ok(())
}
