use crate::EpochProcessingError;
use types::{BeaconState, EthSpec, ParticipationFlags, VariableList};

/// Rotate the current participation into the previous slot and start afresh.
pub fn process_participation_flag_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    state.previous_epoch_participation = std::mem::replace(
        &mut state.current_epoch_participation,
        VariableList::new(vec![ParticipationFlags::default(); state.validators.len()])?,
    );
    Ok(())
}
