use crate::EpochProcessingError;
use safe_arith::SafeArith;
use types::{BeaconState, ChainSpec, EthSpec};

pub fn process_sync_committee_updates<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), EpochProcessingError> {
    let next_epoch = state.next_epoch()?;
    if next_epoch.safe_rem(spec.epochs_per_sync_committee_period)? == 0 {
        let next_sync_committee = state.get_next_sync_committee(spec)?;
        state.current_sync_committee =
            std::mem::replace(&mut state.next_sync_committee, next_sync_committee);
    }
    Ok(())
}
