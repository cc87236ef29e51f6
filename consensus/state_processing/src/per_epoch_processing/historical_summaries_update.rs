use crate::EpochProcessingError;
use safe_arith::SafeArith;
use types::{BeaconState, EthSpec, HistoricalSummary, Unsigned};

/// Append a summary of the block and state roots once a full historical window has elapsed.
pub fn process_historical_summaries_update<E: EthSpec>(
    state: &mut BeaconState<E>,
) -> Result<(), EpochProcessingError> {
    // Set historical block root accumulator.
    let next_epoch = state.next_epoch()?;
    if next_epoch
        .as_u64()
        .safe_rem(E::SlotsPerHistoricalRoot::to_u64().safe_div(E::slots_per_epoch())?)?
        == 0
    {
        let summary = HistoricalSummary::new(state);
        state.historical_summaries.push(summary)?;
    }
    Ok(())
}
