#![deny(clippy::wildcard_imports)]

use crate::metrics;
pub use effective_balance_updates::process_effective_balance_updates;
pub use epoch_processing_summary::EpochProcessingSummary;
use errors::EpochProcessingError as Error;
pub use historical_summaries_update::process_historical_summaries_update;
pub use inactivity_updates::process_inactivity_updates;
pub use justification_and_finalization::process_justification_and_finalization;
pub use justification_and_finalization_state::JustificationAndFinalizationState;
pub use participation_cache::ParticipationCache;
pub use participation_flag_updates::process_participation_flag_updates;
pub use registry_updates::process_registry_updates;
pub use resets::{process_execution_data_reset, process_randao_mixes_reset, process_slashings_reset};
pub use rewards_and_penalties::{process_rewards_and_penalties, Delta};
pub use slashings::process_slashings;
pub use sync_committee_updates::process_sync_committee_updates;
use types::{BeaconState, CancelToken, ChainSpec, EthSpec, RelativeEpoch};
pub use weigh_justification_and_finalization::weigh_justification_and_finalization;

pub mod effective_balance_updates;
pub mod epoch_processing_summary;
pub mod errors;
pub mod historical_summaries_update;
pub mod inactivity_updates;
pub mod justification_and_finalization;
pub mod justification_and_finalization_state;
pub mod participation_cache;
pub mod participation_flag_updates;
pub mod registry_updates;
pub mod resets;
pub mod rewards_and_penalties;
pub mod slashings;
pub mod sync_committee_updates;
#[cfg(test)]
mod tests;
pub mod weigh_justification_and_finalization;

/// Performs per-epoch processing on some BeaconState.
///
/// Mutates the given `BeaconState`, returning early if an error is encountered. If an error is
/// returned, a state might be "half-processed" and therefore in an invalid state. Callers that
/// need all-or-nothing semantics should process a clone.
pub fn process_epoch<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<EpochProcessingSummary, Error> {
    process_epoch_with_cancel(state, spec, &CancelToken::new())
}

/// As `process_epoch`, but abandons the committee cache builds if `cancel` is set.
pub fn process_epoch_with_cancel<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
    cancel: &CancelToken,
) -> Result<EpochProcessingSummary, Error> {
    let _timer = metrics::start_timer(&metrics::EPOCH_PROCESSING_TIMES);

    // Ensure the committee caches are built.
    state.build_committee_cache_with_cancel(RelativeEpoch::Previous, spec, cancel)?;
    state.build_committee_cache_with_cancel(RelativeEpoch::Current, spec, cancel)?;
    state.build_committee_cache_with_cancel(RelativeEpoch::Next, spec, cancel)?;

    // Pre-compute participating indices and total balances.
    let participation_cache = {
        let _timer = metrics::start_timer(&metrics::PARTICIPATION_CACHE_BUILD_TIMES);
        ParticipationCache::new(state, spec)?
    };

    // Justification and finalization.
    let justification_and_finalization_state =
        process_justification_and_finalization(state, &participation_cache)?;
    justification_and_finalization_state.apply_changes_to_state(state);

    process_inactivity_updates(state, &participation_cache, spec)?;

    // Rewards and Penalties.
    process_rewards_and_penalties(state, &participation_cache, spec)?;

    // Registry Updates.
    process_registry_updates(state, spec)?;

    // Slashings.
    process_slashings(
        state,
        participation_cache.current_epoch_total_active_balance(),
        spec,
    )?;

    // Reset execution data votes.
    process_execution_data_reset(state)?;

    // Update effective balances with hysteresis (lag).
    process_effective_balance_updates(state, spec)?;

    // Reset slashings
    process_slashings_reset(state)?;

    // Set randao mix
    process_randao_mixes_reset(state)?;

    // Set historical summary accumulator
    process_historical_summaries_update(state)?;

    // Rotate current/previous epoch participation
    process_participation_flag_updates(state)?;

    process_sync_committee_updates(state, spec)?;

    // Rotate the epoch caches to suit the epoch transition.
    state.advance_caches()?;

    Ok(EpochProcessingSummary::new(participation_cache))
}
