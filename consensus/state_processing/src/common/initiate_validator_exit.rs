use safe_arith::SafeArith;
use std::cmp::max;
use types::{BeaconStateError as Error, *};

/// Initiate the exit of the validator of the given `index`.
///
/// Exits queue behind the latest scheduled exit, and spill into the following epoch once that
/// epoch has taken as many exits as the churn limit allows.
pub fn initiate_validator_exit<E: EthSpec>(
    state: &mut BeaconState<E>,
    index: usize,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // Return if the validator already initiated exit
    if state.get_validator(index)?.exit_epoch != spec.far_future_epoch {
        return Ok(());
    }

    // Compute exit queue epoch
    let delayed_epoch = state.compute_activation_exit_epoch(state.current_epoch(), spec)?;
    let max_exit_epoch = state
        .validators
        .iter()
        .map(|v| v.exit_epoch)
        .filter(|epoch| *epoch != spec.far_future_epoch)
        .max();
    let mut exit_queue_epoch = max_exit_epoch.map_or(delayed_epoch, |epoch| max(epoch, delayed_epoch));
    let exit_queue_churn = state
        .validators
        .iter()
        .filter(|v| v.exit_epoch == exit_queue_epoch)
        .count() as u64;

    if exit_queue_churn >= state.get_validator_churn_limit(spec)? {
        exit_queue_epoch.safe_add_assign(1)?;
    }

    let validator = state.get_validator_mut(index)?;
    validator.exit_epoch = exit_queue_epoch;
    validator.withdrawable_epoch =
        exit_queue_epoch.safe_add(spec.min_validator_withdrawability_delay)?;

    Ok(())
}
