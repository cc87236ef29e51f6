//! Skip-slot advances: moving a `BeaconState` forward some number of slots without applying
//! blocks.
//!
//! Both advances run `per_slot_processing` once per slot. They differ only in which state roots
//! they feed it, and so in whether the resulting state is fit for anything but shuffling lookups.

use crate::per_slot_processing::{self, per_slot_processing_with_cancel};
use types::{BeaconState, CancelToken, ChainSpec, EthSpec, Hash256, Slot};

#[derive(Debug, PartialEq)]
pub enum Error {
    BadTargetSlot { target_slot: Slot, state_slot: Slot },
    PerSlotProcessing(per_slot_processing::Error),
    StateRootNotProvided,
}

impl From<per_slot_processing::Error> for Error {
    fn from(e: per_slot_processing::Error) -> Self {
        Error::PerSlotProcessing(e)
    }
}

/// Advances the `state` to `target_slot`, assuming there were no blocks between these slots.
///
/// The output is a perfectly valid `BeaconState`: every intermediate state root is computed by
/// hashing, except the first when `state_root_opt` supplies it.
///
/// ## Errors
///
/// - If `state.slot > target_slot`.
pub fn complete_state_advance<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root_opt: Option<Hash256>,
    target_slot: Slot,
    spec: &ChainSpec,
) -> Result<(), Error> {
    complete_state_advance_with_cancel(state, state_root_opt, target_slot, spec, &CancelToken::new())
}

/// As `complete_state_advance`, abandoning any epoch transition once `cancel` fires.
///
/// A cancelled advance leaves `state` part way along and must be discarded.
pub fn complete_state_advance_with_cancel<E: EthSpec>(
    state: &mut BeaconState<E>,
    mut state_root_opt: Option<Hash256>,
    target_slot: Slot,
    spec: &ChainSpec,
    cancel: &CancelToken,
) -> Result<(), Error> {
    check_target_slot(state.slot, target_slot)?;

    while state.slot < target_slot {
        // Only the first slot may reuse a known root.
        per_slot_processing_with_cancel(state, state_root_opt.take(), spec, cancel)?;
    }

    Ok(())
}

/// Advances the `state` to `target_slot` without computing any intermediate state roots.
///
/// The result is an **invalid** `BeaconState`: its `state_roots` hold zeros. It is only good for
/// reading proposer and attester shufflings, which do not depend on state roots, and it is much
/// cheaper to produce than a complete advance.
///
/// ## Errors
///
/// - If `state.slot > target_slot`.
/// - If a block has been applied at `state.slot` and `state_root_opt` is `None`. The header's
///   state root would otherwise be filled with zeros, corrupting `block_roots`.
pub fn partial_state_advance<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root_opt: Option<Hash256>,
    target_slot: Slot,
    spec: &ChainSpec,
) -> Result<(), Error> {
    check_target_slot(state.slot, target_slot)?;

    let first_root = if state.slot > state.latest_block_header.slot {
        state_root_opt.unwrap_or_else(Hash256::zero)
    } else {
        state_root_opt.ok_or(Error::StateRootNotProvided)?
    };
    let mut initial_state_root = Some(first_root);

    let cancel = CancelToken::new();
    while state.slot < target_slot {
        let state_root = initial_state_root.take().unwrap_or_else(Hash256::zero);
        per_slot_processing_with_cancel(state, Some(state_root), spec, &cancel)?;
    }

    Ok(())
}

fn check_target_slot(state_slot: Slot, target_slot: Slot) -> Result<(), Error> {
    if state_slot > target_slot {
        Err(Error::BadTargetSlot {
            target_slot,
            state_slot,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::interop_genesis_state;
    use pq_crypto::generate_deterministic_keypairs;
    use crate::EpochProcessingError;
    use types::{BeaconStateError, MinimalEthSpec};

    type E = MinimalEthSpec;

    fn genesis(spec: &ChainSpec) -> BeaconState<E> {
        interop_genesis_state::<E>(&generate_deterministic_keypairs(16), 0, Hash256::zero(), spec)
            .unwrap()
    }

    #[test]
    fn rejects_backwards_target() {
        let spec = E::default_spec();
        let mut state = genesis(&spec);
        state.slot = Slot::new(3);
        assert_eq!(
            complete_state_advance(&mut state, None, Slot::new(2), &spec),
            Err(Error::BadTargetSlot {
                target_slot: Slot::new(2),
                state_slot: Slot::new(3),
            })
        );
    }

    #[test]
    fn partial_advance_needs_root_after_block() {
        let spec = E::default_spec();
        let mut state = genesis(&spec);
        // Pretend a block was just applied at the current slot.
        state.latest_block_header.slot = state.slot;
        assert_eq!(
            partial_state_advance(&mut state, None, Slot::new(4), &spec),
            Err(Error::StateRootNotProvided)
        );
    }

    #[test]
    fn cancelled_advance_stops_at_epoch_boundary() {
        let spec = E::default_spec();
        let mut state = genesis(&spec);
        state.drop_all_caches().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = complete_state_advance_with_cancel(
            &mut state,
            None,
            Slot::new(E::slots_per_epoch() + 1),
            &spec,
            &cancel,
        );
        assert_eq!(
            result,
            Err(Error::PerSlotProcessing(
                per_slot_processing::Error::EpochProcessingError(
                    EpochProcessingError::BeaconStateError(BeaconStateError::Cancelled)
                )
            ))
        );
        assert_eq!(state.slot, Slot::new(E::slots_per_epoch() - 1));
    }

    #[test]
    fn complete_and_partial_agree_on_shuffling() {
        let spec = E::default_spec();
        let target = Slot::new(E::slots_per_epoch() + 1);

        let mut complete = genesis(&spec);
        let root = complete.canonical_root();
        complete_state_advance(&mut complete, Some(root), target, &spec).unwrap();

        let mut partial = genesis(&spec);
        partial_state_advance(&mut partial, Some(root), target, &spec).unwrap();

        assert_eq!(complete.slot, target);
        assert_eq!(partial.slot, target);
        assert_eq!(
            complete.get_beacon_proposer_index(target, &spec),
            partial.get_beacon_proposer_index(target, &spec)
        );
    }
}
