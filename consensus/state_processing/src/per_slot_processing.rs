use crate::metrics;
use crate::per_epoch_processing::{process_epoch_with_cancel, EpochProcessingSummary};
use crate::EpochProcessingError;
use safe_arith::{ArithError, SafeArith};
use types::*;

#[derive(Debug, PartialEq)]
pub enum Error {
    BeaconStateError(BeaconStateError),
    EpochProcessingError(EpochProcessingError),
    ArithError(ArithError),
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Self::ArithError(e)
    }
}

/// Advances a state forward by one slot, performing per-epoch processing if required.
///
/// If the root of the supplied `state` is known, then it can be passed as `state_root`. If
/// `state_root` is `None`, the root of `state` will be computed by hashing the whole state.
/// Providing the `state_root` makes this function several orders of magnitude faster.
pub fn per_slot_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root: Option<Hash256>,
    spec: &ChainSpec,
) -> Result<Option<EpochProcessingSummary>, Error> {
    per_slot_processing_with_cancel(state, state_root, spec, &CancelToken::new())
}

/// As `per_slot_processing`, passing `cancel` through to the epoch transition.
pub fn per_slot_processing_with_cancel<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root: Option<Hash256>,
    spec: &ChainSpec,
    cancel: &CancelToken,
) -> Result<Option<EpochProcessingSummary>, Error> {
    let _timer = metrics::start_timer(&metrics::SLOT_PROCESSING_TIMES);

    cache_state(state, state_root)?;

    let summary = if state.can_process_epoch() {
        Some(process_epoch_with_cancel(state, spec, cancel)?)
    } else {
        None
    };

    state.slot.safe_add_assign(1)?;

    Ok(summary)
}

fn cache_state<E: EthSpec>(
    state: &mut BeaconState<E>,
    state_root: Option<Hash256>,
) -> Result<(), Error> {
    let previous_state_root = if let Some(root) = state_root {
        root
    } else {
        state.canonical_root()
    };

    // Note: increment the state slot here to allow use of our `state_root` and `block_root`
    // getter/setter functions.
    //
    // This is a bit hacky, however it gets the job done safely without lots of code.
    let previous_slot = state.slot;
    state.slot.safe_add_assign(1)?;

    // Store the previous slot's post state transition root.
    state.set_state_root(previous_slot, previous_state_root)?;

    // Cache latest block header state root
    if state.latest_block_header.state_root == Hash256::zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    // Cache block root
    let latest_block_root = state.latest_block_header.canonical_root();
    state.set_block_root(previous_slot, latest_block_root)?;

    // Set the state slot back to what it should be.
    state.slot.safe_sub_assign(1)?;

    Ok(())
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<EpochProcessingError> for Error {
    fn from(e: EpochProcessingError) -> Error {
        Error::EpochProcessingError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::interop_genesis_state;
    use pq_crypto::generate_deterministic_keypairs;

    type E = MinimalEthSpec;

    #[test]
    fn records_roots_and_crosses_epochs() {
        let spec = E::default_spec();
        let keypairs = generate_deterministic_keypairs(16);
        let mut state =
            interop_genesis_state::<E>(&keypairs, 0, Hash256::repeat_byte(0x42), &spec)
                .unwrap();

        let genesis_root = state.canonical_root();
        assert_eq!(
            per_slot_processing(&mut state, None, &spec).unwrap(),
            None
        );
        assert_eq!(state.slot, Slot::new(1));
        assert_eq!(*state.get_state_root(Slot::new(0)).unwrap(), genesis_root);
        assert_eq!(state.latest_block_header.state_root, genesis_root);
        assert_eq!(
            *state.get_block_root(Slot::new(0)).unwrap(),
            state.latest_block_header.canonical_root()
        );

        let mut summaries = 0;
        while state.slot < Slot::new(E::slots_per_epoch() * 2) {
            if per_slot_processing(&mut state, None, &spec)
                .unwrap()
                .is_some()
            {
                summaries += 1;
            }
        }
        assert_eq!(summaries, 2);
        assert_eq!(state.current_epoch(), Epoch::new(2));
    }

    #[test]
    fn supplied_root_is_trusted() {
        let spec = E::default_spec();
        let keypairs = generate_deterministic_keypairs(16);
        let mut state =
            interop_genesis_state::<E>(&keypairs, 0, Hash256::zero(), &spec).unwrap();

        let fake_root = Hash256::repeat_byte(7);
        per_slot_processing(&mut state, Some(fake_root), &spec).unwrap();
        assert_eq!(*state.get_state_root(Slot::new(0)).unwrap(), fake_root);
    }
}
