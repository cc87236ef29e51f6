use crate::per_epoch_processing::{Error, JustificationAndFinalizationState};
use safe_arith::SafeArith;
use types::{Checkpoint, EthSpec};

/// Update the justified and finalized checkpoints for matching target attestations.
pub fn weigh_justification_and_finalization<E: EthSpec>(
    mut state: JustificationAndFinalizationState<E>,
    total_active_balance: u64,
    previous_target_balance: u64,
    current_target_balance: u64,
) -> Result<JustificationAndFinalizationState<E>, Error> {
    let previous_epoch = state.previous_epoch();
    let current_epoch = state.current_epoch();

    let old_previous_justified_checkpoint = state.previous_justified_checkpoint();
    let old_current_justified_checkpoint = state.current_justified_checkpoint();

    // Process justifications
    *state.previous_justified_checkpoint_mut() = state.current_justified_checkpoint();
    state
        .justification_bits_mut()
        .shift_up(1)
        .map_err(Error::InvalidJustificationBit)?;

    if previous_target_balance.safe_mul(3)? >= total_active_balance.safe_mul(2)? {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: previous_epoch,
            root: state.get_block_root_at_epoch(previous_epoch)?,
        };
        state
            .justification_bits_mut()
            .set(1, true)
            .map_err(Error::InvalidJustificationBit)?;
    }
    // If the current epoch gets justified, fill the last bit.
    if current_target_balance.safe_mul(3)? >= total_active_balance.safe_mul(2)? {
        *state.current_justified_checkpoint_mut() = Checkpoint {
            epoch: current_epoch,
            root: state.get_block_root_at_epoch(current_epoch)?,
        };
        state
            .justification_bits_mut()
            .set(0, true)
            .map_err(Error::InvalidJustificationBit)?;
    }

    let bits = state.justification_bits().clone();
    let all_bits_set = |range: std::ops::Range<usize>| -> Result<bool, Error> {
        for i in range {
            if !bits.get(i).map_err(Error::InvalidJustificationBit)? {
                return Ok(false);
            }
        }
        Ok(true)
    };

    // The 2nd/3rd/4th most recent epochs are all justified, the 2nd using the 4th as source.
    if all_bits_set(1..4)? && old_previous_justified_checkpoint.epoch.safe_add(3)? == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 2nd/3rd most recent epochs are both justified, the 2nd using the 3rd as source.
    if all_bits_set(1..3)? && old_previous_justified_checkpoint.epoch.safe_add(2)? == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_previous_justified_checkpoint;
    }
    // The 1st/2nd/3rd most recent epochs are all justified, the 1st using the 3rd as source.
    if all_bits_set(0..3)? && old_current_justified_checkpoint.epoch.safe_add(2)? == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }
    // The 1st/2nd most recent epochs are both justified, the 1st using the 2nd as source.
    if all_bits_set(0..2)? && old_current_justified_checkpoint.epoch.safe_add(1)? == current_epoch
    {
        *state.finalized_checkpoint_mut() = old_current_justified_checkpoint;
    }

    Ok(state)
}

/// Build a justification bitfield from its most-recent-first bit values, for tests.
#[cfg(test)]
pub(crate) fn bits_from<E: EthSpec>(set: &[bool]) -> types::BitVector<E::JustificationBitsLength> {
    let mut bits = types::BitVector::new();
    for (i, bit) in set.iter().enumerate() {
        bits.set(i, *bit).unwrap();
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{BeaconState, ChainSpec, Epoch, ExecutionData, Hash256, MinimalEthSpec, Slot};

    type E = MinimalEthSpec;

    fn state_at_epoch(epoch: u64) -> BeaconState<E> {
        let spec = ChainSpec::minimal();
        let mut state = BeaconState::<E>::new(0, ExecutionData::default(), &spec);
        state.slot = Epoch::new(epoch).end_slot(E::slots_per_epoch());
        for slot in 0..state.slot.as_u64() {
            state
                .set_block_root(Slot::new(slot), Hash256::from_low_u64_be(slot + 1))
                .unwrap();
        }
        state
    }

    #[test]
    fn full_participation_justifies_both_epochs() {
        let state = state_at_epoch(3);
        let jf = JustificationAndFinalizationState::new(&state);
        let jf = weigh_justification_and_finalization(jf, 100, 100, 100).unwrap();

        assert_eq!(jf.current_justified_checkpoint().epoch, Epoch::new(3));
        assert_eq!(jf.previous_justified_checkpoint().epoch, Epoch::new(0));
        assert!(jf.justification_bits().get(0).unwrap());
        assert!(jf.justification_bits().get(1).unwrap());
    }

    #[test]
    fn under_two_thirds_justifies_nothing() {
        let state = state_at_epoch(3);
        let jf = JustificationAndFinalizationState::new(&state);
        let jf = weigh_justification_and_finalization(jf, 300, 199, 199).unwrap();

        assert_eq!(jf.current_justified_checkpoint(), state.current_justified_checkpoint);
        assert_eq!(jf.justification_bits().num_set_bits(), 0);
    }

    #[test]
    fn two_consecutive_justified_epochs_finalize() {
        let mut state = state_at_epoch(4);
        let justified = Checkpoint {
            epoch: Epoch::new(3),
            root: Hash256::repeat_byte(3),
        };
        state.current_justified_checkpoint = justified;
        state.previous_justified_checkpoint = Checkpoint {
            epoch: Epoch::new(2),
            root: Hash256::repeat_byte(2),
        };
        // Epoch 3 was justified last time round, so after the shift it sits at bit 1.
        state.justification_bits = bits_from::<E>(&[true, false, false, false]);

        let jf = JustificationAndFinalizationState::new(&state);
        let jf = weigh_justification_and_finalization(jf, 100, 100, 100).unwrap();

        assert_eq!(jf.finalized_checkpoint(), justified);
        assert_eq!(jf.current_justified_checkpoint().epoch, Epoch::new(4));
    }

    #[test]
    fn finality_via_the_previous_justified_checkpoint() {
        let mut state = state_at_epoch(5);
        let old_previous = Checkpoint {
            epoch: Epoch::new(3),
            root: Hash256::repeat_byte(3),
        };
        state.previous_justified_checkpoint = old_previous;
        state.current_justified_checkpoint = Checkpoint {
            epoch: Epoch::new(3),
            root: Hash256::repeat_byte(3),
        };
        // Epoch 3 justified last time round, epoch 4 not yet.
        state.justification_bits = bits_from::<E>(&[false, true, false, false]);

        let jf = JustificationAndFinalizationState::new(&state);
        // Only the previous epoch (4) reaches the threshold.
        let jf = weigh_justification_and_finalization(jf, 90, 60, 0).unwrap();

        assert_eq!(jf.finalized_checkpoint(), old_previous);
        assert_eq!(jf.current_justified_checkpoint().epoch, Epoch::new(4));
    }
}
