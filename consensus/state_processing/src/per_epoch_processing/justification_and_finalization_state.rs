use types::{BeaconState, BeaconStateError, BitVector, Checkpoint, Epoch, EthSpec, Hash256};

/// A copy of the fields of a `BeaconState` which are touched by justification and finalization.
///
/// Working on a copy lets the weighing logic run without holding the whole state mutably, and
/// lets callers inspect the outcome before writing it back.
#[must_use = "this value must be applied to a state or explicitly dropped"]
#[derive(Debug, Clone, PartialEq)]
pub struct JustificationAndFinalizationState<E: EthSpec> {
    previous_epoch: Epoch,
    current_epoch: Epoch,
    previous_epoch_target_root: Result<Hash256, BeaconStateError>,
    current_epoch_target_root: Result<Hash256, BeaconStateError>,
    previous_justified_checkpoint: Checkpoint,
    current_justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    justification_bits: BitVector<E::JustificationBitsLength>,
}

impl<E: EthSpec> JustificationAndFinalizationState<E> {
    pub fn new(state: &BeaconState<E>) -> Self {
        let previous_epoch = state.previous_epoch();
        let current_epoch = state.current_epoch();
        Self {
            previous_epoch,
            current_epoch,
            previous_epoch_target_root: state.get_block_root_at_epoch(previous_epoch).copied(),
            current_epoch_target_root: state.get_block_root_at_epoch(current_epoch).copied(),
            previous_justified_checkpoint: state.previous_justified_checkpoint,
            current_justified_checkpoint: state.current_justified_checkpoint,
            finalized_checkpoint: state.finalized_checkpoint,
            justification_bits: state.justification_bits.clone(),
        }
    }

    pub fn previous_epoch(&self) -> Epoch {
        self.previous_epoch
    }

    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    /// The block root at the start of `epoch`, which must be the previous or current epoch.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<Hash256, BeaconStateError> {
        if epoch == self.previous_epoch {
            self.previous_epoch_target_root.clone()
        } else if epoch == self.current_epoch {
            self.current_epoch_target_root.clone()
        } else {
            Err(BeaconStateError::SlotOutOfBounds)
        }
    }

    pub fn apply_changes_to_state(self, state: &mut BeaconState<E>) {
        let Self {
            previous_epoch: _,
            current_epoch: _,
            previous_epoch_target_root: _,
            current_epoch_target_root: _,
            previous_justified_checkpoint,
            current_justified_checkpoint,
            finalized_checkpoint,
            justification_bits,
        } = self;

        state.previous_justified_checkpoint = previous_justified_checkpoint;
        state.current_justified_checkpoint = current_justified_checkpoint;
        state.finalized_checkpoint = finalized_checkpoint;
        state.justification_bits = justification_bits;
    }

    pub fn previous_justified_checkpoint(&self) -> Checkpoint {
        self.previous_justified_checkpoint
    }

    pub fn previous_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.previous_justified_checkpoint
    }

    pub fn current_justified_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.current_justified_checkpoint
    }

    pub fn current_justified_checkpoint(&self) -> Checkpoint {
        self.current_justified_checkpoint
    }

    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    pub fn finalized_checkpoint_mut(&mut self) -> &mut Checkpoint {
        &mut self.finalized_checkpoint
    }

    pub fn justification_bits(&self) -> &BitVector<E::JustificationBitsLength> {
        &self.justification_bits
    }

    pub fn justification_bits_mut(&mut self) -> &mut BitVector<E::JustificationBitsLength> {
        &mut self.justification_bits
    }
}
