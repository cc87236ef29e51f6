//! Justification and finality checkpoints.
use super::{BeaconState, Error};
use crate::*;

impl<E: EthSpec> BeaconState<E> {
    /// The justified checkpoint an attestation for `target_epoch` must name as its source.
    pub fn expected_attestation_source(&self, target_epoch: Epoch) -> Result<Checkpoint, Error> {
        if target_epoch == self.current_epoch() {
            Ok(self.current_justified_checkpoint)
        } else if target_epoch == self.previous_epoch() {
            Ok(self.previous_justified_checkpoint)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// Returns `true` if `epoch` is at or before the finalized checkpoint.
    pub fn is_finalized_epoch(&self, epoch: Epoch) -> bool {
        epoch <= self.finalized_checkpoint.epoch
    }
}
