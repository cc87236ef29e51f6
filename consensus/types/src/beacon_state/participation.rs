//! Epoch participation flags.
use super::{BeaconState, Error};
use crate::*;

impl<E: EthSpec> BeaconState<E> {
    /// Get a mutable reference to the epoch participation flags for `epoch`.
    pub fn get_epoch_participation_mut(
        &mut self,
        epoch: Epoch,
    ) -> Result<&mut VariableList<ParticipationFlags, E::ValidatorRegistryLimit>, Error> {
        if epoch == self.current_epoch() {
            Ok(&mut self.current_epoch_participation)
        } else if epoch == self.previous_epoch() {
            Ok(&mut self.previous_epoch_participation)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// Get the epoch participation flags for `epoch`.
    pub fn get_epoch_participation(
        &self,
        epoch: Epoch,
    ) -> Result<&VariableList<ParticipationFlags, E::ValidatorRegistryLimit>, Error> {
        if epoch == self.current_epoch() {
            Ok(&self.current_epoch_participation)
        } else if epoch == self.previous_epoch() {
            Ok(&self.previous_epoch_participation)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// Return the flags of a single validator for `epoch`.
    pub fn get_participation_flags(
        &self,
        epoch: Epoch,
        validator_index: usize,
    ) -> Result<ParticipationFlags, Error> {
        self.get_epoch_participation(epoch)?
            .get(validator_index)
            .copied()
            .ok_or(Error::ParticipationOutOfBounds(validator_index))
    }
}
