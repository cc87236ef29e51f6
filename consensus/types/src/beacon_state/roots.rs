//! Historical block and state roots, RANDAO mixes and slashings.
use super::{BeaconState, Error};
use crate::*;
use ethereum_hashing::hash;
use safe_arith::SafeArith;

/// Whether an epoch one ahead of the current epoch may be used to read a RANDAO mix.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AllowNextEpoch {
    True,
    False,
}

impl AllowNextEpoch {
    fn upper_bound_of(self, current_epoch: Epoch) -> Result<Epoch, Error> {
        match self {
            AllowNextEpoch::True => Ok(current_epoch.safe_add(1)?),
            AllowNextEpoch::False => Ok(current_epoch),
        }
    }
}

impl<E: EthSpec> BeaconState<E> {
    /// Safely obtains the index for latest block roots, given some `slot`.
    fn get_latest_block_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        if slot < self.slot && self.slot <= slot.safe_add(self.block_roots.len() as u64)? {
            Ok(slot.as_usize().safe_rem(self.block_roots.len())?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Return the block root at a recent `slot`.
    pub fn get_block_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_block_roots_index(slot)?;
        self.block_roots
            .get(i)
            .ok_or(Error::BlockRootsOutOfBounds(i))
    }

    /// Return the block root at a recent `epoch`.
    pub fn get_block_root_at_epoch(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        self.get_block_root(epoch.start_slot(E::slots_per_epoch()))
    }

    /// Sets the block root for some given slot.
    pub fn set_block_root(&mut self, slot: Slot, block_root: Hash256) -> Result<(), Error> {
        let i = slot.as_usize().safe_rem(self.block_roots.len())?;
        *self
            .block_roots
            .get_mut(i)
            .ok_or(Error::BlockRootsOutOfBounds(i))? = block_root;
        Ok(())
    }

    /// Gets the state root for some slot.
    pub fn get_state_root(&self, slot: Slot) -> Result<&Hash256, Error> {
        let i = self.get_latest_state_roots_index(slot)?;
        self.state_roots
            .get(i)
            .ok_or(Error::StateRootsOutOfBounds(i))
    }

    /// Sets the latest state root for slot.
    pub fn set_state_root(&mut self, slot: Slot, state_root: Hash256) -> Result<(), Error> {
        let i = slot.as_usize().safe_rem(self.state_roots.len())?;
        *self
            .state_roots
            .get_mut(i)
            .ok_or(Error::StateRootsOutOfBounds(i))? = state_root;
        Ok(())
    }

    /// Safely obtain the index for `latest_state_roots`, given some `slot`.
    fn get_latest_state_roots_index(&self, slot: Slot) -> Result<usize, Error> {
        if slot < self.slot && self.slot <= slot.safe_add(self.state_roots.len() as u64)? {
            Ok(slot.as_usize().safe_rem(self.state_roots.len())?)
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// The oldest epoch whose RANDAO mix is still retained.
    pub fn min_randao_epoch(&self) -> Epoch {
        self.current_epoch()
            .saturating_add(1u64)
            .saturating_sub(E::epochs_per_historical_vector() as u64)
    }

    /// Safely obtains the index for `randao_mixes`.
    fn get_randao_mix_index(
        &self,
        epoch: Epoch,
        allow_next_epoch: AllowNextEpoch,
    ) -> Result<usize, Error> {
        let current_epoch = self.current_epoch();
        let len = E::epochs_per_historical_vector() as u64;

        if current_epoch < epoch.safe_add(len)?
            && epoch <= allow_next_epoch.upper_bound_of(current_epoch)?
        {
            Ok(epoch.as_usize().safe_rem(len as usize)?)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// XOR-assigns the existing `epoch` randao mix with the hash of the `signature`.
    ///
    /// # Errors:
    ///
    /// See `Self::get_randao_mix`.
    pub fn update_randao_mix(&mut self, epoch: Epoch, signature: &SignatureBytes) -> Result<(), Error> {
        let i = epoch
            .as_usize()
            .safe_rem(E::epochs_per_historical_vector())?;

        let signature_hash = Hash256::from_slice(&hash(signature.as_serialized()));

        *self
            .randao_mixes
            .get_mut(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))? = *self.get_randao_mix(epoch)? ^ signature_hash;

        Ok(())
    }

    /// Return the randao mix at a recent ``epoch``.
    pub fn get_randao_mix(&self, epoch: Epoch) -> Result<&Hash256, Error> {
        let i = self.get_randao_mix_index(epoch, AllowNextEpoch::False)?;
        self.randao_mixes
            .get(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))
    }

    /// Set the randao mix at a recent ``epoch``.
    pub fn set_randao_mix(&mut self, epoch: Epoch, mix: Hash256) -> Result<(), Error> {
        let i = self.get_randao_mix_index(epoch, AllowNextEpoch::True)?;
        *self
            .randao_mixes
            .get_mut(i)
            .ok_or(Error::RandaoMixesOutOfBounds(i))? = mix;
        Ok(())
    }

    /// Safely obtain the index for `slashings`, given some `epoch`.
    fn get_slashings_index(
        &self,
        epoch: Epoch,
        allow_next_epoch: AllowNextEpoch,
    ) -> Result<usize, Error> {
        // We allow the slashings vector to be accessed at any cached epoch at or before
        // the current epoch, or the next epoch if `AllowNextEpoch::True` is passed.
        let current_epoch = self.current_epoch();
        if current_epoch < epoch.safe_add(E::epochs_per_slashings_vector() as u64)?
            && epoch <= allow_next_epoch.upper_bound_of(current_epoch)?
        {
            Ok(epoch
                .as_usize()
                .safe_rem(E::epochs_per_slashings_vector())?)
        } else {
            Err(Error::EpochOutOfBounds)
        }
    }

    /// Get a reference to the entire `slashings` vector.
    pub fn get_all_slashings(&self) -> &[u64] {
        &self.slashings
    }

    /// Get the total slashed balances for some epoch.
    pub fn get_slashings(&self, epoch: Epoch) -> Result<u64, Error> {
        let i = self.get_slashings_index(epoch, AllowNextEpoch::False)?;
        self.slashings
            .get(i)
            .copied()
            .ok_or(Error::SlashingsOutOfBounds(i))
    }

    /// Set the total slashed balances for some epoch.
    pub fn set_slashings(&mut self, epoch: Epoch, value: u64) -> Result<(), Error> {
        let i = self.get_slashings_index(epoch, AllowNextEpoch::True)?;
        *self
            .slashings
            .get_mut(i)
            .ok_or(Error::SlashingsOutOfBounds(i))? = value;
        Ok(())
    }
}
