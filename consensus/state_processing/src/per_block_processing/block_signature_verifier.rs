use super::signature_sets::{Error as SignatureSetError, *};
use crate::per_block_processing::errors::{AttestationInvalid, BlockOperationError};
use pq_crypto::{verify_signature_sets, PublicKeyBytes, SignatureSet, SignatureVerifier};
use rayon::prelude::*;
use std::borrow::Cow;
use types::{BeaconState, BeaconStateError, ChainSpec, EthSpec, Hash256, SignedBeaconBlock};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// All public keys were found but signature verification failed. The block is invalid.
    SignatureInvalid,
    /// An attestation in the block was invalid. The block is invalid.
    AttestationValidationError(BlockOperationError<AttestationInvalid>),
    /// There was an error attempting to read from a `BeaconState`. Block
    /// validity was not determined.
    BeaconStateError(BeaconStateError),
    /// The `BeaconBlock` has a `proposer_index` that does not match the index we computed locally.
    ///
    /// The block is invalid.
    IncorrectBlockProposer { block: u64, local_shuffling: u64 },
    /// Failed to load a signature set. The block may be invalid or we failed to process it.
    SignatureSetError(SignatureSetError),
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Error {
        Error::BeaconStateError(e)
    }
}

impl From<SignatureSetError> for Error {
    fn from(e: SignatureSetError) -> Error {
        match e {
            // Make a special distinction for `IncorrectBlockProposer` since it indicates an
            // invalid block, not an internal error.
            SignatureSetError::IncorrectBlockProposer {
                block,
                local_shuffling,
            } => Error::IncorrectBlockProposer {
                block,
                local_shuffling,
            },
            e => Error::SignatureSetError(e),
        }
    }
}

impl From<BlockOperationError<AttestationInvalid>> for Error {
    fn from(e: BlockOperationError<AttestationInvalid>) -> Error {
        Error::AttestationValidationError(e)
    }
}

/// Reads the signatures and keys from a `SignedBeaconBlock`, storing them as a `Vec<SignatureSet>`.
///
/// This allows the whole block to be checked in one parallel pass (see
/// `Self::verify_entire_block(..)`).
pub struct BlockSignatureVerifier<'a, E, F>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>> + Clone,
{
    get_pubkey: F,
    verifier: &'a dyn SignatureVerifier,
    state: &'a BeaconState<E>,
    spec: &'a ChainSpec,
    sets: ParallelSignatureSets<'a>,
}

#[derive(Default)]
pub struct ParallelSignatureSets<'a> {
    sets: Vec<SignatureSet<'a>>,
}

impl<'a> From<Vec<SignatureSet<'a>>> for ParallelSignatureSets<'a> {
    fn from(sets: Vec<SignatureSet<'a>>) -> Self {
        Self { sets }
    }
}

impl<'a, E, F> BlockSignatureVerifier<'a, E, F>
where
    E: EthSpec,
    F: Fn(usize) -> Option<Cow<'a, PublicKeyBytes>> + Clone,
{
    /// Create a new verifier without any included signatures. See the `include...` functions to
    /// add signatures, and the `verify`
    pub fn new(
        state: &'a BeaconState<E>,
        get_pubkey: F,
        verifier: &'a dyn SignatureVerifier,
        spec: &'a ChainSpec,
    ) -> Self {
        Self {
            get_pubkey,
            verifier,
            state,
            spec,
            sets: ParallelSignatureSets::default(),
        }
    }

    /// Verify all* the signatures in the given `SignedBeaconBlock`, returning `Ok(())` if the signatures
    /// are valid.
    ///
    /// * : _Does not verify any signatures in `block.body.deposits`. A block is still valid if it
    /// contains invalid signatures on deposits._
    ///
    /// See `Self::verify` for more detail.
    pub fn verify_entire_block(
        state: &'a BeaconState<E>,
        get_pubkey: F,
        verifier: &'a dyn SignatureVerifier,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
        spec: &'a ChainSpec,
    ) -> Result<()> {
        let mut verifier = Self::new(state, get_pubkey, verifier, spec);
        verifier.include_all_signatures(block, block_root)?;
        verifier.verify()
    }

    /// Includes all signatures on the block (except the deposit signatures) for verification.
    pub fn include_all_signatures(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
    ) -> Result<()> {
        self.include_block_proposal(block, block_root)?;
        self.include_all_signatures_except_proposal(block)?;

        Ok(())
    }

    /// Includes all signatures on the block (except the deposit signatures and the proposal
    /// signature) for verification.
    pub fn include_all_signatures_except_proposal(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
    ) -> Result<()> {
        self.include_randao_reveal(block)?;
        self.include_proposer_slashings(block)?;
        self.include_attester_slashings(block)?;
        self.include_attestations(block)?;
        // Deposits are not included because they can legally have invalid signatures.
        self.include_exits(block)?;
        self.include_sync_aggregate(block)?;

        Ok(())
    }

    /// Includes the block signature for `self.block` for verification.
    pub fn include_block_proposal(
        &mut self,
        block: &'a SignedBeaconBlock<E>,
        block_root: Option<Hash256>,
    ) -> Result<()> {
        let set = block_proposal_signature_set(
            self.state,
            self.get_pubkey.clone(),
            block,
            block_root,
            self.spec,
        )?;
        self.sets.push(set);
        Ok(())
    }

    /// Includes the randao signature for `self.block` for verification.
    pub fn include_randao_reveal(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let set = randao_signature_set(
            self.state,
            self.get_pubkey.clone(),
            &block.message,
            self.spec,
        )?;
        self.sets.push(set);
        Ok(())
    }

    /// Includes all signatures in `self.block.body.proposer_slashings` for verification.
    pub fn include_proposer_slashings(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let proposer_slashings = &block.message.body.proposer_slashings;
        self.sets.sets.reserve(proposer_slashings.len() * 2);

        proposer_slashings.iter().try_for_each(|proposer_slashing| {
            let (set_1, set_2) = proposer_slashing_signature_set(
                self.state,
                self.get_pubkey.clone(),
                proposer_slashing,
                self.spec,
            )?;

            self.sets.push(set_1);
            self.sets.push(set_2);

            Ok(())
        })
    }

    /// Includes all signatures in `self.block.body.attester_slashings` for verification.
    pub fn include_attester_slashings(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let attester_slashings = &block.message.body.attester_slashings;
        self.sets.sets.reserve(attester_slashings.len() * 2);

        attester_slashings.iter().try_for_each(|attester_slashing| {
            let (set_1, set_2) = attester_slashing_signature_sets(
                self.state,
                self.get_pubkey.clone(),
                attester_slashing,
                self.spec,
            )?;

            self.sets.push(set_1);
            self.sets.push(set_2);

            Ok(())
        })
    }

    /// Includes all signatures in `self.block.body.attestations` for verification.
    ///
    /// Each attestation contributes one set carrying a signature per attester.
    pub fn include_attestations(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let attestations = &block.message.body.attestations;
        self.sets.sets.reserve(attestations.len());

        attestations.iter().try_for_each(|attestation| {
            let committee = self
                .state
                .get_beacon_committee(attestation.data.slot, attestation.data.index)?;

            self.sets.push(attestation_signature_set(
                self.state,
                self.get_pubkey.clone(),
                attestation,
                committee.committee,
                self.spec,
            )?);

            Ok(())
        })
    }

    /// Includes all signatures in `self.block.body.voluntary_exits` for verification.
    pub fn include_exits(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        let voluntary_exits = &block.message.body.voluntary_exits;
        self.sets.sets.reserve(voluntary_exits.len());

        voluntary_exits.iter().try_for_each(|exit| {
            let exit = exit_signature_set(self.state, self.get_pubkey.clone(), exit, self.spec)?;

            self.sets.push(exit);

            Ok(())
        })
    }

    /// Include the signatures of the block's sync aggregate (if any member took part) for
    /// verification.
    pub fn include_sync_aggregate(&mut self, block: &'a SignedBeaconBlock<E>) -> Result<()> {
        if let Some(signature_set) = sync_aggregate_signature_set(
            &block.message.body.sync_aggregate,
            block.slot(),
            block.parent_root(),
            self.state,
            self.spec,
        )? {
            self.sets.push(signature_set);
        }
        Ok(())
    }

    /// Verify all the signatures that have been included in `self`, returning `Ok(())` if and only
    /// if all the signatures are valid.
    ///
    /// See `ParallelSignatureSets::verify` for more info.
    pub fn verify(self) -> Result<()> {
        if self.sets.verify(self.verifier) {
            Ok(())
        } else {
            Err(Error::SignatureInvalid)
        }
    }
}

impl<'a> ParallelSignatureSets<'a> {
    pub fn push(&mut self, set: SignatureSet<'a>) {
        self.sets.push(set);
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Verify all the signatures that have been included in `self`, returning `true` if and only if
    /// all the signatures are valid.
    ///
    /// It is not possible to know exactly _which_ signature is invalid here, just that
    /// _at least one_ was invalid.
    ///
    /// Uses `rayon` to spread the sets over the pool in chunks. Chunk results are combined with a
    /// logical AND, so the outcome is independent of scheduling.
    #[must_use]
    pub fn verify(self, verifier: &dyn SignatureVerifier) -> bool {
        let num_sets = self.sets.len();
        let num_chunks = std::cmp::max(1, num_sets / rayon::current_num_threads());
        self.sets
            .into_par_iter()
            .chunks(num_chunks)
            .map(|chunk| verify_signature_sets(&chunk, verifier))
            .reduce(|| true, |current, this| current && this)
    }
}
