//! A small chain driver for tests and benchmarks.
//!
//! `BlockBuilder` owns an interop genesis state and the keypairs behind it, and can produce fully
//! signed blocks on top of it: correct proposer, RANDAO reveal, execution payload and
//! withdrawals, attestations from every committee of the previous slot, and an optional full sync
//! aggregate.
use crate::genesis::interop_genesis_state;
use crate::per_block_processing::{
    compute_timestamp_at_slot, errors::BlockProcessingError, get_expected_withdrawals,
    per_block_processing, BlockSignatureStrategy,
};
use crate::state_advance::{self, complete_state_advance};
use crate::ConsensusContext;
use pq_crypto::{generate_deterministic_keypairs, Keypair, Signer, TestScheme};
use safe_arith::ArithError;
use types::*;

#[derive(Debug, PartialEq)]
pub enum Error {
    StateAdvance(state_advance::Error),
    BlockProcessing(BlockProcessingError),
    BeaconState(BeaconStateError),
    SszTypes(ssz_types::Error),
    Attestation(AttestationError),
    Arith(ArithError),
    /// No keypair is known for the validator at this index.
    UnknownKeypair(usize),
}

impl From<state_advance::Error> for Error {
    fn from(e: state_advance::Error) -> Self {
        Error::StateAdvance(e)
    }
}

impl From<BlockProcessingError> for Error {
    fn from(e: BlockProcessingError) -> Self {
        Error::BlockProcessing(e)
    }
}

impl From<BeaconStateError> for Error {
    fn from(e: BeaconStateError) -> Self {
        Error::BeaconState(e)
    }
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Self {
        Error::SszTypes(e)
    }
}

impl From<AttestationError> for Error {
    fn from(e: AttestationError) -> Self {
        Error::Attestation(e)
    }
}

impl From<ArithError> for Error {
    fn from(e: ArithError) -> Self {
        Error::Arith(e)
    }
}

/// What a produced block should carry besides the mandatory header, RANDAO and payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockOptions {
    /// Include an attestation from every committee of the previous slot.
    pub attest: bool,
    /// Include a sync aggregate signed by the whole current sync committee.
    pub sync_aggregate: bool,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            attest: true,
            sync_aggregate: true,
        }
    }
}

pub struct BlockBuilder<E: EthSpec> {
    pub state: BeaconState<E>,
    pub keypairs: Vec<Keypair>,
    pub spec: ChainSpec,
}

impl<E: EthSpec> BlockBuilder<E> {
    /// Start from an interop genesis with `validator_count` fully funded validators.
    pub fn new(validator_count: usize, spec: &ChainSpec) -> Result<Self, Error> {
        let keypairs = generate_deterministic_keypairs(validator_count);
        let state = interop_genesis_state::<E>(&keypairs, 0, Hash256::repeat_byte(0x42), spec)?;
        Ok(Self {
            state,
            keypairs,
            spec: spec.clone(),
        })
    }

    fn keypair(&self, validator_index: usize) -> Result<&Keypair, Error> {
        self.keypairs
            .get(validator_index)
            .ok_or(Error::UnknownKeypair(validator_index))
    }

    /// Skip forward to `slot` without blocks.
    pub fn advance_to_slot(&mut self, slot: Slot) -> Result<(), Error> {
        complete_state_advance(&mut self.state, None, slot, &self.spec)?;
        self.state.build_caches(&self.spec)?;
        Ok(())
    }

    /// Advance to `slot` and produce a signed block for it.
    ///
    /// The builder's state is left at `slot`, ready for `process_block`.
    pub fn produce_block(
        &mut self,
        slot: Slot,
        options: BlockOptions,
    ) -> Result<SignedBeaconBlock<E>, Error> {
        self.advance_to_slot(slot)?;

        let sync_aggregate = if options.sync_aggregate {
            self.full_sync_aggregate(slot)?
        } else {
            SyncAggregate::new()
        };
        let attestations = match slot.as_u64().checked_sub(1) {
            Some(previous_slot) if options.attest => self.attestations_at(Slot::new(previous_slot))?,
            _ => vec![],
        };

        let spec = &self.spec;
        let state = &self.state;
        let proposer_index = state.get_beacon_proposer_index(slot, spec)?;
        let proposer = self.keypair(proposer_index)?;

        let mut body = BeaconBlockBody::<E>::empty();
        body.randao_reveal = self.randao_reveal(slot, &proposer.sk);
        body.execution_data = state.execution_data.clone();
        body.graffiti = Hash256::from_low_u64_be(slot.as_u64());
        body.execution_payload = self.execution_payload()?;
        body.attestations = VariableList::new(attestations)?;
        body.sync_aggregate = sync_aggregate;

        let mut block = BeaconBlock {
            slot,
            proposer_index: proposer_index as u64,
            parent_root: state.latest_block_header.canonical_root(),
            state_root: Hash256::zero(),
            body,
        };

        // Find the post-state root by applying the unsigned block to a scratch state.
        let mut scratch = state.clone();
        let unsigned = SignedBeaconBlock {
            message: block.clone(),
            signature: SignatureBytes::empty(),
        };
        let mut ctxt = ConsensusContext::new(slot);
        per_block_processing(
            &mut scratch,
            &unsigned,
            BlockSignatureStrategy::NoVerification,
            &TestScheme,
            &mut ctxt,
            spec,
        )?;
        block.state_root = scratch.canonical_root();

        Ok(block.sign(
            &TestScheme,
            &proposer.sk,
            &state.fork,
            state.genesis_validators_root,
            spec,
        ))
    }

    /// Apply `block` to the builder's state, which must already be at the block's slot.
    pub fn process_block(
        &mut self,
        block: &SignedBeaconBlock<E>,
        strategy: BlockSignatureStrategy,
    ) -> Result<(), Error> {
        let mut ctxt = ConsensusContext::new(block.slot());
        per_block_processing(
            &mut self.state,
            block,
            strategy,
            &TestScheme,
            &mut ctxt,
            &self.spec,
        )?;
        Ok(())
    }

    /// Produce and apply a block at every slot up to and including `target_slot`.
    pub fn extend_chain(&mut self, target_slot: Slot, options: BlockOptions) -> Result<(), Error> {
        while self.state.slot < target_slot {
            let slot = self.state.slot.safe_add(1)?;
            let block = self.produce_block(slot, options)?;
            self.process_block(&block, BlockSignatureStrategy::VerifyBulk)?;
        }
        Ok(())
    }

    pub fn randao_reveal(&self, slot: Slot, secret_key: &SecretKey) -> SignatureBytes {
        let epoch = slot.epoch(E::slots_per_epoch());
        let domain = self.spec.get_domain(
            epoch,
            Domain::Randao,
            &self.state.fork,
            self.state.genesis_validators_root,
        );
        TestScheme.sign(secret_key, epoch.signing_root(domain))
    }

    /// A payload that builds on the state's latest payload and carries the expected withdrawals.
    pub fn execution_payload(&self) -> Result<ExecutionPayload<E>, Error> {
        let state = &self.state;
        let parent = &state.latest_execution_payload_header;
        Ok(ExecutionPayload {
            parent_hash: parent.block_hash,
            prev_randao: *state.get_randao_mix(state.current_epoch())?,
            block_number: parent.block_number.safe_add(1)?,
            timestamp: compute_timestamp_at_slot(state, &self.spec)?,
            block_hash: Hash256::from_low_u64_be(state.slot.as_u64().safe_add(1)?),
            withdrawals: get_expected_withdrawals(state, &self.spec)?,
            ..ExecutionPayload::default()
        })
    }

    /// One attestation per committee at `slot`, signed by every member and voting for the
    /// canonical head, target and source.
    pub fn attestations_at(&self, slot: Slot) -> Result<Vec<Attestation<E>>, Error> {
        let state = &self.state;
        let target_epoch = slot.epoch(E::slots_per_epoch());
        let target = Checkpoint {
            epoch: target_epoch,
            root: *state.get_block_root_at_epoch(target_epoch)?,
        };
        let source = state.expected_attestation_source(target_epoch)?;
        let domain = self.spec.get_domain(
            target_epoch,
            Domain::BeaconAttester,
            &state.fork,
            state.genesis_validators_root,
        );

        state
            .get_beacon_committees_at_slot(slot)?
            .into_iter()
            .map(|committee| -> Result<Attestation<E>, Error> {
                let data = AttestationData {
                    slot,
                    index: committee.index,
                    beacon_block_root: *state.get_block_root(slot)?,
                    source,
                    target,
                };
                let message = data.signing_root(domain);
                let mut attestation =
                    Attestation::empty_for_signing(committee.committee.len(), data)?;
                let mut signatures = Vec::with_capacity(committee.committee.len());
                for (position, &validator_index) in committee.committee.iter().enumerate() {
                    attestation.aggregation_bits.set(position, true)?;
                    signatures.push(TestScheme.sign(&self.keypair(validator_index)?.sk, message));
                }
                attestation.signatures = VariableList::new(signatures)?;
                Ok(attestation)
            })
            .collect()
    }

    /// A sync aggregate for a block at `slot` in which every committee member signs.
    pub fn full_sync_aggregate(&mut self, slot: Slot) -> Result<SyncAggregate<E>, Error> {
        let state = &self.state;
        let previous_slot = slot.saturating_sub(1u64);
        let block_root = *state.get_block_root(previous_slot)?;
        let domain = self.spec.get_domain(
            previous_slot.epoch(E::slots_per_epoch()),
            Domain::SyncCommittee,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = block_root.signing_root(domain);

        let committee = state
            .get_built_sync_committee(slot.epoch(E::slots_per_epoch()), &self.spec)?
            .clone();
        let indices = self.state.get_sync_committee_indices(&committee)?;

        let mut aggregate = SyncAggregate::new();
        let mut signatures = Vec::with_capacity(indices.len());
        for (position, validator_index) in indices.into_iter().enumerate() {
            aggregate.sync_committee_bits.set(position, true)?;
            signatures.push(TestScheme.sign(&self.keypair(validator_index)?.sk, message));
        }
        aggregate.sync_committee_signatures = VariableList::new(signatures)?;
        Ok(aggregate)
    }
}
