use crate::consensus_context::ConsensusContext;
use crate::metrics;
use errors::{BlockOperationError, BlockProcessingError, ExecutionPayloadInvalid, HeaderInvalid};
use rayon::prelude::*;
use safe_arith::{ArithError, SafeArith};
use signature_sets::{block_proposal_signature_set, get_pubkey_from_state, randao_signature_set};
use tree_hash::TreeHash;
use types::*;

pub use self::verify_attester_slashing::{
    get_slashable_indices, get_slashable_indices_modular, verify_attester_slashing,
};
pub use self::verify_proposer_slashing::verify_proposer_slashing;
pub use block_signature_verifier::{BlockSignatureVerifier, ParallelSignatureSets};
pub use is_valid_indexed_attestation::is_valid_indexed_attestation;
pub use process_operations::process_operations;
pub use sync_committee::{compute_sync_aggregate_rewards, process_sync_aggregate};
pub use verify_attestation::{
    verify_attestation_for_block_inclusion, verify_attestation_for_state,
};
pub use verify_deposit::{
    get_existing_validator_index, verify_deposit_merkle_proof, verify_deposit_signature,
};
pub use verify_exit::verify_exit;

pub mod block_signature_verifier;
pub mod errors;
mod is_valid_indexed_attestation;
pub mod process_operations;
pub mod signature_sets;
pub mod sync_committee;
mod verify_attestation;
mod verify_attester_slashing;
mod verify_deposit;
mod verify_exit;
mod verify_proposer_slashing;

/// The strategy to be used when validating the block's signatures.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BlockSignatureStrategy {
    /// Do not validate any signature. Use with caution.
    NoVerification,
    /// Validate each signature individually, as its object is being processed.
    VerifyIndividual,
    /// Validate only the randao reveal signature.
    VerifyRandao,
    /// Verify all signatures in bulk at the beginning of block processing.
    VerifyBulk,
}

/// Whether the operation processors should check signatures, and with what.
///
/// Deposit signatures are outside this switch: an invalid deposit signature is a skipped deposit
/// rather than an invalid block, so they are always checked.
#[derive(Clone, Copy)]
pub enum VerifySignatures<'a> {
    /// Validate all signatures encountered.
    True(&'a dyn SignatureVerifier),
    /// Do not validate any signature. Use with caution.
    False,
}

impl<'a> VerifySignatures<'a> {
    pub fn is_true(self) -> bool {
        matches!(self, VerifySignatures::True(_))
    }
}

/// Updates the state for a new block, whilst validating that the block is valid, optionally
/// checking the block proposer signature.
///
/// Returns `Ok(())` if the block is valid and the state was successfully updated. Otherwise
/// returns an error describing why the block was invalid or how the function failed to execute.
///
/// The block root used for the proposer signature is taken from `ctxt`, computing it if it has
/// not been set. The state must already have been advanced to the block's slot.
pub fn per_block_processing<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock<E>,
    block_signature_strategy: BlockSignatureStrategy,
    verifier: &dyn SignatureVerifier,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let _timer = metrics::start_timer(&metrics::BLOCK_PROCESSING_TIMES);

    let result = apply_block(
        state,
        signed_block,
        block_signature_strategy,
        verifier,
        ctxt,
        spec,
    );
    if result.is_err() {
        metrics::inc_counter(&metrics::BLOCK_PROCESSING_FAILURES);
    }
    result
}

fn apply_block<E: EthSpec>(
    state: &mut BeaconState<E>,
    signed_block: &SignedBeaconBlock<E>,
    block_signature_strategy: BlockSignatureStrategy,
    verifier: &dyn SignatureVerifier,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let block = &signed_block.message;

    // Verify that the state has been advanced to the slot of the block.
    block_verify!(
        state.slot == block.slot,
        BlockProcessingError::InconsistentStateSlot {
            state_slot: state.slot,
            block_slot: block.slot,
        }
    );

    // Ensure the current and previous epoch caches are built.
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;
    state.build_total_active_balance_cache(spec)?;

    let verify_signatures = match block_signature_strategy {
        BlockSignatureStrategy::VerifyBulk => {
            // Verify all signatures in the block at once.
            let block_root = Some(ctxt.get_current_block_root(signed_block)?);
            let _timer = metrics::start_timer(&metrics::BLOCK_SIGNATURE_VERIFICATION_TIMES);
            block_verify!(
                BlockSignatureVerifier::verify_entire_block(
                    state,
                    |i| get_pubkey_from_state(state, i),
                    verifier,
                    signed_block,
                    block_root,
                    spec
                )
                .is_ok(),
                BlockProcessingError::BulkSignatureVerificationFailed
            );
            VerifySignatures::False
        }
        BlockSignatureStrategy::VerifyIndividual => VerifySignatures::True(verifier),
        BlockSignatureStrategy::NoVerification => VerifySignatures::False,
        BlockSignatureStrategy::VerifyRandao => VerifySignatures::False,
    };

    let proposer_index = process_block_header(state, block, ctxt, spec)?;

    if verify_signatures.is_true() {
        let block_root = ctxt.get_current_block_root(signed_block)?;
        verify_block_signature(state, signed_block, Some(block_root), verifier, spec)?;
    }

    let verify_randao = if let BlockSignatureStrategy::VerifyRandao = block_signature_strategy {
        VerifySignatures::True(verifier)
    } else {
        verify_signatures
    };

    process_withdrawals::<E, _>(state, &block.body.execution_payload, spec)?;
    process_execution_payload::<E, _>(state, &block.body.execution_payload, spec)?;
    process_randao(state, block, verify_randao, spec)?;
    process_execution_data(state, &block.body.execution_data)?;
    process_operations(
        state,
        &block.body,
        verify_signatures,
        verifier,
        ctxt,
        spec,
    )?;
    process_sync_aggregate(
        state,
        &block.body.sync_aggregate,
        proposer_index,
        verify_signatures,
        spec,
    )?;

    Ok(())
}

/// Processes the block header, returning the proposer index.
pub fn process_block_header<E: EthSpec>(
    state: &mut BeaconState<E>,
    block: &BeaconBlock<E>,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<u64, BlockOperationError<HeaderInvalid>> {
    // Verify that the slots match
    verify!(block.slot == state.slot, HeaderInvalid::StateSlotMismatch);

    // Verify that the block is newer than the latest block header
    verify!(
        block.slot > state.latest_block_header.slot,
        HeaderInvalid::OlderThanLatestBlockHeader {
            block_slot: block.slot,
            latest_block_header_slot: state.latest_block_header.slot,
        }
    );

    // Verify that proposer index is the correct index
    let proposer_index = block.proposer_index;
    let state_proposer_index = ctxt.get_proposer_index(state, spec)?;
    verify!(
        proposer_index == state_proposer_index,
        HeaderInvalid::ProposerIndexMismatch {
            block_proposer_index: proposer_index as usize,
            state_proposer_index: state_proposer_index as usize,
        }
    );

    let expected_previous_block_root = state.latest_block_header.tree_hash_root();
    verify!(
        block.parent_root == expected_previous_block_root,
        HeaderInvalid::ParentBlockRootMismatch {
            state: expected_previous_block_root,
            block: block.parent_root,
        }
    );

    state.latest_block_header = block.temporary_block_header();

    // Verify proposer is not slashed
    verify!(
        !state.get_validator(proposer_index as usize)?.slashed,
        HeaderInvalid::ProposerSlashed(proposer_index as usize)
    );

    Ok(proposer_index)
}

/// Verifies the signature of a block.
pub fn verify_block_signature<E: EthSpec>(
    state: &BeaconState<E>,
    block: &SignedBeaconBlock<E>,
    block_root: Option<Hash256>,
    verifier: &dyn SignatureVerifier,
    spec: &ChainSpec,
) -> Result<(), BlockOperationError<HeaderInvalid>> {
    verify!(
        block_proposal_signature_set(
            state,
            |i| get_pubkey_from_state(state, i),
            block,
            block_root,
            spec
        )?
        .verify(verifier),
        HeaderInvalid::ProposalSignatureInvalid
    );

    Ok(())
}

/// Verifies the `randao_reveal` against the block's proposer pubkey and updates
/// `state.randao_mixes`.
pub fn process_randao<E: EthSpec>(
    state: &mut BeaconState<E>,
    block: &BeaconBlock<E>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    if let VerifySignatures::True(verifier) = verify_signatures {
        // Verify RANDAO reveal signature.
        block_verify!(
            randao_signature_set(state, |i| get_pubkey_from_state(state, i), block, spec)?
                .verify(verifier),
            BlockProcessingError::RandaoSignatureInvalid
        );
    }

    // Update the current epoch RANDAO mix.
    state.update_randao_mix(state.current_epoch(), &block.body.randao_reveal)?;

    Ok(())
}

/// Update the `state.execution_data_votes` based upon the `execution_data` provided.
pub fn process_execution_data<E: EthSpec>(
    state: &mut BeaconState<E>,
    execution_data: &ExecutionData,
) -> Result<(), BlockProcessingError> {
    if let Some(new_execution_data) = get_new_execution_data(state, execution_data)? {
        state.execution_data = new_execution_data;
    }

    state.execution_data_votes.push(execution_data.clone())?;

    Ok(())
}

/// Returns `Ok(Some(execution_data))` if adding the given `execution_data` to
/// `state.execution_data_votes` would result in a change to `state.execution_data`.
pub fn get_new_execution_data<E: EthSpec>(
    state: &BeaconState<E>,
    execution_data: &ExecutionData,
) -> Result<Option<ExecutionData>, ArithError> {
    let num_votes = state
        .execution_data_votes
        .iter()
        .filter(|vote| *vote == execution_data)
        .count();

    // The +1 is to account for the `execution_data` supplied to the function.
    if num_votes.safe_add(1)?.safe_mul(2)? > E::slots_per_eth1_voting_period() {
        Ok(Some(execution_data.clone()))
    } else {
        Ok(None)
    }
}

/// Checks the payload against the state without recording it.
///
/// The payload must build on the last recorded payload, commit to the current RANDAO mix and
/// carry the timestamp of the state's slot.
pub fn partially_verify_execution_payload<E: EthSpec, Payload: ExecPayload<E>>(
    state: &BeaconState<E>,
    payload: &Payload,
    spec: &ChainSpec,
) -> Result<(), BlockOperationError<ExecutionPayloadInvalid>> {
    verify!(
        payload.parent_hash() == state.latest_execution_payload_header.block_hash,
        ExecutionPayloadInvalid::ParentHashMismatch {
            state: state.latest_execution_payload_header.block_hash,
            payload: payload.parent_hash(),
        }
    );
    let randao_mix = *state.get_randao_mix(state.current_epoch())?;
    verify!(
        payload.prev_randao() == randao_mix,
        ExecutionPayloadInvalid::RandaoMismatch {
            state: randao_mix,
            payload: payload.prev_randao(),
        }
    );

    let timestamp = compute_timestamp_at_slot(state, spec)?;
    verify!(
        payload.timestamp() == timestamp,
        ExecutionPayloadInvalid::TimestampMismatch {
            expected: timestamp,
            found: payload.timestamp(),
        }
    );

    Ok(())
}

/// Verifies the payload and records its header in the state.
///
/// No execution engine is consulted; the payload is taken to be valid on the execution side.
pub fn process_execution_payload<E: EthSpec, Payload: ExecPayload<E>>(
    state: &mut BeaconState<E>,
    payload: &Payload,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    partially_verify_execution_payload::<E, Payload>(state, payload, spec)?;

    state.latest_execution_payload_header = payload.to_execution_payload_header();

    Ok(())
}

/// Compute the timestamp an execution payload for the state's slot must carry.
pub fn compute_timestamp_at_slot<E: EthSpec>(
    state: &BeaconState<E>,
    spec: &ChainSpec,
) -> Result<u64, ArithError> {
    let slots_since_genesis = state.slot.as_u64().safe_sub(spec.genesis_slot.as_u64())?;
    slots_since_genesis
        .safe_mul(spec.seconds_per_slot)
        .and_then(|since_genesis| state.genesis_time.safe_add(since_genesis))
}

/// Compute the withdrawals the next payload must carry.
///
/// At most `max_validators_per_withdrawals_sweep` validators are visited, starting from
/// `state.next_withdrawal_validator_index` and wrapping around the registry.
pub fn get_expected_withdrawals<E: EthSpec>(
    state: &BeaconState<E>,
    spec: &ChainSpec,
) -> Result<Withdrawals<E>, BlockProcessingError> {
    let epoch = state.current_epoch();
    let mut withdrawal_index = state.next_withdrawal_index;
    let mut validator_index = state.next_withdrawal_validator_index;
    let mut withdrawals = vec![];

    let bound = std::cmp::min(
        state.validators.len() as u64,
        spec.max_validators_per_withdrawals_sweep,
    );
    for _ in 0..bound {
        let validator = state.get_validator(validator_index as usize)?;
        let balance = state.get_balance(validator_index as usize)?;
        if validator.is_fully_withdrawable_at(balance, epoch, spec) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address: validator
                    .get_execution_withdrawal_address(spec)
                    .ok_or(BlockProcessingError::WithdrawalCredentialsInvalid)?,
                amount: balance,
            });
            withdrawal_index.safe_add_assign(1)?;
        } else if validator.is_partially_withdrawable_validator(balance, spec) {
            withdrawals.push(Withdrawal {
                index: withdrawal_index,
                validator_index,
                address: validator
                    .get_execution_withdrawal_address(spec)
                    .ok_or(BlockProcessingError::WithdrawalCredentialsInvalid)?,
                amount: balance.safe_sub(spec.max_effective_balance)?,
            });
            withdrawal_index.safe_add_assign(1)?;
        }
        if withdrawals.len() == E::max_withdrawals_per_payload() {
            break;
        }
        validator_index = validator_index
            .safe_add(1)?
            .safe_rem(state.validators.len() as u64)?;
    }

    Ok(Withdrawals::<E>::new(withdrawals)?)
}

/// Apply the withdrawals committed to by `payload`, which must be exactly the expected ones.
///
/// Accepts both full payloads and headers, comparing by withdrawals root.
pub fn process_withdrawals<E: EthSpec, Payload: ExecPayload<E>>(
    state: &mut BeaconState<E>,
    payload: &Payload,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let expected_withdrawals = get_expected_withdrawals(state, spec)?;
    let expected_root = expected_withdrawals.tree_hash_root();
    let withdrawals_root = payload.withdrawals_root();

    if expected_root != withdrawals_root {
        return Err(BlockProcessingError::WithdrawalsRootMismatch {
            expected: expected_root,
            found: withdrawals_root,
        });
    }

    for withdrawal in expected_withdrawals.iter() {
        crate::common::decrease_balance(
            state,
            withdrawal.validator_index as usize,
            withdrawal.amount,
        )?;
    }

    // Update the next withdrawal index if this block contained withdrawals
    if let Some(latest_withdrawal) = expected_withdrawals.last() {
        state.next_withdrawal_index = latest_withdrawal.index.safe_add(1)?;

        // Update the next validator index to start the next withdrawal sweep
        if expected_withdrawals.len() == E::max_withdrawals_per_payload() {
            // Next sweep starts after the latest withdrawal's validator index
            let next_validator_index = latest_withdrawal
                .validator_index
                .safe_add(1)?
                .safe_rem(state.validators.len() as u64)?;
            state.next_withdrawal_validator_index = next_validator_index;
        }
    }

    // Advance sweep by the max length of the sweep if there was not a full set of withdrawals
    if expected_withdrawals.len() != E::max_withdrawals_per_payload() {
        let next_validator_index = state
            .next_withdrawal_validator_index
            .safe_add(spec.max_validators_per_withdrawals_sweep)?
            .safe_rem(state.validators.len() as u64)?;
        state.next_withdrawal_validator_index = next_validator_index;
    }

    Ok(())
}

/// Verifies the merkle proofs of `deposits` in parallel, without touching the state.
///
/// Used by callers that want to reject a block on a bad proof before cloning a state.
pub fn verify_deposit_merkle_proofs<E: EthSpec>(
    state: &BeaconState<E>,
    deposits: &[Deposit],
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    use errors::IntoWithIndex;

    deposits
        .par_iter()
        .enumerate()
        .try_for_each(|(i, deposit)| {
            verify_deposit_merkle_proof(
                state,
                deposit,
                state.execution_deposit_index.safe_add(i as u64)?,
                spec,
            )
            .map_err(|e| e.into_with_index(i))
        })
}
