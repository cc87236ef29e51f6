use super::*;
use crate::common::{
    altair::{get_base_reward, BaseRewardPerIncrement},
    get_attestation_participation_flag_indices, increase_balance, initiate_validator_exit,
    slash_validator,
};
use crate::per_block_processing::errors::{BlockProcessingError, IntoWithIndex, OperationKind};
use crate::VerifySignatures;
use safe_arith::SafeArith;
use types::consts::participation::{PARTICIPATION_FLAG_WEIGHTS, PROPOSER_WEIGHT, WEIGHT_DENOMINATOR};

pub fn process_operations<E: EthSpec>(
    state: &mut BeaconState<E>,
    block_body: &BeaconBlockBody<E>,
    verify_signatures: VerifySignatures,
    deposit_verifier: &dyn SignatureVerifier,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    verify_operation_counts(block_body)?;

    process_proposer_slashings(
        state,
        &block_body.proposer_slashings,
        verify_signatures,
        ctxt,
        spec,
    )?;
    process_attester_slashings(
        state,
        &block_body.attester_slashings,
        verify_signatures,
        ctxt,
        spec,
    )?;
    process_attestations(
        state,
        &block_body.attestations,
        verify_signatures,
        ctxt,
        spec,
    )?;
    process_deposits(state, &block_body.deposits, deposit_verifier, spec)?;
    process_exits(state, &block_body.voluntary_exits, verify_signatures, spec)?;
    Ok(())
}

/// Rejects a body that carries more of any operation than the preset allows.
fn verify_operation_counts<E: EthSpec>(
    block_body: &BeaconBlockBody<E>,
) -> Result<(), BlockProcessingError> {
    let counts = [
        (
            OperationKind::ProposerSlashing,
            block_body.proposer_slashings.len(),
            E::MaxProposerSlashings::to_usize(),
        ),
        (
            OperationKind::AttesterSlashing,
            block_body.attester_slashings.len(),
            E::MaxAttesterSlashings::to_usize(),
        ),
        (
            OperationKind::Attestation,
            block_body.attestations.len(),
            E::MaxAttestations::to_usize(),
        ),
        (
            OperationKind::Deposit,
            block_body.deposits.len(),
            E::MaxDeposits::to_usize(),
        ),
        (
            OperationKind::VoluntaryExit,
            block_body.voluntary_exits.len(),
            E::MaxVoluntaryExits::to_usize(),
        ),
    ];

    for (kind, found, max) in counts {
        block_verify!(
            found <= max,
            BlockProcessingError::TooManyOperations { kind, max, found }
        );
    }

    Ok(())
}

/// Validates each `ProposerSlashing` and updates the state, short-circuiting on an invalid object.
///
/// Returns `Ok(())` if the validation and state updates completed successfully, otherwise returns
/// an `Err` describing the invalid object or cause of failure.
pub fn process_proposer_slashings<E: EthSpec>(
    state: &mut BeaconState<E>,
    proposer_slashings: &[ProposerSlashing],
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Verify and apply proposer slashings in series.
    // We have to verify in series because an invalid block may contain multiple slashings
    // for the same validator, and we need to correctly detect and reject that.
    proposer_slashings
        .iter()
        .enumerate()
        .try_for_each(|(i, proposer_slashing)| {
            verify_proposer_slashing(proposer_slashing, state, verify_signatures, spec)
                .map_err(|e| e.into_with_index(i))?;

            slash_validator(
                state,
                proposer_slashing.signed_header_1.message.proposer_index as usize,
                None,
                ctxt,
                spec,
            )?;

            Ok(())
        })
}

/// Validates each `AttesterSlashing` and updates the state, short-circuiting on an invalid object.
///
/// Returns `Ok(())` if the validation and state updates completed successfully, otherwise returns
/// an `Err` describing the invalid object or cause of failure.
pub fn process_attester_slashings<E: EthSpec>(
    state: &mut BeaconState<E>,
    attester_slashings: &[AttesterSlashing<E>],
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    for (i, attester_slashing) in attester_slashings.iter().enumerate() {
        let slashable_indices =
            verify_attester_slashing(state, attester_slashing, verify_signatures, spec)
                .map_err(|e| e.into_with_index(i))?;

        for i in slashable_indices {
            slash_validator(state, i as usize, None, ctxt, spec)?;
        }
    }

    Ok(())
}

/// Validates each `Attestation` and updates the participation flags, short-circuiting on an
/// invalid object.
pub fn process_attestations<E: EthSpec>(
    state: &mut BeaconState<E>,
    attestations: &[Attestation<E>],
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    state.build_committee_cache(RelativeEpoch::Previous, spec)?;
    state.build_committee_cache(RelativeEpoch::Current, spec)?;

    let proposer_index = ctxt.get_proposer_index(state, spec)?;
    let base_reward_per_increment =
        BaseRewardPerIncrement::new(state.get_total_active_balance()?, spec)?;

    for (i, attestation) in attestations.iter().enumerate() {
        process_attestation(
            state,
            attestation,
            i,
            proposer_index,
            base_reward_per_increment,
            verify_signatures,
            ctxt,
            spec,
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn process_attestation<E: EthSpec>(
    state: &mut BeaconState<E>,
    attestation: &Attestation<E>,
    att_index: usize,
    proposer_index: u64,
    base_reward_per_increment: BaseRewardPerIncrement,
    verify_signatures: VerifySignatures,
    ctxt: &mut ConsensusContext<E>,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let attesting_indices = &verify_attestation_for_block_inclusion(
        state,
        attestation,
        ctxt,
        verify_signatures,
        spec,
    )
    .map_err(|e| e.into_with_index(att_index))?
    .attesting_indices;

    // Matching roots, participation flag indices
    let data = &attestation.data;
    let inclusion_delay = state.slot.safe_sub(data.slot)?.as_u64();
    let participation_flag_indices =
        get_attestation_participation_flag_indices(state, data, inclusion_delay, spec)?;

    // Update epoch participation flags.
    let mut proposer_reward_numerator = 0;
    for index in attesting_indices.iter() {
        let index = *index as usize;
        let effective_balance = state.get_effective_balance(index)?;
        let base_reward = get_base_reward(effective_balance, base_reward_per_increment, spec)?;

        let epoch_participation = state.get_epoch_participation_mut(data.target.epoch)?;
        let validator_participation = epoch_participation
            .get_mut(index)
            .ok_or(BeaconStateError::ParticipationOutOfBounds(index))?;

        for (flag_index, &weight) in PARTICIPATION_FLAG_WEIGHTS.iter().enumerate() {
            if participation_flag_indices.contains(&flag_index)
                && !validator_participation.has_flag(flag_index)?
            {
                validator_participation.add_flag(flag_index)?;
                proposer_reward_numerator.safe_add_assign(base_reward.safe_mul(weight)?)?;
            }
        }
    }

    let proposer_reward_denominator = WEIGHT_DENOMINATOR
        .safe_sub(PROPOSER_WEIGHT)?
        .safe_mul(WEIGHT_DENOMINATOR)?
        .safe_div(PROPOSER_WEIGHT)?;
    let proposer_reward = proposer_reward_numerator.safe_div(proposer_reward_denominator)?;
    increase_balance(state, proposer_index as usize, proposer_reward)?;
    Ok(())
}

/// Validates each `Deposit` and updates the state, short-circuiting on an invalid object.
///
/// Returns `Ok(())` if the validation and state updates completed successfully, otherwise returns
/// an `Err` describing the invalid object or cause of failure.
pub fn process_deposits<E: EthSpec>(
    state: &mut BeaconState<E>,
    deposits: &[Deposit],
    verifier: &dyn SignatureVerifier,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let expected_deposit_len = std::cmp::min(
        E::max_deposits(),
        state
            .execution_data
            .deposit_count
            .saturating_sub(state.execution_deposit_index),
    );
    block_verify!(
        deposits.len() as u64 == expected_deposit_len,
        BlockProcessingError::DepositCountInvalid {
            expected: expected_deposit_len as usize,
            found: deposits.len(),
        }
    );

    // Verify merkle proofs in parallel.
    verify_deposit_merkle_proofs(state, deposits, spec)?;

    // Update the state in series.
    for deposit in deposits {
        process_deposit(state, deposit, verifier, spec, false)?;
    }

    Ok(())
}

/// Process a single deposit, optionally verifying its merkle proof.
pub fn process_deposit<E: EthSpec>(
    state: &mut BeaconState<E>,
    deposit: &Deposit,
    verifier: &dyn SignatureVerifier,
    spec: &ChainSpec,
    verify_merkle_proof: bool,
) -> Result<(), BlockProcessingError> {
    let deposit_index = state.execution_deposit_index as usize;
    if verify_merkle_proof {
        verify_deposit_merkle_proof(state, deposit, state.execution_deposit_index, spec)
            .map_err(|e| e.into_with_index(deposit_index))?;
    }

    state.execution_deposit_index.safe_add_assign(1)?;

    // Get an `Option<u64>` where `u64` is the validator index if this deposit public key
    // already exists in the beacon_state.
    let validator_index = get_existing_validator_index(state, &deposit.data.pubkey)
        .map_err(|e| e.into_with_index(deposit_index))?;

    let amount = deposit.data.amount;

    if let Some(index) = validator_index {
        // Update the existing validator balance.
        increase_balance(state, index as usize, amount)?;
    } else {
        // The signature should be checked for new validators. Return early for a bad
        // signature.
        if verify_deposit_signature(&deposit.data, verifier, spec).is_err() {
            return Ok(());
        }

        // Create a new validator.
        let validator = Validator {
            pubkey: deposit.data.pubkey.clone(),
            withdrawal_credentials: deposit.data.withdrawal_credentials,
            activation_eligibility_epoch: spec.far_future_epoch,
            activation_epoch: spec.far_future_epoch,
            exit_epoch: spec.far_future_epoch,
            withdrawable_epoch: spec.far_future_epoch,
            effective_balance: std::cmp::min(
                amount.safe_sub(amount.safe_rem(spec.effective_balance_increment)?)?,
                spec.max_effective_balance,
            ),
            slashed: false,
        };
        state.push_validator(validator, amount)?;
    }

    Ok(())
}

/// Validates each `Exit` and updates the state, short-circuiting on an invalid object.
///
/// Returns `Ok(())` if the validation and state updates completed successfully, otherwise returns
/// an `Err` describing the invalid object or cause of failure.
pub fn process_exits<E: EthSpec>(
    state: &mut BeaconState<E>,
    voluntary_exits: &[SignedVoluntaryExit],
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    // Verify and apply each exit in series. We iterate in series because higher-index exits may
    // become invalid due to the application of lower-index ones.
    for (i, exit) in voluntary_exits.iter().enumerate() {
        verify_exit(state, None, exit, verify_signatures, spec)
            .map_err(|e| e.into_with_index(i))?;

        initiate_validator_exit(state, exit.message.validator_index as usize, spec)?;
    }
    Ok(())
}
