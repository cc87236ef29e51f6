use crate::common::{altair::BaseRewardPerIncrement, decrease_balance, increase_balance};
use crate::per_block_processing::errors::{
    BlockOperationError, BlockProcessingError, SyncAggregateInvalid,
};
use crate::per_block_processing::signature_sets::sync_aggregate_signature_set;
use crate::VerifySignatures;
use safe_arith::SafeArith;
use types::consts::participation::{PROPOSER_WEIGHT, SYNC_REWARD_WEIGHT, WEIGHT_DENOMINATOR};
use types::{BeaconState, ChainSpec, EthSpec, SyncAggregate, Unsigned};

pub fn process_sync_aggregate<E: EthSpec>(
    state: &mut BeaconState<E>,
    aggregate: &SyncAggregate<E>,
    proposer_index: u64,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<(), BlockProcessingError> {
    let participants = aggregate.num_set_bits();
    let signatures = aggregate.sync_committee_signatures.len();
    if participants != signatures {
        return Err(BlockOperationError::invalid(SyncAggregateInvalid::SignatureCountMismatch {
            participants,
            signatures,
        })
        .into());
    }

    if let VerifySignatures::True(verifier) = verify_signatures {
        let previous_slot = state.slot.saturating_sub(1u64);
        let block_root = *state.get_block_root(previous_slot)?;

        if let Some(signature_set) =
            sync_aggregate_signature_set(aggregate, state.slot, block_root, state, spec)?
        {
            if !signature_set.verify(verifier) {
                return Err(BlockOperationError::invalid(SyncAggregateInvalid::SignatureInvalid)
                    .into());
            }
        }
    }

    // Compute participant and proposer rewards
    let (participant_reward, proposer_reward) = compute_sync_aggregate_rewards(state, spec)?;

    // Apply participant and proposer rewards
    let committee = state.current_sync_committee.clone();
    let committee_indices = state.get_sync_committee_indices(&committee)?;

    for (participant_index, participation_bit) in committee_indices
        .into_iter()
        .zip(aggregate.sync_committee_bits.iter())
    {
        if participation_bit {
            increase_balance(state, participant_index, participant_reward)?;
            increase_balance(state, proposer_index as usize, proposer_reward)?;
        } else {
            decrease_balance(state, participant_index, participant_reward)?;
        }
    }

    Ok(())
}

/// Compute the `(participant_reward, proposer_reward)` for a sync aggregate.
///
/// The `state` should be the pre-state from the same slot as the block containing the aggregate.
pub fn compute_sync_aggregate_rewards<E: EthSpec>(
    state: &BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(u64, u64), BlockProcessingError> {
    let total_active_balance = state.get_total_active_balance()?;
    let total_active_increments =
        total_active_balance.safe_div(spec.effective_balance_increment)?;
    let total_base_rewards = BaseRewardPerIncrement::new(total_active_balance, spec)?
        .as_u64()
        .safe_mul(total_active_increments)?;
    let max_participant_rewards = total_base_rewards
        .safe_mul(SYNC_REWARD_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR)?
        .safe_div(E::slots_per_epoch())?;
    let participant_reward = max_participant_rewards.safe_div(E::SyncCommitteeSize::to_u64())?;
    let proposer_reward = participant_reward
        .safe_mul(PROPOSER_WEIGHT)?
        .safe_div(WEIGHT_DENOMINATOR.safe_sub(PROPOSER_WEIGHT)?)?;
    Ok((participant_reward, proposer_reward))
}
