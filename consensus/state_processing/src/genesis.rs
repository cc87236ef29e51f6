use super::per_block_processing::{errors::BlockProcessingError, process_operations::process_deposit};
use crate::common::DepositDataTree;
use ethereum_hashing::hash;
use pq_crypto::{Keypair, SignatureVerifier, TestScheme};
use safe_arith::SafeArith;
use tree_hash::TreeHash;
use types::consts::DEPOSIT_TREE_DEPTH;
use types::*;

/// Initialize a `BeaconState` from the deposits observed at an execution block.
///
/// Each deposit's proof is checked against the deposit root as it stood after that deposit was
/// added, exactly as a block would check it.
pub fn initialize_beacon_state_from_execution<E: EthSpec>(
    execution_block_hash: Hash256,
    execution_timestamp: u64,
    deposits: Vec<Deposit>,
    verifier: &dyn SignatureVerifier,
    spec: &ChainSpec,
) -> Result<BeaconState<E>, BlockProcessingError> {
    let genesis_time = execution_timestamp.safe_add(spec.genesis_delay)?;
    let execution_data = ExecutionData {
        // Temporary deposit root
        deposit_root: Hash256::zero(),
        deposit_count: deposits.len() as u64,
        block_hash: execution_block_hash,
    };
    let mut state = BeaconState::new(genesis_time, execution_data, spec);

    // Seed RANDAO with execution-layer entropy
    state.randao_mixes = FixedVector::from_elem(execution_block_hash);

    let mut deposit_tree = DepositDataTree::create(&[], 0, DEPOSIT_TREE_DEPTH);

    for deposit in deposits.iter() {
        deposit_tree.push_leaf(deposit.data.tree_hash_root())?;
        state.execution_data.deposit_root = deposit_tree.root();
        process_deposit(&mut state, deposit, verifier, spec, true)?;
    }

    process_activations(&mut state, spec)?;

    // Now that we have our validators, initialize the caches (including the committees)
    state.build_caches(spec)?;

    // Set genesis validators root for domain separation and chain versioning
    state.genesis_validators_root = state.validators.tree_hash_root();

    // The genesis sync committee serves both the first and second periods.
    let sync_committee = state.get_next_sync_committee(spec)?;
    state.current_sync_committee = sync_committee.clone();
    state.next_sync_committee = sync_committee;

    Ok(state)
}

/// Determine whether a candidate genesis state is suitable for starting the chain.
pub fn is_valid_genesis_state<E: EthSpec>(state: &BeaconState<E>, spec: &ChainSpec) -> bool {
    state
        .get_active_validator_indices(E::genesis_epoch(), spec)
        .map_or(false, |active_validators| {
            state.genesis_time >= spec.min_genesis_time
                && active_validators.len() as u64 >= spec.min_genesis_active_validator_count
        })
}

/// Activate genesis validators, if their balance is acceptable.
pub fn process_activations<E: EthSpec>(
    state: &mut BeaconState<E>,
    spec: &ChainSpec,
) -> Result<(), BeaconStateError> {
    let (validators, balances) = (&mut state.validators, &state.balances);
    for (index, validator) in validators.iter_mut().enumerate() {
        let balance = balances
            .get(index)
            .copied()
            .ok_or(BeaconStateError::BalancesOutOfBounds(index))?;
        validator.effective_balance = std::cmp::min(
            balance.safe_sub(balance.safe_rem(spec.effective_balance_increment)?)?,
            spec.max_effective_balance,
        );
        if validator.effective_balance == spec.max_effective_balance {
            validator.activation_eligibility_epoch = E::genesis_epoch();
            validator.activation_epoch = E::genesis_epoch();
        }
    }
    Ok(())
}

/// Builds a genesis state in which every keypair holds a full, active validator.
///
/// Deposits are signed with `TestScheme` and carry key-style (`0x00`) withdrawal credentials.
pub fn interop_genesis_state<E: EthSpec>(
    keypairs: &[Keypair],
    genesis_time: u64,
    execution_block_hash: Hash256,
    spec: &ChainSpec,
) -> Result<BeaconState<E>, BlockProcessingError> {
    let deposits = interop_genesis_deposits(keypairs, spec)?;
    let execution_timestamp = genesis_time.safe_sub(spec.genesis_delay).unwrap_or(0);
    let mut state = initialize_beacon_state_from_execution(
        execution_block_hash,
        execution_timestamp,
        deposits,
        &TestScheme,
        spec,
    )?;
    state.genesis_time = genesis_time;
    Ok(state)
}

/// Signed, max-balance deposits for `keypairs`, each with a proof against the deposit root that
/// includes it and every deposit before it.
pub fn interop_genesis_deposits(
    keypairs: &[Keypair],
    spec: &ChainSpec,
) -> Result<Vec<Deposit>, BlockProcessingError> {
    let mut tree = DepositDataTree::create(&[], 0, DEPOSIT_TREE_DEPTH);
    let mut deposits = Vec::with_capacity(keypairs.len());

    for (index, keypair) in keypairs.iter().enumerate() {
        let mut data = DepositData {
            pubkey: keypair.pk.clone(),
            withdrawal_credentials: key_withdrawal_credentials(&keypair.pk, spec),
            amount: spec.max_effective_balance,
            signature: SignatureBytes::empty(),
        };
        data.signature = data.create_signature(&TestScheme, &keypair.sk, spec);

        tree.push_leaf(data.tree_hash_root())?;
        let (_, proof) = tree.generate_proof(index)?;

        deposits.push(Deposit {
            proof: FixedVector::new(proof)?,
            data,
        });
    }

    Ok(deposits)
}

fn key_withdrawal_credentials(pubkey: &PublicKeyBytes, spec: &ChainSpec) -> Hash256 {
    let mut credentials = hash(pubkey.as_serialized());
    credentials[0] = spec.key_withdrawal_prefix_byte;
    Hash256::from_slice(&credentials)
}
