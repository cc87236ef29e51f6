use super::errors::{BlockOperationError, DepositInvalid};
use crate::per_block_processing::signature_sets::deposit_pubkey_signature_message;
use merkle_proof::verify_merkle_proof;
use safe_arith::SafeArith;
use tree_hash::TreeHash;
use types::*;

type Result<T> = std::result::Result<T, BlockOperationError<DepositInvalid>>;

fn error(reason: DepositInvalid) -> BlockOperationError<DepositInvalid> {
    BlockOperationError::invalid(reason)
}

/// Verify `Deposit.pubkey` signed `Deposit.signature`.
///
/// A deposit with a bad signature is not a block error. The caller skips it instead.
pub fn verify_deposit_signature(
    deposit_data: &DepositData,
    verifier: &dyn SignatureVerifier,
    spec: &ChainSpec,
) -> Result<()> {
    let (pubkey, signature, message) = deposit_pubkey_signature_message(deposit_data, spec)
        .ok_or_else(|| error(DepositInvalid::BadKeyBytes))?;

    verify!(
        matches!(verifier.verify(pubkey, message, signature), Ok(true)),
        DepositInvalid::BadSignature
    );

    Ok(())
}

/// Returns a `Some(validator index)` if a pubkey already exists in the `validators`,
/// otherwise returns `None`.
///
/// Builds the pubkey cache if it is not already built.
pub fn get_existing_validator_index<E: EthSpec>(
    state: &mut BeaconState<E>,
    pub_key: &PublicKeyBytes,
) -> Result<Option<u64>> {
    state.update_pubkey_cache()?;
    Ok(state.get_validator_index(pub_key)?.map(|i| i as u64))
}

/// Verify that a deposit is included in the state's execution deposit root.
///
/// The deposit index is provided as a parameter so we can check proofs
/// before they're due to be processed, and in parallel.
pub fn verify_deposit_merkle_proof<E: EthSpec>(
    state: &BeaconState<E>,
    deposit: &Deposit,
    deposit_index: u64,
    spec: &ChainSpec,
) -> Result<()> {
    let leaf = deposit.data.tree_hash_root();

    verify!(
        verify_merkle_proof(
            leaf,
            &deposit.proof[..],
            spec.deposit_contract_tree_depth.safe_add(1)? as usize,
            deposit_index as usize,
            state.execution_data.deposit_root,
        ),
        DepositInvalid::BadMerkleProof
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DepositDataTree;
    use pq_crypto::{generate_deterministic_keypair, TestScheme};

    type E = MinimalEthSpec;

    fn deposit_data(i: usize, spec: &ChainSpec) -> DepositData {
        let keypair = generate_deterministic_keypair(i);
        let mut data = DepositData {
            pubkey: keypair.pk.clone(),
            withdrawal_credentials: Hash256::repeat_byte(i as u8),
            amount: spec.max_effective_balance,
            signature: SignatureBytes::empty(),
        };
        data.signature = data.create_signature(&TestScheme, &keypair.sk, spec);
        data
    }

    #[test]
    fn deposit_proofs_verify_against_execution_data() {
        let spec = E::default_spec();
        let datas = (0..5).map(|i| deposit_data(i, &spec)).collect::<Vec<_>>();
        let leaves = datas.iter().map(|d| d.tree_hash_root()).collect::<Vec<_>>();
        let depth = spec.deposit_contract_tree_depth as usize;
        let tree = DepositDataTree::create(&leaves, leaves.len(), depth);

        let mut state = BeaconState::<E>::new(0, ExecutionData::default(), &spec);
        state.execution_data.deposit_root = tree.root();
        state.execution_data.deposit_count = leaves.len() as u64;

        for (i, data) in datas.into_iter().enumerate() {
            let (_, proof) = tree.generate_proof(i).unwrap();
            let deposit = Deposit {
                proof: FixedVector::new(proof).unwrap(),
                data,
            };
            assert_eq!(
                verify_deposit_merkle_proof(&state, &deposit, i as u64, &spec),
                Ok(())
            );
            assert_eq!(
                verify_deposit_merkle_proof(&state, &deposit, i as u64 + 1, &spec),
                Err(error(DepositInvalid::BadMerkleProof))
            );
        }
    }

    #[test]
    fn deposit_signatures() {
        let spec = E::default_spec();
        let mut data = deposit_data(0, &spec);
        assert_eq!(verify_deposit_signature(&data, &TestScheme, &spec), Ok(()));

        data.amount -= 1;
        assert_eq!(
            verify_deposit_signature(&data, &TestScheme, &spec),
            Err(error(DepositInvalid::BadSignature))
        );

        data.signature = SignatureBytes::empty();
        assert_eq!(
            verify_deposit_signature(&data, &TestScheme, &spec),
            Err(error(DepositInvalid::BadKeyBytes))
        );
    }
}
