use super::errors::{BlockOperationError, IndexedAttestationInvalid as Invalid};
use super::signature_sets::{get_pubkey_from_state, indexed_attestation_signature_set};
use crate::VerifySignatures;
use types::*;

type Result<T> = std::result::Result<T, BlockOperationError<Invalid>>;

fn error(reason: Invalid) -> BlockOperationError<Invalid> {
    BlockOperationError::invalid(reason)
}

/// Verify an `IndexedAttestation`.
///
/// Every attester carries its own signature, so the check is that each listed index signed the
/// attestation data with the key registered for it.
pub fn is_valid_indexed_attestation<E: EthSpec>(
    state: &BeaconState<E>,
    indexed_attestation: &IndexedAttestation<E>,
    verify_signatures: VerifySignatures,
    spec: &ChainSpec,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    // Verify that indices aren't empty
    verify!(!indices.is_empty(), Invalid::IndicesEmpty);

    // Check that indices are sorted and unique
    let check_sorted = |list: &[u64]| -> Result<()> {
        list.windows(2).enumerate().try_for_each(|(i, pair)| {
            if pair[0] < pair[1] {
                Ok(())
            } else {
                Err(error(Invalid::BadValidatorIndicesOrdering(i)))
            }
        })?;
        Ok(())
    };
    check_sorted(indices)?;

    verify!(
        indices.len() == indexed_attestation.signatures.len(),
        Invalid::SignatureCountMismatch {
            indices: indices.len(),
            signatures: indexed_attestation.signatures.len(),
        }
    );

    for index in indices.iter() {
        verify!(
            state.validators.get(*index as usize).is_some(),
            Invalid::UnknownValidator(*index)
        );
    }

    if let VerifySignatures::True(verifier) = verify_signatures {
        verify!(
            indexed_attestation_signature_set(
                state,
                |i| get_pubkey_from_state(state, i),
                indexed_attestation,
                spec
            )?
            .verify(verifier),
            Invalid::BadSignature
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_crypto::{generate_deterministic_keypairs, Signer, TestScheme};

    type E = MinimalEthSpec;

    fn state_with_validators(n: usize, spec: &ChainSpec) -> BeaconState<E> {
        let mut state = BeaconState::new(0, ExecutionData::default(), spec);
        for keypair in generate_deterministic_keypairs(n) {
            let validator = Validator {
                pubkey: keypair.pk,
                effective_balance: spec.max_effective_balance,
                activation_epoch: Epoch::new(0),
                ..Validator::default()
            };
            state
                .push_validator(validator, spec.max_effective_balance)
                .unwrap();
        }
        state
    }

    fn signed(
        state: &BeaconState<E>,
        indices: &[u64],
        spec: &ChainSpec,
    ) -> IndexedAttestation<E> {
        let data = AttestationData::default();
        let domain = spec.get_domain(
            data.target.epoch,
            Domain::BeaconAttester,
            &state.fork,
            state.genesis_validators_root,
        );
        let message = data.signing_root(domain);
        let keypairs = generate_deterministic_keypairs(state.validators.len());
        let signatures = indices
            .iter()
            .map(|i| TestScheme.sign(&keypairs[*i as usize].sk, message))
            .collect::<Vec<_>>();
        IndexedAttestation {
            attesting_indices: VariableList::new(indices.to_vec()).unwrap(),
            data,
            signatures: VariableList::new(signatures).unwrap(),
        }
    }

    #[test]
    fn accepts_sorted_signed_indices() {
        let spec = E::default_spec();
        let state = state_with_validators(4, &spec);
        let indexed = signed(&state, &[0, 2, 3], &spec);
        assert_eq!(
            is_valid_indexed_attestation(
                &state,
                &indexed,
                VerifySignatures::True(&TestScheme),
                &spec
            ),
            Ok(())
        );
    }

    #[test]
    fn rejects_empty_and_unsorted() {
        let spec = E::default_spec();
        let state = state_with_validators(4, &spec);

        let empty = signed(&state, &[], &spec);
        assert_eq!(
            is_valid_indexed_attestation(&state, &empty, VerifySignatures::False, &spec),
            Err(error(Invalid::IndicesEmpty))
        );

        let duplicate = signed(&state, &[1, 1], &spec);
        assert_eq!(
            is_valid_indexed_attestation(&state, &duplicate, VerifySignatures::False, &spec),
            Err(error(Invalid::BadValidatorIndicesOrdering(0)))
        );
    }

    #[test]
    fn rejects_a_swapped_signature() {
        let spec = E::default_spec();
        let state = state_with_validators(4, &spec);
        let mut indexed = signed(&state, &[0, 1], &spec);
        indexed.signatures.swap(0, 1);
        assert_eq!(
            is_valid_indexed_attestation(
                &state,
                &indexed,
                VerifySignatures::True(&TestScheme),
                &spec
            ),
            Err(error(Invalid::BadSignature))
        );
    }
}
