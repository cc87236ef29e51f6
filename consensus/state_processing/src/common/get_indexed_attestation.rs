use crate::per_block_processing::errors::{AttestationInvalid as Invalid, BlockOperationError};
use types::*;

type IndexedAttestationResult<T> = std::result::Result<T, BlockOperationError<Invalid>>;

/// Convert `attestation` to indexed-verifiable form.
///
/// Attestations carry one signature per set bit in committee order. The indexed form sorts by
/// validator index, so each signature travels with its signer.
pub fn get_indexed_attestation<E: EthSpec>(
    committee: &[usize],
    attestation: &Attestation<E>,
) -> IndexedAttestationResult<IndexedAttestation<E>> {
    if attestation.aggregation_bits.len() != committee.len() {
        return Err(BlockOperationError::invalid(
            Invalid::BadAggregationBitfieldLength {
                committee_len: committee.len(),
                bitfield_len: attestation.aggregation_bits.len(),
            },
        ));
    }

    let bits = attestation.aggregation_bits.num_set_bits();
    if bits != attestation.signatures.len() {
        return Err(BlockOperationError::invalid(Invalid::SignatureCountMismatch {
            bits,
            signatures: attestation.signatures.len(),
        }));
    }

    let mut signatures = attestation.signatures.iter();
    let mut signed = Vec::with_capacity(bits);
    for (i, validator_index) in committee.iter().enumerate() {
        if attestation.aggregation_bits.get(i)? {
            let signature = signatures.next().ok_or_else(|| {
                BlockOperationError::invalid(Invalid::SignatureCountMismatch {
                    bits,
                    signatures: attestation.signatures.len(),
                })
            })?;
            signed.push((*validator_index as u64, signature.clone()));
        }
    }
    signed.sort_unstable_by_key(|(index, _)| *index);

    let (attesting_indices, signatures): (Vec<_>, Vec<_>) = signed.into_iter().unzip();

    Ok(IndexedAttestation {
        attesting_indices: VariableList::new(attesting_indices)?,
        data: attestation.data.clone(),
        signatures: VariableList::new(signatures)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    type E = MinimalEthSpec;

    fn signature(byte: u8) -> SignatureBytes {
        SignatureBytes::deserialize(&vec![byte; pq_crypto::SIGNATURE_BYTES_LEN]).unwrap()
    }

    #[test]
    fn signatures_follow_their_signers() {
        let committee = vec![30, 10, 20];
        let mut attestation =
            Attestation::<E>::empty_for_signing(committee.len(), AttestationData::default())
                .unwrap();
        attestation.aggregation_bits.set(0, true).unwrap();
        attestation.aggregation_bits.set(1, true).unwrap();
        attestation.aggregation_bits.set(2, true).unwrap();
        attestation.signatures = VariableList::new(vec![signature(30), signature(10), signature(20)])
            .unwrap();

        let indexed = get_indexed_attestation(&committee, &attestation).unwrap();
        assert_eq!(indexed.attesting_indices.to_vec(), vec![10, 20, 30]);
        assert_eq!(
            indexed.signatures.to_vec(),
            vec![signature(10), signature(20), signature(30)]
        );
    }

    #[test]
    fn signature_count_must_match_bits() {
        let committee = vec![1, 2];
        let mut attestation =
            Attestation::<E>::empty_for_signing(committee.len(), AttestationData::default())
                .unwrap();
        attestation.aggregation_bits.set(1, true).unwrap();

        assert_eq!(
            get_indexed_attestation(&committee, &attestation),
            Err(BlockOperationError::invalid(Invalid::SignatureCountMismatch {
                bits: 1,
                signatures: 0
            }))
        );
    }
}
