use crate::{AttestationData, BitList, EthSpec, SignatureBytes, VariableList};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

#[derive(Debug, PartialEq)]
pub enum Error {
    SszTypesError(ssz_types::Error),
    /// The two attestations sign different data.
    DataMismatch,
    /// At least one validator has signed both attestations.
    OverlappingBits,
    /// The number of signatures does not match the number of set aggregation bits.
    SignatureCountMismatch { bits: usize, signatures: usize },
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Self {
        Error::SszTypesError(e)
    }
}

/// Details an attestation that can be slashable.
///
/// Signatures cannot be aggregated, so `signatures[i]` belongs to the committee member at the
/// `i`-th set bit of `aggregation_bits`.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct Attestation<E: EthSpec> {
    pub aggregation_bits: BitList<E::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signatures: VariableList<SignatureBytes, E::MaxValidatorsPerCommittee>,
}

impl<E: EthSpec> Attestation<E> {
    /// An attestation with no participants for a committee of `committee_len` members.
    pub fn empty_for_signing(committee_len: usize, data: AttestationData) -> Result<Self, Error> {
        Ok(Self {
            aggregation_bits: BitList::with_capacity(committee_len)?,
            data,
            signatures: VariableList::empty(),
        })
    }

    /// Are the aggregation bitfields of these attestations disjoint?
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bits
            .intersection(&other.aggregation_bits)
            .is_zero()
    }

    /// Checks that `signatures` lines up with the set bits.
    pub fn verify_signature_count(&self) -> Result<(), Error> {
        let bits = self.aggregation_bits.num_set_bits();
        let signatures = self.signatures.len();
        if bits == signatures {
            Ok(())
        } else {
            Err(Error::SignatureCountMismatch { bits, signatures })
        }
    }

    /// Add the signatures and bits from `other` to `self`.
    ///
    /// The attestations must share `data` and have disjoint signers. Signatures are interleaved
    /// so that they remain in committee order.
    pub fn aggregate(&mut self, other: &Self) -> Result<(), Error> {
        if self.data != other.data {
            return Err(Error::DataMismatch);
        }
        if !self.signers_disjoint_from(other) {
            return Err(Error::OverlappingBits);
        }
        self.verify_signature_count()?;
        other.verify_signature_count()?;

        let union = self.aggregation_bits.union(&other.aggregation_bits);

        let mut ours = self.signatures.iter();
        let mut theirs = other.signatures.iter();
        let mut signatures = Vec::with_capacity(union.num_set_bits());
        for i in 0..union.len() {
            if self.aggregation_bits.get(i)? {
                signatures.extend(ours.next().cloned());
            } else if other.aggregation_bits.get(i)? {
                signatures.extend(theirs.next().cloned());
            }
        }

        self.aggregation_bits = union;
        self.signatures = VariableList::new(signatures)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Checkpoint, Epoch, Hash256, MinimalEthSpec, Slot};

    type E = MinimalEthSpec;

    fn signature(byte: u8) -> SignatureBytes {
        SignatureBytes::deserialize(&vec![byte; pq_crypto::SIGNATURE_BYTES_LEN]).unwrap()
    }

    fn attestation(committee_len: usize, set: &[usize]) -> Attestation<E> {
        let data = AttestationData {
            slot: Slot::new(3),
            index: 0,
            beacon_block_root: Hash256::repeat_byte(1),
            source: Checkpoint::default(),
            target: Checkpoint {
                epoch: Epoch::new(0),
                root: Hash256::repeat_byte(2),
            },
        };
        let mut attestation = Attestation::empty_for_signing(committee_len, data).unwrap();
        let mut signatures = vec![];
        for i in set {
            attestation.aggregation_bits.set(*i, true).unwrap();
            signatures.push(signature(*i as u8 + 1));
        }
        attestation.signatures = VariableList::new(signatures).unwrap();
        attestation
    }

    #[test]
    fn aggregate_interleaves_signatures() {
        let mut a = attestation(6, &[0, 3]);
        let b = attestation(6, &[1, 5]);

        assert!(a.signers_disjoint_from(&b));
        a.aggregate(&b).unwrap();

        assert_eq!(a.aggregation_bits.num_set_bits(), 4);
        let expected: Vec<_> = [0u8, 1, 3, 5].iter().map(|i| signature(i + 1)).collect();
        assert_eq!(a.signatures.to_vec(), expected);
    }

    #[test]
    fn aggregate_rejects_overlap() {
        let mut a = attestation(4, &[0, 1]);
        let b = attestation(4, &[1]);
        assert_eq!(a.aggregate(&b), Err(Error::OverlappingBits));
    }

    #[test]
    fn aggregate_rejects_different_data() {
        let mut a = attestation(4, &[0]);
        let mut b = attestation(4, &[1]);
        b.data.index = 1;
        assert_eq!(a.aggregate(&b), Err(Error::DataMismatch));
    }

    #[test]
    fn signature_count() {
        let mut a = attestation(4, &[0, 2]);
        assert_eq!(a.verify_signature_count(), Ok(()));
        a.signatures = VariableList::new(vec![signature(1)]).unwrap();
        assert_eq!(
            a.verify_signature_count(),
            Err(Error::SignatureCountMismatch {
                bits: 2,
                signatures: 1
            })
        );
    }
}
