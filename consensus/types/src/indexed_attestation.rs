use crate::{AttestationData, EthSpec, SignatureBytes, VariableList};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Details an attestation that can be slashable.
///
/// To be included in an `AttesterSlashing`. `signatures[i]` is the signature of the validator at
/// `attesting_indices[i]`.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct IndexedAttestation<E: EthSpec> {
    /// Lists validator registry indices, not committee indices.
    #[serde(with = "ssz_types::serde_utils::quoted_u64_var_list")]
    pub attesting_indices: VariableList<u64, E::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signatures: VariableList<SignatureBytes, E::MaxValidatorsPerCommittee>,
}

impl<E: EthSpec> IndexedAttestation<E> {
    /// Check if ``attestation_data_1`` and ``attestation_data_2`` have the same target.
    pub fn is_double_vote(&self, other: &Self) -> bool {
        self.data.target.epoch == other.data.target.epoch && self.data != other.data
    }

    /// Check if ``attestation_data_1`` surrounds ``attestation_data_2``.
    pub fn is_surround_vote(&self, other: &Self) -> bool {
        self.data.source.epoch < other.data.source.epoch
            && other.data.target.epoch < self.data.target.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Checkpoint, Epoch, MainnetEthSpec, Slot};

    fn indexed_vote(source_epoch: u64, target_epoch: u64) -> IndexedAttestation<MainnetEthSpec> {
        let mut data = AttestationData {
            slot: Slot::new(target_epoch * 32),
            ..AttestationData::default()
        };
        data.source = Checkpoint {
            epoch: Epoch::new(source_epoch),
            ..Checkpoint::default()
        };
        data.target = Checkpoint {
            epoch: Epoch::new(target_epoch),
            ..Checkpoint::default()
        };
        IndexedAttestation {
            attesting_indices: VariableList::new(vec![1, 2]).unwrap(),
            data,
            signatures: VariableList::empty(),
        }
    }

    #[test]
    pub fn test_is_double_vote_true() {
        let indexed_vote_first = indexed_vote(3, 1);
        let indexed_vote_second = indexed_vote(2, 1);

        assert!(indexed_vote_first.is_double_vote(&indexed_vote_second))
    }

    #[test]
    pub fn test_is_double_vote_false() {
        let indexed_vote_first = indexed_vote(1, 1);
        let indexed_vote_second = indexed_vote(1, 2);

        assert!(!indexed_vote_first.is_double_vote(&indexed_vote_second));
        // Identical data is not a double vote.
        assert!(!indexed_vote_first.is_double_vote(&indexed_vote_first.clone()));
    }

    #[test]
    pub fn test_is_surround_vote_true() {
        let indexed_vote_first = indexed_vote(1, 4);
        let indexed_vote_second = indexed_vote(2, 3);

        assert!(indexed_vote_first.is_surround_vote(&indexed_vote_second));
    }

    #[test]
    pub fn test_is_surround_vote_false_source_epoch_fails() {
        let indexed_vote_first = indexed_vote(2, 4);
        let indexed_vote_second = indexed_vote(2, 3);

        assert!(!indexed_vote_first.is_surround_vote(&indexed_vote_second));
    }

    #[test]
    pub fn test_is_surround_vote_false_target_epoch_fails() {
        let indexed_vote_first = indexed_vote(1, 1);
        let indexed_vote_second = indexed_vote(2, 2);

        assert!(!indexed_vote_first.is_surround_vote(&indexed_vote_second));
    }
}
