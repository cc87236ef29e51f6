use crate::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The validators assigned to sign block roots for one sync committee period.
///
/// Keys cannot be aggregated, so unlike BLS-based chains there is no aggregate public key.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct SyncCommittee<E: EthSpec> {
    pub pubkeys: FixedVector<PublicKeyBytes, E::SyncCommitteeSize>,
}

impl<E: EthSpec> SyncCommittee<E> {
    /// Create a temporary sync committee that should *never* be included in a legitimate consensus object.
    pub fn temporary() -> Self {
        Self {
            pubkeys: FixedVector::from_elem(PublicKeyBytes::empty()),
        }
    }
}

/// The sync committee participation carried in a block.
///
/// `sync_committee_signatures[i]` belongs to the member at the `i`-th set bit.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct SyncAggregate<E: EthSpec> {
    pub sync_committee_bits: BitVector<E::SyncCommitteeSize>,
    pub sync_committee_signatures: VariableList<SignatureBytes, E::SyncCommitteeSize>,
}

impl<E: EthSpec> SyncAggregate<E> {
    /// New aggregate to be used as the seed for aggregating other signatures.
    pub fn new() -> Self {
        Self {
            sync_committee_bits: BitVector::new(),
            sync_committee_signatures: VariableList::empty(),
        }
    }

    pub fn num_set_bits(&self) -> usize {
        self.sync_committee_bits.num_set_bits()
    }
}

impl<E: EthSpec> Default for SyncAggregate<E> {
    fn default() -> Self {
        Self::new()
    }
}
