use crate::*;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SigningData {
    pub object_root: Hash256,
    pub domain: Hash256,
}

/// Types whose tree-hash root is signed directly.
pub trait SignedRoot: TreeHash {
    /// The 32-byte message handed to the signature collaborator.
    fn signing_root(&self, domain: Hash256) -> Hash256 {
        SigningData {
            object_root: self.tree_hash_root(),
            domain,
        }
        .tree_hash_root()
    }
}

impl SignedRoot for Epoch {}
impl SignedRoot for Slot {}
impl SignedRoot for Hash256 {}
