use super::Hash256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The execution chain's deposit contract view, as voted on by block proposers.
#[derive(
    Debug, PartialEq, Eq, Clone, Default, Hash, Serialize, Deserialize, Encode, Decode, TreeHash,
)]
pub struct ExecutionData {
    pub deposit_root: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub deposit_count: u64,
    pub block_hash: Hash256,
}
