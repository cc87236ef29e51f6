use crate::{BeaconState, EthSpec, Hash256};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// Roots of one `SLOTS_PER_HISTORICAL_ROOT` window of block and state roots.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct HistoricalSummary {
    pub block_summary_root: Hash256,
    pub state_summary_root: Hash256,
}

impl HistoricalSummary {
    pub fn new<E: EthSpec>(state: &BeaconState<E>) -> Self {
        Self {
            block_summary_root: state.block_roots.tree_hash_root(),
            state_summary_root: state.state_roots.tree_hash_root(),
        }
    }
}
