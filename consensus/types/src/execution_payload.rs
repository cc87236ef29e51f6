use crate::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

pub type Withdrawals<E> = VariableList<Withdrawal, <E as EthSpec>::MaxWithdrawalsPerPayload>;

/// The execution-layer block carried inside a beacon block.
///
/// Only the fields the beacon state transition checks or records are modelled.
#[derive(Default, Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct ExecutionPayload<E: EthSpec> {
    pub parent_hash: Hash256,
    pub fee_recipient: Address,
    pub state_root: Hash256,
    pub prev_randao: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    pub block_hash: Hash256,
    pub withdrawals: Withdrawals<E>,
}

/// A payload with its withdrawals replaced by their root.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: Hash256,
    pub fee_recipient: Address,
    pub state_root: Hash256,
    pub prev_randao: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub block_number: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub timestamp: u64,
    pub block_hash: Hash256,
    pub withdrawals_root: Hash256,
}

impl<'a, E: EthSpec> From<&'a ExecutionPayload<E>> for ExecutionPayloadHeader {
    fn from(payload: &'a ExecutionPayload<E>) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            block_hash: payload.block_hash,
            withdrawals_root: payload.withdrawals.tree_hash_root(),
        }
    }
}

/// Read access shared by full payloads and blinded (header-only) payloads.
pub trait ExecPayload<E: EthSpec>: std::fmt::Debug + Clone + PartialEq {
    fn parent_hash(&self) -> Hash256;
    fn prev_randao(&self) -> Hash256;
    fn timestamp(&self) -> u64;
    fn block_hash(&self) -> Hash256;
    fn withdrawals_root(&self) -> Hash256;
    fn to_execution_payload_header(&self) -> ExecutionPayloadHeader;
}

impl<E: EthSpec> ExecPayload<E> for ExecutionPayload<E> {
    fn parent_hash(&self) -> Hash256 {
        self.parent_hash
    }

    fn prev_randao(&self) -> Hash256 {
        self.prev_randao
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn block_hash(&self) -> Hash256 {
        self.block_hash
    }

    fn withdrawals_root(&self) -> Hash256 {
        self.withdrawals.tree_hash_root()
    }

    fn to_execution_payload_header(&self) -> ExecutionPayloadHeader {
        ExecutionPayloadHeader::from(self)
    }
}

impl<E: EthSpec> ExecPayload<E> for ExecutionPayloadHeader {
    fn parent_hash(&self) -> Hash256 {
        self.parent_hash
    }

    fn prev_randao(&self) -> Hash256 {
        self.prev_randao
    }

    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn block_hash(&self) -> Hash256 {
        self.block_hash
    }

    fn withdrawals_root(&self) -> Hash256 {
        self.withdrawals_root
    }

    fn to_execution_payload_header(&self) -> ExecutionPayloadHeader {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_commits_to_withdrawals() {
        let mut payload = ExecutionPayload::<MinimalEthSpec> {
            block_hash: Hash256::repeat_byte(9),
            timestamp: 12,
            ..ExecutionPayload::default()
        };
        let empty = payload.to_execution_payload_header();
        assert_eq!(empty.withdrawals_root, payload.withdrawals_root());
        assert_eq!(empty.block_hash, payload.block_hash());

        payload
            .withdrawals
            .push(Withdrawal {
                index: 0,
                validator_index: 3,
                address: Address::repeat_byte(1),
                amount: 5,
            })
            .unwrap();
        let header = payload.to_execution_payload_header();
        assert_ne!(header.withdrawals_root, empty.withdrawals_root);
        assert_eq!(
            <ExecutionPayloadHeader as ExecPayload<MinimalEthSpec>>::to_execution_payload_header(
                &header
            ),
            header
        );
    }
}
