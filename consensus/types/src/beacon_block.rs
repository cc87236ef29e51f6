use crate::*;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// A block of the `BeaconChain`.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct BeaconBlock<E: EthSpec> {
    pub slot: Slot,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody<E>,
}

impl<E: EthSpec> SignedRoot for BeaconBlock<E> {}

impl<E: EthSpec> BeaconBlock<E> {
    /// Returns an empty block to be used during genesis.
    pub fn empty(spec: &ChainSpec) -> Self {
        BeaconBlock {
            slot: spec.genesis_slot,
            proposer_index: 0,
            parent_root: Hash256::zero(),
            state_root: Hash256::zero(),
            body: BeaconBlockBody::empty(),
        }
    }

    /// Returns the epoch corresponding to `self.slot`.
    pub fn epoch(&self) -> Epoch {
        self.slot.epoch(E::slots_per_epoch())
    }

    /// Returns the `tree_hash_root` of the block.
    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }

    /// Return the tree hash root of the block's body.
    pub fn body_root(&self) -> Hash256 {
        self.body.tree_hash_root()
    }

    /// Returns a full `BeaconBlockHeader` of this block.
    ///
    /// Note: performs a full tree-hash of `self.body`.
    pub fn block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            proposer_index: self.proposer_index,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body_root(),
        }
    }

    /// Returns a "temporary" header, where the `state_root` is `Hash256::zero()`.
    pub fn temporary_block_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            state_root: Hash256::zero(),
            ..self.block_header()
        }
    }

    /// Signs `self`, producing a `SignedBeaconBlock`.
    pub fn sign<S: Signer>(
        self,
        signer: &S,
        secret_key: &SecretKey,
        fork: &Fork,
        genesis_validators_root: Hash256,
        spec: &ChainSpec,
    ) -> SignedBeaconBlock<E> {
        let domain = spec.get_domain(
            self.epoch(),
            Domain::BeaconProposer,
            fork,
            genesis_validators_root,
        );
        let message = self.signing_root(domain);
        let signature = signer.sign(secret_key, message);
        SignedBeaconBlock {
            message: self,
            signature,
        }
    }
}

/// A `BeaconBlock` and a signature from its proposer.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode, TreeHash, Derivative)]
#[derivative(PartialEq)]
#[serde(bound = "E: EthSpec")]
pub struct SignedBeaconBlock<E: EthSpec> {
    pub message: BeaconBlock<E>,
    pub signature: SignatureBytes,
}

impl<E: EthSpec> SignedBeaconBlock<E> {
    /// Produce a signed beacon block header corresponding to this block.
    pub fn signed_block_header(&self) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self.message.block_header(),
            signature: self.signature.clone(),
        }
    }

    /// Convenience accessor for the block's slot.
    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    /// Convenience accessor for the block's parent root.
    pub fn parent_root(&self) -> Hash256 {
        self.message.parent_root
    }

    /// Convenience accessor for the block's state root.
    pub fn state_root(&self) -> Hash256 {
        self.message.state_root
    }

    /// Returns the `tree_hash_root` of the block.
    pub fn canonical_root(&self) -> Hash256 {
        self.message.tree_hash_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pq_crypto::{generate_deterministic_keypair, SignatureVerifier, TestScheme};

    #[test]
    fn header_matches_block_root() {
        let spec = ChainSpec::minimal();
        let mut block = BeaconBlock::<MinimalEthSpec>::empty(&spec);
        block.slot = Slot::new(5);
        block.body.graffiti = Hash256::repeat_byte(7);

        assert_eq!(block.block_header().canonical_root(), block.canonical_root());
        assert_eq!(block.temporary_block_header().state_root, Hash256::zero());
    }

    #[test]
    fn signed_header_shares_block_signature() {
        let spec = ChainSpec::minimal();
        let keypair = generate_deterministic_keypair(0);
        let fork = Fork::genesis(&spec);
        let gvr = Hash256::repeat_byte(1);

        let block = BeaconBlock::<MinimalEthSpec>::empty(&spec);
        let signed = block.sign(&TestScheme, &keypair.sk, &fork, gvr, &spec);
        let header = signed.signed_block_header();

        let domain = spec.get_domain(Epoch::new(0), Domain::BeaconProposer, &fork, gvr);
        assert_eq!(
            TestScheme.verify(
                &keypair.pk,
                header.message.signing_root(domain),
                &header.signature
            ),
            Ok(true)
        );
    }
}
