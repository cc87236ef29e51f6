use ethereum_hashing::hash;
use int_to_bytes::int_to_bytes32;
use merkle_proof::{MerkleTree, MerkleTreeError};
use safe_arith::SafeArith;
use types::Hash256;

/// Emulates the execution-layer deposit contract merkle tree.
///
/// Proofs are `depth + 1` long: the branch plus the mixed-in deposit count.
#[derive(PartialEq)]
pub struct DepositDataTree {
    tree: MerkleTree,
    mix_in_length: usize,
    depth: usize,
}

impl DepositDataTree {
    /// Create a new Merkle tree from a list of leaves (`DepositData::tree_hash_root`) and a fixed depth.
    pub fn create(leaves: &[Hash256], mix_in_length: usize, depth: usize) -> Self {
        Self {
            tree: MerkleTree::create(leaves, depth),
            mix_in_length,
            depth,
        }
    }

    /// Returns 32 bytes representing the "mix in length" for the merkle root of this tree.
    fn length_bytes(&self) -> Vec<u8> {
        int_to_bytes32(self.mix_in_length as u64)
    }

    /// Retrieve the root hash of this Merkle tree with the length mixed in.
    pub fn root(&self) -> Hash256 {
        let mut preimage = [0; 64];
        preimage[0..32].copy_from_slice(&self.tree.hash()[..]);
        preimage[32..64].copy_from_slice(&self.length_bytes());
        Hash256::from_slice(&hash(&preimage))
    }

    /// Return the leaf at `index` and a Merkle proof of its inclusion.
    ///
    /// The Merkle proof is in "bottom-up" order, starting with a leaf node
    /// and moving up the tree. Its length will be exactly equal to `depth + 1`.
    pub fn generate_proof(&self, index: usize) -> Result<(Hash256, Vec<Hash256>), MerkleTreeError> {
        let (root, mut proof) = self.tree.generate_proof(index, self.depth)?;
        proof.push(Hash256::from_slice(&self.length_bytes()));
        Ok((root, proof))
    }

    /// Add a deposit to the merkle tree.
    pub fn push_leaf(&mut self, leaf: Hash256) -> Result<(), MerkleTreeError> {
        self.tree.push_leaf(leaf, self.depth)?;
        self.mix_in_length.safe_add_assign(1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merkle_proof::verify_merkle_proof;

    const DEPTH: usize = 32;

    #[test]
    fn proofs_verify_against_mixed_root() {
        let leaves: Vec<_> = (1..=5).map(Hash256::from_low_u64_be).collect();
        let mut tree = DepositDataTree::create(&leaves[..3], 3, DEPTH);
        tree.push_leaf(leaves[3]).unwrap();
        tree.push_leaf(leaves[4]).unwrap();

        for (i, leaf) in leaves.iter().enumerate() {
            let (found, proof) = tree.generate_proof(i).unwrap();
            assert_eq!(found, *leaf);
            assert_eq!(proof.len(), DEPTH + 1);
            assert!(verify_merkle_proof(*leaf, &proof, DEPTH + 1, i, tree.root()));
            assert!(!verify_merkle_proof(*leaf, &proof, DEPTH + 1, i + 1, tree.root()));
        }
    }

    #[test]
    fn root_commits_to_count() {
        let leaves = vec![Hash256::repeat_byte(1)];
        let a = DepositDataTree::create(&leaves, 1, DEPTH);
        let b = DepositDataTree::create(&leaves, 2, DEPTH);
        assert_ne!(a.root(), b.root());
    }
}
