//! Right-sparse Merkle trees of fixed depth, as used by the deposit contract.
use ethereum_hashing::{hash32_concat, ZERO_HASHES};
use ethereum_types::H256;
use lazy_static::lazy_static;
use safe_arith::ArithError;

const MAX_TREE_DEPTH: usize = 32;
const EMPTY_SLICE: &[H256] = &[];

lazy_static! {
    /// Zero nodes to act as "synthetic" left and right subtrees of other zero nodes.
    static ref ZERO_NODES: Vec<MerkleTree> = {
        (0..=MAX_TREE_DEPTH).map(MerkleTree::Zero).collect()
    };
}

/// A Merkle tree in which only the first `N` leaves are populated.
#[derive(Debug, PartialEq, Clone)]
pub enum MerkleTree {
    /// Leaf node with the hash of its content.
    Leaf(H256),
    /// Internal node with hash, left subtree and right subtree.
    Node(H256, Box<Self>, Box<Self>),
    /// A subtree of `2^depth` zero leaves.
    Zero(usize),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum MerkleTreeError {
    /// Trying to push in a leaf
    LeafReached,
    /// No more space in the MerkleTree
    MerkleTreeFull,
    /// MerkleTree is invalid
    Invalid,
    /// Incorrect Depth provided
    DepthTooSmall,
    /// Requested a proof for an index with no leaf
    NoLeaf,
    ArithError,
}

impl From<ArithError> for MerkleTreeError {
    fn from(_: ArithError) -> Self {
        MerkleTreeError::ArithError
    }
}

impl MerkleTree {
    /// Create a new Merkle tree from a list of leaves and a fixed depth.
    pub fn create(leaves: &[H256], depth: usize) -> Self {
        use MerkleTree::*;

        if leaves.is_empty() {
            return Zero(depth);
        }

        match depth {
            0 => {
                debug_assert_eq!(leaves.len(), 1);
                Leaf(leaves[0])
            }
            _ => {
                let subtree_capacity = 2usize.pow(depth as u32 - 1);
                let (left_leaves, right_leaves) = if leaves.len() <= subtree_capacity {
                    (leaves, EMPTY_SLICE)
                } else {
                    leaves.split_at(subtree_capacity)
                };

                let left_subtree = MerkleTree::create(left_leaves, depth - 1);
                let right_subtree = MerkleTree::create(right_leaves, depth - 1);
                let hash = H256::from_slice(&hash32_concat(
                    left_subtree.hash().as_bytes(),
                    right_subtree.hash().as_bytes(),
                ));

                Node(hash, Box::new(left_subtree), Box::new(right_subtree))
            }
        }
    }

    /// Append `elem` as the next populated leaf of a tree of `depth`.
    pub fn push_leaf(&mut self, elem: H256, depth: usize) -> Result<(), MerkleTreeError> {
        use MerkleTree::*;

        if depth == 0 {
            return Err(MerkleTreeError::DepthTooSmall);
        }

        match self {
            Leaf(_) => return Err(MerkleTreeError::LeafReached),
            Zero(_) => *self = MerkleTree::create(&[elem], depth),
            Node(ref mut hash, ref mut left, ref mut right) => {
                let left: &mut MerkleTree = left;
                let right: &mut MerkleTree = right;
                match (&*left, &*right) {
                    (Leaf(_), Leaf(_)) => return Err(MerkleTreeError::MerkleTreeFull),
                    (Node(..), Node(..)) | (Leaf(_), Node(..)) => {
                        right.push_leaf(elem, depth - 1)?
                    }
                    (Zero(_), Zero(_)) => *left = MerkleTree::create(&[elem], depth - 1),
                    (Leaf(_), Zero(_)) => *right = MerkleTree::create(&[elem], depth - 1),
                    (Node(..), Zero(_)) => match left.push_leaf(elem, depth - 1) {
                        Ok(()) => (),
                        Err(MerkleTreeError::MerkleTreeFull) => {
                            *right = MerkleTree::create(&[elem], depth - 1)
                        }
                        Err(e) => return Err(e),
                    },
                    (_, _) => return Err(MerkleTreeError::Invalid),
                }
                *hash = H256::from_slice(&hash32_concat(
                    left.hash().as_bytes(),
                    right.hash().as_bytes(),
                ));
            }
        }

        Ok(())
    }

    /// Retrieve the root hash of this Merkle tree.
    pub fn hash(&self) -> H256 {
        match *self {
            MerkleTree::Leaf(h) => h,
            MerkleTree::Node(h, _, _) => h,
            MerkleTree::Zero(depth) => H256::from_slice(&ZERO_HASHES[depth]),
        }
    }

    /// Get a reference to the left and right subtrees if they exist.
    pub fn left_and_right_branches(&self) -> Option<(&Self, &Self)> {
        match *self {
            MerkleTree::Leaf(_) | MerkleTree::Zero(0) => None,
            MerkleTree::Node(_, ref l, ref r) => Some((l, r)),
            MerkleTree::Zero(depth) => Some((&ZERO_NODES[depth - 1], &ZERO_NODES[depth - 1])),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, MerkleTree::Leaf(_))
    }

    /// Return the leaf at `index` and a bottom-up proof of its inclusion, `depth` hashes long.
    pub fn generate_proof(
        &self,
        index: usize,
        depth: usize,
    ) -> Result<(H256, Vec<H256>), MerkleTreeError> {
        let mut proof = vec![];
        let mut current_node = self;
        let mut current_depth = depth;
        while current_depth > 0 {
            let ith_bit = (index >> (current_depth - 1)) & 0x01;
            let (left, right) = current_node
                .left_and_right_branches()
                .ok_or(MerkleTreeError::Invalid)?;

            if ith_bit == 1 {
                proof.push(left.hash());
                current_node = right;
            } else {
                proof.push(right.hash());
                current_node = left;
            }
            current_depth -= 1;
        }

        if !current_node.is_leaf() {
            return Err(MerkleTreeError::NoLeaf);
        }

        proof.reverse();

        Ok((current_node.hash(), proof))
    }
}

/// Verify a proof that `leaf` exists at `index` in a Merkle tree rooted at `root`.
///
/// `branch` lists sibling hashes bottom-up and must be exactly `depth` long.
pub fn verify_merkle_proof(
    leaf: H256,
    branch: &[H256],
    depth: usize,
    index: usize,
    root: H256,
) -> bool {
    if branch.len() == depth {
        merkle_root_from_branch(leaf, branch, depth, index) == root
    } else {
        false
    }
}

/// Compute a root hash from a leaf and a Merkle proof.
pub fn merkle_root_from_branch(leaf: H256, branch: &[H256], depth: usize, index: usize) -> H256 {
    let mut merkle_root = leaf.as_bytes().to_vec();

    for (i, sibling) in branch.iter().enumerate().take(depth) {
        let ith_bit = (index >> i) & 0x01;
        merkle_root = if ith_bit == 1 {
            hash32_concat(sibling.as_bytes(), &merkle_root).to_vec()
        } else {
            hash32_concat(&merkle_root, sibling.as_bytes()).to_vec()
        };
    }

    H256::from_slice(&merkle_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;

    fn node(a: H256, b: H256) -> H256 {
        H256::from_slice(&hash32_concat(a.as_bytes(), b.as_bytes()))
    }

    #[quickcheck]
    fn quickcheck_create_and_verify(int_leaves: Vec<u64>, depth: u8) -> TestResult {
        let depth = (depth % 11) as usize;
        let leaves: Vec<_> = int_leaves
            .into_iter()
            .take(2usize.pow(depth as u32))
            .map(H256::from_low_u64_be)
            .collect();
        let merkle_tree = MerkleTree::create(&leaves, depth);
        let merkle_root = merkle_tree.hash();

        let proofs_ok = (0..leaves.len()).all(|i| {
            let (leaf, branch) = merkle_tree.generate_proof(i, depth).unwrap();
            leaf == leaves[i] && verify_merkle_proof(leaf, &branch, depth, i, merkle_root)
        });

        TestResult::from_bool(proofs_ok)
    }

    #[quickcheck]
    fn quickcheck_push_leaf_matches_create(int_leaves: Vec<u64>) -> TestResult {
        let depth = 7;
        let leaves: Vec<_> = int_leaves
            .into_iter()
            .take(2usize.pow(depth as u32))
            .map(H256::from_low_u64_be)
            .collect();

        let mut incremental = MerkleTree::create(&[], depth);
        for leaf in &leaves {
            incremental.push_leaf(*leaf, depth).unwrap();
        }

        TestResult::from_bool(incremental.hash() == MerkleTree::create(&leaves, depth).hash())
    }

    #[test]
    fn full_tree_rejects_push() {
        let leaves = [H256::repeat_byte(1), H256::repeat_byte(2)];
        let mut tree = MerkleTree::create(&leaves, 1);
        assert_eq!(
            tree.push_leaf(H256::repeat_byte(3), 1),
            Err(MerkleTreeError::MerkleTreeFull)
        );
    }

    #[test]
    fn sparse_zero_correct() {
        let depth = 2;
        let zero = H256::zero();
        let dense_tree = MerkleTree::create(&[zero, zero, zero, zero], depth);
        let sparse_tree = MerkleTree::create(&[], depth);
        assert_eq!(dense_tree.hash(), sparse_tree.hash());
    }

    #[test]
    fn small_tree_proofs() {
        let leaves = [
            H256::repeat_byte(0xaa),
            H256::repeat_byte(0xbb),
            H256::repeat_byte(0xcc),
            H256::repeat_byte(0xdd),
        ];
        let left = node(leaves[0], leaves[1]);
        let right = node(leaves[2], leaves[3]);
        let root = node(left, right);

        assert_eq!(MerkleTree::create(&leaves, 2).hash(), root);
        assert!(verify_merkle_proof(leaves[0], &[leaves[1], right], 2, 0, root));
        assert!(verify_merkle_proof(leaves[3], &[leaves[2], left], 2, 3, root));

        // Wrong order, wrong index, short branch and wrong root all fail.
        assert!(!verify_merkle_proof(leaves[1], &[right, leaves[0]], 2, 1, root));
        assert!(!verify_merkle_proof(leaves[1], &[leaves[0], right], 2, 2, root));
        assert!(!verify_merkle_proof(leaves[1], &[leaves[0]], 2, 1, root));
        assert!(!verify_merkle_proof(leaves[1], &[leaves[0], right], 2, 1, right));
    }

    #[test]
    fn proof_for_missing_leaf_errors() {
        let tree = MerkleTree::create(&[H256::repeat_byte(1)], 3);
        assert_eq!(tree.generate_proof(5, 3), Err(MerkleTreeError::NoLeaf));
    }
}
