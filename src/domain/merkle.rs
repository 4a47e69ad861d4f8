use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::poseidon::poseidon2;

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("{leaves} leaves exceed tree capacity {capacity}")]
    CapacityExceeded { leaves: usize, capacity: usize },

    #[error("leaf index {index} out of range for capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },
}

/// Inclusion proof: `depth` sibling hashes plus `depth` direction flags.
///
/// Flag = 1 means the running hash is the **right** operand at that level
/// (the sibling sits on the left); flag = 0 means the reverse. Generation
/// and verification share this convention — a circuit consuming these proofs
/// must use the same one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub siblings: Vec<B256>,
    pub flags: Vec<u8>,
    pub leaf_index: u64,
}

/// Fixed-depth binary Poseidon hash tree.
///
/// Depth is fixed at construction because the proving circuit needs a static,
/// known proof length. Leaves are padded with `B256::ZERO` to `2^depth`.
/// The tree is always fully rebuilt on mutation, never incrementally patched.
#[derive(Debug)]
pub struct MerkleTree {
    /// All levels, leaves (level 0) through root (level `depth`).
    levels: Vec<Vec<B256>>,
    depth: usize,
    leaf_count: usize,
}

impl MerkleTree {
    /// Build a tree from `leaves`, padding with the zero sentinel to `2^depth`.
    pub fn build(leaves: &[B256], depth: usize) -> Result<Self, MerkleError> {
        let capacity = 1usize << depth;
        if leaves.len() > capacity {
            return Err(MerkleError::CapacityExceeded {
                leaves: leaves.len(),
                capacity,
            });
        }

        let mut level0 = leaves.to_vec();
        level0.resize(capacity, B256::ZERO);

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(level0);
        for level in 1..=depth {
            let prev = &levels[level - 1];
            let mut next = Vec::with_capacity(prev.len() / 2);
            for pair in prev.chunks_exact(2) {
                next.push(poseidon2(pair[0], pair[1]));
            }
            levels.push(next);
        }

        Ok(Self {
            levels,
            depth,
            leaf_count: leaves.len(),
        })
    }

    /// The single top hash.
    pub fn root(&self) -> B256 {
        self.levels[self.depth][0]
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        1 << self.depth
    }

    /// Number of real (non-padding) leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// The padded leaf layer, exactly `capacity()` entries.
    pub fn leaves(&self) -> &[B256] {
        &self.levels[0]
    }

    /// Generate an inclusion proof for the leaf at `index`.
    ///
    /// Padding leaves are provable too — their leaf value is `B256::ZERO`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        if index >= self.capacity() {
            return Err(MerkleError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }

        let mut siblings = Vec::with_capacity(self.depth);
        let mut flags = Vec::with_capacity(self.depth);
        let mut current = index;
        for level in 0..self.depth {
            let is_right = (current % 2) as u8;
            let sibling = if is_right == 1 { current - 1 } else { current + 1 };
            siblings.push(self.levels[level][sibling]);
            flags.push(is_right);
            current /= 2;
        }

        Ok(MerkleProof {
            siblings,
            flags,
            leaf_index: index as u64,
        })
    }
}

/// Replay the pairwise hashing for `leaf` using the proof's direction flags.
///
/// Succeeds iff the final hash equals `root`.
pub fn verify(leaf: B256, proof: &MerkleProof, root: B256) -> bool {
    if proof.siblings.len() != proof.flags.len() {
        return false;
    }

    let mut current = leaf;
    for (sibling, flag) in proof.siblings.iter().zip(&proof.flags) {
        current = if *flag == 1 {
            poseidon2(*sibling, current)
        } else {
            poseidon2(current, *sibling)
        };
    }
    current == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_leaves(n: usize) -> Vec<B256> {
        (0..n).map(|i| B256::repeat_byte(i as u8 + 1)).collect()
    }

    #[test]
    fn every_index_verifies() {
        let leaves = sample_leaves(5);
        let tree = MerkleTree::build(&leaves, 3).unwrap();
        let root = tree.root();

        for (i, leaf) in tree.leaves().iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(verify(*leaf, &proof, root), "index {i} failed");
        }
    }

    #[test]
    fn tampered_sibling_fails() {
        let tree = MerkleTree::build(&sample_leaves(4), 2).unwrap();
        let root = tree.root();

        for level in 0..2 {
            let mut proof = tree.proof(1).unwrap();
            proof.siblings[level] = B256::repeat_byte(0xEE);
            assert!(!verify(tree.leaves()[1], &proof, root));
        }
    }

    #[test]
    fn flipped_flag_fails() {
        let tree = MerkleTree::build(&sample_leaves(4), 2).unwrap();
        let root = tree.root();

        for level in 0..2 {
            let mut proof = tree.proof(2).unwrap();
            proof.flags[level] ^= 1;
            assert!(!verify(tree.leaves()[2], &proof, root));
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let leaves = sample_leaves(6);
        let a = MerkleTree::build(&leaves, 3).unwrap();
        let b = MerkleTree::build(&leaves, 3).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn leaf_order_changes_root() {
        let leaves = sample_leaves(2);
        let swapped = vec![leaves[1], leaves[0]];
        let a = MerkleTree::build(&leaves, 2).unwrap();
        let b = MerkleTree::build(&swapped, 2).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn padding_leaf_is_provable() {
        let tree = MerkleTree::build(&sample_leaves(1), 2).unwrap();
        let proof = tree.proof(3).unwrap();
        assert!(verify(B256::ZERO, &proof, tree.root()));
    }

    #[test]
    fn capacity_exceeded_rejected() {
        let err = MerkleTree::build(&sample_leaves(5), 2).unwrap_err();
        assert!(matches!(err, MerkleError::CapacityExceeded { leaves: 5, capacity: 4 }));
    }

    #[test]
    fn index_out_of_range_rejected() {
        let tree = MerkleTree::build(&sample_leaves(2), 2).unwrap();
        let err = tree.proof(4).unwrap_err();
        assert!(matches!(err, MerkleError::IndexOutOfRange { index: 4, capacity: 4 }));
    }

    #[test]
    fn proof_length_equals_depth() {
        let tree = MerkleTree::build(&sample_leaves(3), 5).unwrap();
        let proof = tree.proof(0).unwrap();
        assert_eq!(proof.siblings.len(), 5);
        assert_eq!(proof.flags.len(), 5);
    }
}
