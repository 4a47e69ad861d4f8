use std::collections::BTreeMap;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::merkle::MerkleTree;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot holds {actual} leaves, configured capacity is {expected}")]
    LeafCountMismatch { expected: usize, actual: usize },

    #[error("stored root {stored} does not match recomputed root {recomputed}")]
    RootMismatch { stored: B256, recomputed: B256 },
}

/// Durable source of truth for the oracle: the padded leaf layer, the root,
/// the derived hash maps, and the prices that produced them.
///
/// Serialized as one JSON document; `BTreeMap` keys keep the output
/// deterministic and human-diffable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSnapshot {
    /// Padded leaf layer, exactly `2^depth` entries.
    pub leaves: Vec<B256>,
    pub root: B256,
    /// product id → field identity
    pub product_hashes: BTreeMap<String, B256>,
    /// product id → current leaf hash
    pub leaf_hashes: BTreeMap<String, B256>,
    /// product id → current price (smallest currency unit)
    pub prices: BTreeMap<String, u64>,
    /// Unix seconds at persist time.
    pub timestamp: u64,
}

impl OracleSnapshot {
    /// Self-validation: the leaf count must equal the configured capacity and
    /// rebuilding the tree from `leaves` must reproduce the stored root.
    /// Any mismatch is corruption, not a fatal error — callers fall back to
    /// a forced rebuild.
    pub fn self_check(&self, depth: usize) -> Result<(), SnapshotError> {
        let capacity = 1usize << depth;
        if self.leaves.len() != capacity {
            return Err(SnapshotError::LeafCountMismatch {
                expected: capacity,
                actual: self.leaves.len(),
            });
        }

        // Leaf count was just checked, so build cannot fail.
        let recomputed = MerkleTree::build(&self.leaves, depth)
            .map(|t| t.root())
            .unwrap_or_default();
        if recomputed != self.root {
            return Err(SnapshotError::RootMismatch {
                stored: self.root,
                recomputed,
            });
        }
        Ok(())
    }
}
