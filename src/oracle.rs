//! The price oracle: owns the product catalog, the mutable price map, and
//! the Merkle tree published to the ledger.
//!
//! Single-writer discipline: every mutator takes `&mut self`, so a rebuild,
//! its snapshot write, and the ledger reconciliation can never interleave
//! within one instance. Mutations succeed once the local persist succeeds;
//! ledger reconciliation is best-effort and retried with bounded backoff —
//! the local snapshot is always authoritative.

use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::poseidon::{leaf_hash, product_hash};
use crate::domain::blob;
use crate::domain::merkle::{MerkleError, MerkleProof, MerkleTree};
use crate::domain::product::Product;
use crate::domain::snapshot::OracleSnapshot;
use crate::ports::ledger::{LedgerError, LedgerPort};
use crate::ports::store::{SnapshotStore, StoreError};
use crate::retry::{self, RetryPolicy};

/// Default chunk budget for snapshot blob publication (≈31 KiB of payload).
pub const DEFAULT_BLOB_CHUNKS: usize = 1024;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("duplicate product id in catalog: {0}")]
    DuplicateProduct(String),

    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("invalid percent {0}, must be 0..=100")]
    InvalidPercent(u8),

    #[error(transparent)]
    Merkle(#[from] MerkleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// How to bring the oracle up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Load the persisted snapshot, falling back to `ForceRebuild` when it
    /// is absent or corrupt.
    Resume,
    /// Reset every price to its catalog base price, rebuild, persist.
    ForceRebuild,
}

/// Everything a claimant needs to prove their product's current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceProof {
    pub leaf: B256,
    pub product_hash: B256,
    pub siblings: Vec<B256>,
    pub flags: Vec<u8>,
    pub leaf_index: u64,
    pub root: B256,
}

impl PriceProof {
    /// The embedded inclusion proof, for `merkle::verify` and witnesses.
    pub fn merkle_proof(&self) -> MerkleProof {
        MerkleProof {
            siblings: self.siblings.clone(),
            flags: self.flags.clone(),
            leaf_index: self.leaf_index,
        }
    }
}

/// Local/ledger divergence report. Mutations succeed on local persist alone,
/// so this is how callers observe degraded ledger sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub local_root: B256,
    pub ledger_root: B256,
    pub in_sync: bool,
}

/// Orchestrates the catalog, the price map, tree rebuilds, persistence, and
/// ledger reconciliation. Dependencies are injected so multiple isolated
/// instances can coexist (there is no global oracle).
pub struct PriceOracle<S: SnapshotStore, L: LedgerPort> {
    catalog: Vec<Product>,
    /// product id → catalog index (also the leaf index)
    index: HashMap<String, usize>,
    /// field identity per catalog index
    product_hashes: Vec<B256>,
    prices: BTreeMap<String, u64>,
    tree: MerkleTree,
    depth: usize,
    blob_chunks: usize,
    retry_policy: RetryPolicy,
    store: S,
    ledger: L,
}

impl<S: SnapshotStore, L: LedgerPort> PriceOracle<S, L> {
    /// Build an oracle over a fixed catalog. Prices start at the catalog
    /// base prices; nothing is persisted until [`initialize`](Self::initialize).
    pub fn new(
        catalog: Vec<Product>,
        depth: usize,
        store: S,
        ledger: L,
    ) -> Result<Self, OracleError> {
        if catalog.is_empty() {
            return Err(OracleError::EmptyCatalog);
        }

        let mut index = HashMap::with_capacity(catalog.len());
        let mut product_hashes = Vec::with_capacity(catalog.len());
        let mut prices = BTreeMap::new();
        for (i, product) in catalog.iter().enumerate() {
            if index.insert(product.id.clone(), i).is_some() {
                return Err(OracleError::DuplicateProduct(product.id.clone()));
            }
            product_hashes.push(product_hash(&product.id));
            prices.insert(product.id.clone(), product.base_price);
        }

        let leaves: Vec<B256> = catalog
            .iter()
            .enumerate()
            .map(|(i, p)| leaf_hash(product_hashes[i], p.base_price))
            .collect();
        let tree = MerkleTree::build(&leaves, depth)?;

        Ok(Self {
            catalog,
            index,
            product_hashes,
            prices,
            tree,
            depth,
            blob_chunks: DEFAULT_BLOB_CHUNKS,
            retry_policy: RetryPolicy::default(),
            store,
            ledger,
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_blob_chunks(mut self, chunks: usize) -> Self {
        self.blob_chunks = chunks;
        self
    }

    /// Bring the oracle up per `mode`, then reconcile the ledger
    /// opportunistically.
    pub async fn initialize(&mut self, mode: InitMode) -> Result<(), OracleError> {
        match mode {
            InitMode::ForceRebuild => {
                self.reset_prices_to_base();
                self.rebuild_and_persist().await?;
            }
            InitMode::Resume => match self.store.load().await? {
                Some(snapshot) if self.adoptable(&snapshot) => {
                    self.prices = snapshot.prices.clone();
                    self.tree = MerkleTree::build(&snapshot.leaves, self.depth)?;
                    self.sync_ledger(&snapshot).await;
                }
                Some(_) => {
                    tracing::warn!("persisted snapshot inconsistent with catalog, forcing rebuild");
                    self.reset_prices_to_base();
                    self.rebuild_and_persist().await?;
                }
                None => {
                    self.reset_prices_to_base();
                    self.rebuild_and_persist().await?;
                }
            },
        }
        Ok(())
    }

    /// Set one product's current price.
    pub async fn set_price(&mut self, id: &str, price: u64) -> Result<B256, OracleError> {
        if !self.index.contains_key(id) {
            return Err(OracleError::ProductNotFound(id.to_string()));
        }

        let previous = self.prices.insert(id.to_string(), price);
        match self.rebuild_and_persist().await {
            Ok(root) => Ok(root),
            Err(e) => {
                // Price map and snapshot write are one logical transaction.
                if let Some(p) = previous {
                    self.prices.insert(id.to_string(), p);
                }
                Err(e)
            }
        }
    }

    /// Drop every price by `percent` (floor arithmetic).
    pub async fn drop_all_prices(&mut self, percent: u8) -> Result<B256, OracleError> {
        if percent > 100 {
            return Err(OracleError::InvalidPercent(percent));
        }

        let previous = self.prices.clone();
        for price in self.prices.values_mut() {
            // Wei-scale prices overflow u64 when multiplied first.
            *price = (*price as u128 * (100 - percent) as u128 / 100) as u64;
        }
        match self.rebuild_and_persist().await {
            Ok(root) => Ok(root),
            Err(e) => {
                self.prices = previous;
                Err(e)
            }
        }
    }

    /// Reset every price to its catalog base price.
    pub async fn reset_all(&mut self) -> Result<B256, OracleError> {
        let previous = self.prices.clone();
        self.reset_prices_to_base();
        match self.rebuild_and_persist().await {
            Ok(root) => Ok(root),
            Err(e) => {
                self.prices = previous;
                Err(e)
            }
        }
    }

    /// Inclusion proof for a product's current price leaf.
    pub fn proof_for(&self, id: &str) -> Result<PriceProof, OracleError> {
        let &idx = self
            .index
            .get(id)
            .ok_or_else(|| OracleError::ProductNotFound(id.to_string()))?;
        let proof = self.tree.proof(idx)?;

        Ok(PriceProof {
            leaf: self.tree.leaves()[idx],
            product_hash: self.product_hashes[idx],
            siblings: proof.siblings,
            flags: proof.flags,
            leaf_index: proof.leaf_index,
            root: self.tree.root(),
        })
    }

    pub fn current_price(&self, id: &str) -> Result<u64, OracleError> {
        self.prices
            .get(id)
            .copied()
            .ok_or_else(|| OracleError::ProductNotFound(id.to_string()))
    }

    pub fn prices(&self) -> &BTreeMap<String, u64> {
        &self.prices
    }

    pub fn catalog(&self) -> &[Product] {
        &self.catalog
    }

    pub fn root(&self) -> B256 {
        self.tree.root()
    }

    /// Export the current state as a snapshot document.
    pub fn snapshot(&self) -> OracleSnapshot {
        self.snapshot_of(&self.tree)
    }

    /// Compare the local root against what the ledger holds.
    pub async fn sync_status(&self) -> Result<SyncStatus, OracleError> {
        let ledger_root = self.ledger.read_root().await?;
        let local_root = self.tree.root();
        Ok(SyncStatus {
            local_root,
            ledger_root,
            in_sync: ledger_root == local_root,
        })
    }

    fn reset_prices_to_base(&mut self) {
        for product in &self.catalog {
            self.prices.insert(product.id.clone(), product.base_price);
        }
    }

    fn compute_leaves(&self) -> Vec<B256> {
        self.catalog
            .iter()
            .enumerate()
            .map(|(i, p)| leaf_hash(self.product_hashes[i], self.prices[&p.id]))
            .collect()
    }

    fn snapshot_of(&self, tree: &MerkleTree) -> OracleSnapshot {
        let mut product_hashes = BTreeMap::new();
        let mut leaf_hashes = BTreeMap::new();
        for (i, product) in self.catalog.iter().enumerate() {
            product_hashes.insert(product.id.clone(), self.product_hashes[i]);
            leaf_hashes.insert(product.id.clone(), tree.leaves()[i]);
        }

        OracleSnapshot {
            leaves: tree.leaves().to_vec(),
            root: tree.root(),
            product_hashes,
            leaf_hashes,
            prices: self.prices.clone(),
            timestamp: unix_now(),
        }
    }

    /// A persisted snapshot is adoptable when it passes its self-check and
    /// its prices reproduce exactly the stored leaf layer for this catalog.
    fn adoptable(&self, snapshot: &OracleSnapshot) -> bool {
        if snapshot.self_check(self.depth).is_err() {
            return false;
        }
        if snapshot.prices.len() != self.catalog.len() {
            return false;
        }

        let capacity = 1usize << self.depth;
        let mut expected = Vec::with_capacity(capacity);
        for (i, product) in self.catalog.iter().enumerate() {
            match snapshot.prices.get(&product.id) {
                Some(&price) => expected.push(leaf_hash(self.product_hashes[i], price)),
                None => return false,
            }
        }
        expected.resize(capacity, B256::ZERO);
        expected == snapshot.leaves
    }

    /// Recompute leaves, rebuild the tree, persist, then best-effort
    /// ledger reconciliation. The tree is only swapped in after the
    /// snapshot write succeeds.
    async fn rebuild_and_persist(&mut self) -> Result<B256, OracleError> {
        let leaves = self.compute_leaves();
        let tree = MerkleTree::build(&leaves, self.depth)?;
        let snapshot = self.snapshot_of(&tree);

        self.store.save(&snapshot).await?;
        self.tree = tree;

        self.sync_ledger(&snapshot).await;
        Ok(self.tree.root())
    }

    /// Push the root and publish the snapshot blob. Failures here are
    /// warnings, never rollbacks — the local snapshot stays authoritative
    /// and the ledger catches up on the next mutation.
    async fn sync_ledger(&self, snapshot: &OracleSnapshot) {
        let root = snapshot.root;
        if let Err(e) = retry::run(self.retry_policy, || self.ledger.write_root(root)).await {
            tracing::warn!(error = %e, "root push failed, continuing in local-only mode");
        }

        let payload = match serde_json::to_vec(snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot serialization for blob failed");
                return;
            }
        };
        match blob::pack(&payload, self.blob_chunks) {
            Ok(chunks) => {
                if let Err(e) =
                    retry::run(self.retry_policy, || self.ledger.publish_blob(&chunks)).await
                {
                    tracing::warn!(error = %e, "blob publication failed, continuing in local-only mode");
                }
            }
            // A size problem cannot be fixed by retrying.
            Err(e) => tracing::warn!(error = %e, "snapshot blob not published"),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
