//! Privacy-preserving purchase-price insurance core.
//!
//! A buyer commits to purchase details via a hiding Poseidon hash, an oracle
//! maintains an authoritative Merkle tree of current product prices, and
//! claims settle by proving a price drop plus a tiered-premium match without
//! revealing which product or price was involved.
//!
//! The crate is organized hexagonally:
//! - [`crypto`] — Poseidon hashing over the BN254 scalar field
//! - [`domain`] — pure types and arithmetic (Merkle tree, tiers, claim
//!   validation, commitment, snapshot, blob codec)
//! - [`ports`] — traits for the external collaborators (ledger, prover,
//!   snapshot storage)
//! - [`adapters`] — concrete implementations (JSON file store, in-memory
//!   store, mock ledger, mock prover)
//! - [`oracle`] — the `PriceOracle` orchestrator
//! - [`retry`] — bounded-backoff wrapper for flaky external calls

pub mod adapters;
pub mod crypto;
pub mod domain;
pub mod oracle;
pub mod ports;
pub mod retry;

pub use oracle::{InitMode, OracleError, PriceOracle, PriceProof, SyncStatus};
