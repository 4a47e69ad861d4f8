use std::future::Future;
use std::sync::Arc;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::witness::PublicSignals;

/// Policy record owned by the settlement collaborator.
///
/// `claimed` flips `false → true` exactly once on a successful claim;
/// policies are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub commitment: B256,
    pub purchase_timestamp: u64,
    pub paid_premium: u64,
    pub claimed: bool,
}

/// Minimal transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tx_hash: B256,
    pub success: bool,
}

/// Result of a settled claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSettlement {
    pub payout: u64,
    pub receipt: LedgerReceipt,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("policy {0} not found")]
    PolicyNotFound(u64),

    #[error("policy {0} already registered")]
    DuplicatePolicy(u64),

    #[error("policy {0} already claimed")]
    AlreadyClaimed(u64),

    #[error("claim rejected: {0}")]
    ClaimRejected(&'static str),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Port for the ledger/settlement collaborator.
///
/// `write_root` is idempotent and safe to retry. `submit_claim` independently
/// re-derives every claim-validation predicate before paying out — the
/// oracle-side arithmetic is never trusted.
pub trait LedgerPort: Send + Sync {
    /// Read the root the ledger currently holds.
    fn read_root(&self) -> impl Future<Output = Result<B256, LedgerError>> + Send;

    /// Push a new oracle root. Idempotent.
    fn write_root(
        &self,
        root: B256,
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send;

    /// Register a purchase policy. Increments the total-sold counter that
    /// drives the demand factor.
    fn register_policy(
        &self,
        policy_id: u64,
        policy: Policy,
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send;

    /// Total policies sold so far (the demand-factor input).
    fn purchase_count(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Submit a claim with its proof and public signals.
    fn submit_claim(
        &self,
        policy_id: u64,
        proof: &[u8],
        signals: &PublicSignals,
    ) -> impl Future<Output = Result<ClaimSettlement, LedgerError>> + Send;

    /// Publish the packed snapshot blob for data availability.
    fn publish_blob(
        &self,
        chunks: &[B256],
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send;
}

// Shared handles delegate, so an oracle and a test can talk to one ledger.
impl<L: LedgerPort> LedgerPort for Arc<L> {
    fn read_root(&self) -> impl Future<Output = Result<B256, LedgerError>> + Send {
        (**self).read_root()
    }

    fn write_root(
        &self,
        root: B256,
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send {
        (**self).write_root(root)
    }

    fn register_policy(
        &self,
        policy_id: u64,
        policy: Policy,
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send {
        (**self).register_policy(policy_id, policy)
    }

    fn purchase_count(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send {
        (**self).purchase_count()
    }

    fn submit_claim(
        &self,
        policy_id: u64,
        proof: &[u8],
        signals: &PublicSignals,
    ) -> impl Future<Output = Result<ClaimSettlement, LedgerError>> + Send {
        (**self).submit_claim(policy_id, proof, signals)
    }

    fn publish_blob(
        &self,
        chunks: &[B256],
    ) -> impl Future<Output = Result<LedgerReceipt, LedgerError>> + Send {
        (**self).publish_blob(chunks)
    }
}
