use std::future::Future;

use alloy_primitives::Bytes;
use thiserror::Error;

use crate::domain::witness::{ClaimWitness, PublicSignals, WitnessError};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("invalid witness: {0}")]
    InvalidWitness(#[from] WitnessError),

    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("proof verification failed: {0}")]
    Verification(String),
}

/// A proof for the claim circuit plus the public signals it commits to.
#[derive(Debug, Clone)]
pub struct ClaimProof {
    pub proof: Bytes,
    pub public_signals: PublicSignals,
}

/// Port for the opaque zero-knowledge proving backend.
///
/// The claim circuit proves, without revealing the private witness fields:
/// - the commitment binds (order_hash, invoice_price, invoice_date,
///   product_hash, salt, tier)
/// - the product's current price leaf is included under the oracle root
/// - the claim-validation arithmetic produced the public outcome signals
pub trait ClaimProver: Send + Sync {
    fn prove(
        &self,
        witness: &ClaimWitness,
    ) -> impl Future<Output = Result<ClaimProof, ProverError>> + Send;

    fn verify(
        &self,
        proof: &[u8],
        signals: &PublicSignals,
    ) -> impl Future<Output = Result<bool, ProverError>> + Send;
}
