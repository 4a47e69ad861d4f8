use alloy_primitives::B256;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::crypto::poseidon::{poseidon6, u64_to_b256};

/// The hiding, binding hash of a purchase. Created once at purchase time,
/// immutable thereafter, compared by the settlement collaborator at claim time.
///
/// commitment = poseidon6(order_hash, invoice_price, invoice_date, product_hash, salt, tier)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub B256);

impl Commitment {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_ref()
    }
}

impl From<B256> for Commitment {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<Commitment> for B256 {
    fn from(value: Commitment) -> Self {
        value.0
    }
}

/// The private purchase fields bound by a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentInput {
    /// Hash of the merchant order reference.
    pub order_hash: B256,
    /// Price actually paid (smallest currency unit).
    pub invoice_price: u64,
    /// Purchase date, unix seconds.
    pub invoice_date: u64,
    /// Field identity of the insured product.
    pub product_hash: B256,
    /// Random blinding salt.
    pub salt: B256,
    /// Premium tier selected at purchase.
    pub tier: u8,
}

/// Compute the commitment for a purchase.
pub fn commitment_hash(input: &CommitmentInput) -> Commitment {
    Commitment(poseidon6(
        input.order_hash,
        u64_to_b256(input.invoice_price),
        u64_to_b256(input.invoice_date),
        input.product_hash,
        input.salt,
        u64_to_b256(input.tier as u64),
    ))
}

/// Recompute the commitment from the claimed fields and compare.
pub fn verify_commitment(commitment: &Commitment, input: &CommitmentInput) -> bool {
    commitment_hash(input) == *commitment
}

/// Generate a random blinding salt. The top bytes are zeroed so the value
/// stays within the BN254 field without reduction.
pub fn random_salt() -> B256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes[5..]);
    B256::from(bytes)
}
