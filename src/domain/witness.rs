//! Off-chain witness preparation for the claim circuit.
//!
//! The witness bundles the public and private inputs; the public-signal
//! vector it derives is a fixed contract shared with the prover and the
//! settlement collaborator — the order is load-bearing.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::poseidon::{leaf_hash, u64_to_b256};

use super::{
    claim::{self, ClaimError, ClaimInputs},
    commitment::{Commitment, CommitmentInput},
    merkle::{self, MerkleProof},
    tier::TierTable,
};

/// Number of public signals in the claim circuit contract.
pub const PUBLIC_SIGNAL_COUNT: usize = 11;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("expected {PUBLIC_SIGNAL_COUNT} public signals, got {0}")]
    BadSignalCount(usize),

    #[error("signal {index} does not fit its type: {value}")]
    SignalOutOfRange { index: usize, value: B256 },

    #[error("commitment does not match the private purchase fields")]
    CommitmentMismatch,

    #[error("price proof does not verify against the oracle root")]
    InclusionFailed,

    #[error(transparent)]
    Claim(#[from] ClaimError),
}

/// Public signals in the fixed circuit order:
/// `[valid_claim, price_difference, valid_premium, commitment, invoice_price,
/// product_hash, policy_start_date, current_price, policy_id, paid_premium,
/// purchase_count]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSignals {
    pub valid_claim: bool,
    pub price_difference: u64,
    pub valid_premium: bool,
    pub commitment: B256,
    pub invoice_price: u64,
    pub product_hash: B256,
    pub policy_start_date: u64,
    pub current_price: u64,
    pub policy_id: u64,
    pub paid_premium: u64,
    pub purchase_count: u64,
}

fn bool_to_b256(v: bool) -> B256 {
    u64_to_b256(v as u64)
}

fn b256_to_u64(index: usize, value: B256) -> Result<u64, WitnessError> {
    let bytes = value.as_slice();
    if bytes[..24].iter().any(|&b| b != 0) {
        return Err(WitnessError::SignalOutOfRange { index, value });
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&bytes[24..]);
    Ok(u64::from_be_bytes(tail))
}

fn b256_to_bool(index: usize, value: B256) -> Result<bool, WitnessError> {
    match b256_to_u64(index, value)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(WitnessError::SignalOutOfRange { index, value }),
    }
}

impl PublicSignals {
    /// Serialize in the fixed circuit order.
    pub fn to_vec(&self) -> Vec<B256> {
        vec![
            bool_to_b256(self.valid_claim),
            u64_to_b256(self.price_difference),
            bool_to_b256(self.valid_premium),
            self.commitment,
            u64_to_b256(self.invoice_price),
            self.product_hash,
            u64_to_b256(self.policy_start_date),
            u64_to_b256(self.current_price),
            u64_to_b256(self.policy_id),
            u64_to_b256(self.paid_premium),
            u64_to_b256(self.purchase_count),
        ]
    }

    /// Parse from the fixed circuit order.
    pub fn from_vec(signals: &[B256]) -> Result<Self, WitnessError> {
        if signals.len() != PUBLIC_SIGNAL_COUNT {
            return Err(WitnessError::BadSignalCount(signals.len()));
        }
        Ok(Self {
            valid_claim: b256_to_bool(0, signals[0])?,
            price_difference: b256_to_u64(1, signals[1])?,
            valid_premium: b256_to_bool(2, signals[2])?,
            commitment: signals[3],
            invoice_price: b256_to_u64(4, signals[4])?,
            product_hash: signals[5],
            policy_start_date: b256_to_u64(6, signals[6])?,
            current_price: b256_to_u64(7, signals[7])?,
            policy_id: b256_to_u64(8, signals[8])?,
            paid_premium: b256_to_u64(9, signals[9])?,
            purchase_count: b256_to_u64(10, signals[10])?,
        })
    }
}

/// Full witness for the claim circuit (public + private inputs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimWitness {
    // ── Public ──
    pub policy_id: u64,
    pub commitment: B256,
    pub policy_start_date: u64,
    pub paid_premium: u64,
    /// Policies sold at purchase time; fixes the demand factor.
    pub purchase_count: u64,
    pub current_price: u64,
    pub oracle_root: B256,

    // ── Private ──
    pub order_hash: B256,
    pub invoice_price: u64,
    pub invoice_date: u64,
    pub product_hash: B256,
    pub salt: B256,
    pub selected_tier: u8,
    /// Inclusion proof for the product's current price leaf.
    pub price_proof: MerkleProof,
}

impl ClaimWitness {
    /// The private tuple bound by the commitment.
    pub fn commitment_input(&self) -> CommitmentInput {
        CommitmentInput {
            order_hash: self.order_hash,
            invoice_price: self.invoice_price,
            invoice_date: self.invoice_date,
            product_hash: self.product_hash,
            salt: self.salt,
            tier: self.selected_tier,
        }
    }

    /// Check the constraints the circuit would enforce before proving:
    /// the commitment binds the private fields and the price leaf is
    /// included under the oracle root.
    pub fn check_constraints(&self) -> Result<(), WitnessError> {
        if !super::commitment::verify_commitment(
            &Commitment(self.commitment),
            &self.commitment_input(),
        ) {
            return Err(WitnessError::CommitmentMismatch);
        }

        let leaf = leaf_hash(self.product_hash, self.current_price);
        if !merkle::verify(leaf, &self.price_proof, self.oracle_root) {
            return Err(WitnessError::InclusionFailed);
        }
        Ok(())
    }

    /// Derive the public signals by running the canonical claim arithmetic.
    pub fn public_signals(&self, table: &TierTable) -> Result<PublicSignals, WitnessError> {
        let inputs = ClaimInputs {
            invoice_price: self.invoice_price,
            current_price: self.current_price,
            invoice_date: self.invoice_date,
            policy_start_date: self.policy_start_date,
            selected_tier: self.selected_tier,
            paid_premium: self.paid_premium,
            factor_at_purchase: claim::dynamic_factor(self.purchase_count),
        };
        let outcome = claim::evaluate_claim(&inputs, table)?;

        Ok(PublicSignals {
            valid_claim: outcome.valid_claim,
            price_difference: claim::price_drop(self.invoice_price, self.current_price),
            valid_premium: outcome.valid_premium,
            commitment: self.commitment,
            invoice_price: self.invoice_price,
            product_hash: self.product_hash,
            policy_start_date: self.policy_start_date,
            current_price: self.current_price,
            policy_id: self.policy_id,
            paid_premium: self.paid_premium,
            purchase_count: self.purchase_count,
        })
    }
}

/// Build a witness for a policy holder claiming against the current oracle
/// state. The commitment is recomputed from the private fields and checked
/// against the registered one via [`ClaimWitness::check_constraints`] before
/// the result is handed to a prover.
#[allow(clippy::too_many_arguments)]
pub fn prepare_witness(
    policy_id: u64,
    commitment: Commitment,
    policy_start_date: u64,
    paid_premium: u64,
    purchase_count: u64,
    private: CommitmentInput,
    current_price: u64,
    price_proof: MerkleProof,
    oracle_root: B256,
) -> Result<ClaimWitness, WitnessError> {
    let witness = ClaimWitness {
        policy_id,
        commitment: commitment.0,
        policy_start_date,
        paid_premium,
        purchase_count,
        current_price,
        oracle_root,
        order_hash: private.order_hash,
        invoice_price: private.invoice_price,
        invoice_date: private.invoice_date,
        product_hash: private.product_hash,
        salt: private.salt,
        selected_tier: private.tier,
        price_proof,
    };
    witness.check_constraints()?;
    Ok(witness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commitment::commitment_hash;
    use crate::domain::tier::TierBand;

    fn table() -> TierTable {
        TierTable::new(vec![
            TierBand { tier_id: 1, min_price: 0, max_price: Some(500), base_premium: 10 },
            TierBand { tier_id: 2, min_price: 500, max_price: None, base_premium: 40 },
        ])
        .unwrap()
    }

    fn sample_signals() -> PublicSignals {
        PublicSignals {
            valid_claim: true,
            price_difference: 100,
            valid_premium: true,
            commitment: B256::repeat_byte(0x0C),
            invoice_price: 1_000,
            product_hash: B256::repeat_byte(0x0A),
            policy_start_date: 1_700_000_000,
            current_price: 900,
            policy_id: 7,
            paid_premium: 40,
            purchase_count: 12,
        }
    }

    #[test]
    fn signal_order_is_the_contract() {
        let v = sample_signals().to_vec();
        assert_eq!(v.len(), PUBLIC_SIGNAL_COUNT);
        assert_eq!(v[0], u64_to_b256(1)); // valid_claim
        assert_eq!(v[1], u64_to_b256(100)); // price_difference
        assert_eq!(v[2], u64_to_b256(1)); // valid_premium
        assert_eq!(v[3], B256::repeat_byte(0x0C)); // commitment
        assert_eq!(v[4], u64_to_b256(1_000)); // invoice_price
        assert_eq!(v[5], B256::repeat_byte(0x0A)); // product_hash
        assert_eq!(v[6], u64_to_b256(1_700_000_000)); // policy_start_date
        assert_eq!(v[7], u64_to_b256(900)); // current_price
        assert_eq!(v[8], u64_to_b256(7)); // policy_id
        assert_eq!(v[9], u64_to_b256(40)); // paid_premium
        assert_eq!(v[10], u64_to_b256(12)); // purchase_count
    }

    #[test]
    fn signals_round_trip() {
        let signals = sample_signals();
        assert_eq!(PublicSignals::from_vec(&signals.to_vec()).unwrap(), signals);
    }

    #[test]
    fn wrong_signal_count_rejected() {
        let mut v = sample_signals().to_vec();
        v.pop();
        assert!(matches!(
            PublicSignals::from_vec(&v),
            Err(WitnessError::BadSignalCount(10))
        ));
    }

    #[test]
    fn oversized_numeric_signal_rejected() {
        let mut v = sample_signals().to_vec();
        v[1] = B256::repeat_byte(0xFF);
        assert!(matches!(
            PublicSignals::from_vec(&v),
            Err(WitnessError::SignalOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn non_boolean_flag_rejected() {
        let mut v = sample_signals().to_vec();
        v[0] = u64_to_b256(2);
        assert!(matches!(
            PublicSignals::from_vec(&v),
            Err(WitnessError::SignalOutOfRange { index: 0, .. })
        ));
    }

    fn sample_witness() -> ClaimWitness {
        use crate::domain::merkle::MerkleTree;

        let product_hash = crate::crypto::poseidon::product_hash("widget-a");
        let current_price = 900u64;
        let leaf = leaf_hash(product_hash, current_price);
        let tree = MerkleTree::build(&[leaf], 2).unwrap();

        let private = CommitmentInput {
            order_hash: B256::repeat_byte(0x11),
            invoice_price: 1_000,
            invoice_date: 500,
            product_hash,
            salt: B256::repeat_byte(0x05),
            tier: 2,
        };
        let commitment = commitment_hash(&private);

        prepare_witness(
            7,
            commitment,
            600,
            40,
            0,
            private,
            current_price,
            tree.proof(0).unwrap(),
            tree.root(),
        )
        .unwrap()
    }

    #[test]
    fn prepared_witness_yields_consistent_signals() {
        let signals = sample_witness().public_signals(&table()).unwrap();
        assert!(signals.valid_claim);
        assert!(signals.valid_premium);
        assert_eq!(signals.price_difference, 100);
        assert_eq!(signals.current_price, 900);
    }

    #[test]
    fn bad_salt_fails_preparation() {
        let mut witness = sample_witness();
        witness.salt = B256::repeat_byte(0x06);
        assert!(matches!(
            witness.check_constraints(),
            Err(WitnessError::CommitmentMismatch)
        ));
    }

    #[test]
    fn stale_root_fails_preparation() {
        let mut witness = sample_witness();
        witness.oracle_root = B256::repeat_byte(0xEE);
        assert!(matches!(
            witness.check_constraints(),
            Err(WitnessError::InclusionFailed)
        ));
    }
}
