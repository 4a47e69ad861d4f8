use alloy_primitives::Bytes;
use sha2::{Digest, Sha256};

use crate::domain::tier::TierTable;
use crate::domain::witness::{ClaimWitness, PublicSignals};
use crate::ports::prover::{ClaimProof, ClaimProver, ProverError};

/// Deterministic stand-in for the ZK proving backend.
///
/// `prove` enforces the same constraints a real circuit would (commitment
/// binding, Merkle inclusion, the claim arithmetic) and emits a SHA-256
/// transcript of the public signals as the "proof"; `verify` recomputes the
/// transcript. No zero-knowledge, but the prove/verify contract and the
/// public-signal ordering match the real backend exactly.
pub struct MockClaimProver {
    tier_table: TierTable,
}

impl MockClaimProver {
    pub fn new(tier_table: TierTable) -> Self {
        Self { tier_table }
    }

    fn transcript(signals: &PublicSignals) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"price_shield.claim.v1");
        for signal in signals.to_vec() {
            hasher.update(signal.as_slice());
        }
        hasher.finalize().to_vec()
    }
}

impl ClaimProver for MockClaimProver {
    async fn prove(&self, witness: &ClaimWitness) -> Result<ClaimProof, ProverError> {
        witness.check_constraints()?;
        let public_signals = witness.public_signals(&self.tier_table)?;
        let proof = Bytes::from(Self::transcript(&public_signals));
        Ok(ClaimProof {
            proof,
            public_signals,
        })
    }

    async fn verify(&self, proof: &[u8], signals: &PublicSignals) -> Result<bool, ProverError> {
        Ok(proof == Self::transcript(signals))
    }
}
