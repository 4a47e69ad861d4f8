use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy_primitives::B256;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::domain::claim;
use crate::domain::tier::TierTable;
use crate::domain::witness::PublicSignals;
use crate::ports::ledger::{ClaimSettlement, LedgerError, LedgerPort, LedgerReceipt, Policy};

struct LedgerState {
    root: B256,
    policies: HashMap<u64, Policy>,
    published_blobs: Vec<Vec<B256>>,
    purchase_count: u64,
}

/// In-memory mock of the ledger/settlement collaborator.
///
/// `submit_claim` mirrors the on-chain settlement contract: it re-derives
/// every claim-validation predicate from the public signals and its own
/// policy record — using the same canonical arithmetic in
/// [`crate::domain::claim`], not a private reimplementation — before paying
/// out. The `fail_writes` toggle simulates an unavailable ledger for retry
/// and degraded-mode testing.
pub struct MockLedger {
    state: Mutex<LedgerState>,
    tier_table: TierTable,
    fail_writes: AtomicBool,
}

fn receipt(payload: &[u8]) -> LedgerReceipt {
    LedgerReceipt {
        tx_hash: B256::from_slice(&Sha256::digest(payload)),
        success: true,
    }
}

impl MockLedger {
    pub fn new(tier_table: TierTable) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                root: B256::ZERO,
                policies: HashMap::new(),
                published_blobs: Vec::new(),
                purchase_count: 0,
            }),
            tier_table,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make write operations fail with `Unavailable` until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn policy(&self, policy_id: u64) -> Option<Policy> {
        self.state.lock().await.policies.get(&policy_id).cloned()
    }

    pub async fn published_blob_count(&self) -> usize {
        self.state.lock().await.published_blobs.len()
    }

    pub async fn last_published_blob(&self) -> Option<Vec<B256>> {
        self.state.lock().await.published_blobs.last().cloned()
    }

    fn check_available(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }

    /// The settlement check proper. Returns the payout or a rejection.
    fn settle(
        table: &TierTable,
        policy: &Policy,
        signals: &PublicSignals,
        proof: &[u8],
    ) -> Result<u64, LedgerError> {
        if proof.is_empty() {
            return Err(LedgerError::ClaimRejected("empty proof"));
        }
        if signals.commitment != policy.commitment {
            return Err(LedgerError::ClaimRejected("commitment mismatch"));
        }
        if signals.paid_premium != policy.paid_premium {
            return Err(LedgerError::ClaimRejected("premium mismatch with policy"));
        }
        if signals.policy_start_date != policy.purchase_timestamp {
            return Err(LedgerError::ClaimRejected("policy start date mismatch"));
        }

        // Re-derive the premium predicate: the invoice price is public, so the
        // tier and its expected premium can be recomputed here.
        let factor = claim::dynamic_factor(signals.purchase_count);
        let premium_ok = claim::valid_premium(
            signals.invoice_price,
            claim::classify_tier(signals.invoice_price, table)
                .map_err(|_| LedgerError::ClaimRejected("invoice price outside tier table"))?,
            signals.paid_premium,
            factor,
            table,
        )
        .map_err(|_| LedgerError::ClaimRejected("invoice price outside tier table"))?;
        if premium_ok != signals.valid_premium {
            return Err(LedgerError::ClaimRejected("premium flag inconsistent"));
        }

        // Re-derive the price-drop arithmetic. The date predicate is enforced
        // by the proof (invoice_date is private); the price side is public.
        let drop = claim::price_drop(signals.invoice_price, signals.current_price);
        if drop != signals.price_difference {
            return Err(LedgerError::ClaimRejected("price difference inconsistent"));
        }
        if signals.valid_claim && signals.invoice_price <= signals.current_price {
            return Err(LedgerError::ClaimRejected("claim flag inconsistent"));
        }

        if !(signals.valid_claim && signals.valid_premium) {
            return Err(LedgerError::ClaimRejected("claim predicates not satisfied"));
        }
        Ok(drop)
    }
}

impl LedgerPort for MockLedger {
    async fn read_root(&self) -> Result<B256, LedgerError> {
        Ok(self.state.lock().await.root)
    }

    async fn write_root(&self, root: B256) -> Result<LedgerReceipt, LedgerError> {
        self.check_available()?;
        self.state.lock().await.root = root;
        Ok(receipt(root.as_slice()))
    }

    async fn register_policy(
        &self,
        policy_id: u64,
        policy: Policy,
    ) -> Result<LedgerReceipt, LedgerError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state.policies.contains_key(&policy_id) {
            return Err(LedgerError::DuplicatePolicy(policy_id));
        }
        state.policies.insert(policy_id, policy);
        state.purchase_count += 1;
        Ok(receipt(&policy_id.to_be_bytes()))
    }

    async fn purchase_count(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().await.purchase_count)
    }

    async fn submit_claim(
        &self,
        policy_id: u64,
        proof: &[u8],
        signals: &PublicSignals,
    ) -> Result<ClaimSettlement, LedgerError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let policy = state
            .policies
            .get(&policy_id)
            .ok_or(LedgerError::PolicyNotFound(policy_id))?;
        if policy.claimed {
            return Err(LedgerError::AlreadyClaimed(policy_id));
        }

        let payout = Self::settle(&self.tier_table, policy, signals, proof)?;

        // The single permitted mutation: claimed false → true.
        state
            .policies
            .get_mut(&policy_id)
            .expect("policy checked above")
            .claimed = true;

        Ok(ClaimSettlement {
            payout,
            receipt: receipt(&[&policy_id.to_be_bytes()[..], proof].concat()),
        })
    }

    async fn publish_blob(&self, chunks: &[B256]) -> Result<LedgerReceipt, LedgerError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        state.published_blobs.push(chunks.to_vec());
        let mut transcript = Vec::with_capacity(chunks.len() * 32);
        for chunk in chunks {
            transcript.extend_from_slice(chunk.as_slice());
        }
        Ok(receipt(&transcript))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tier::TierBand;

    fn table() -> TierTable {
        TierTable::new(vec![
            TierBand { tier_id: 1, min_price: 0, max_price: Some(500), base_premium: 10 },
            TierBand { tier_id: 2, min_price: 500, max_price: None, base_premium: 40 },
        ])
        .unwrap()
    }

    fn policy(commitment: B256) -> Policy {
        Policy {
            commitment,
            purchase_timestamp: 1_000,
            paid_premium: 40,
            claimed: false,
        }
    }

    fn good_signals(commitment: B256) -> PublicSignals {
        PublicSignals {
            valid_claim: true,
            price_difference: 100,
            valid_premium: true,
            commitment,
            invoice_price: 1_000,
            product_hash: B256::repeat_byte(0x0A),
            policy_start_date: 1_000,
            current_price: 900,
            policy_id: 1,
            paid_premium: 40,
            purchase_count: 0,
        }
    }

    #[tokio::test]
    async fn valid_claim_pays_the_drop_and_flips_claimed() {
        let ledger = MockLedger::new(table());
        let commitment = B256::repeat_byte(0x0C);
        ledger.register_policy(1, policy(commitment)).await.unwrap();

        let settlement = ledger
            .submit_claim(1, b"proof", &good_signals(commitment))
            .await
            .unwrap();
        assert_eq!(settlement.payout, 100);
        assert!(ledger.policy(1).await.unwrap().claimed);
    }

    #[tokio::test]
    async fn second_claim_rejected() {
        let ledger = MockLedger::new(table());
        let commitment = B256::repeat_byte(0x0C);
        ledger.register_policy(1, policy(commitment)).await.unwrap();
        ledger
            .submit_claim(1, b"proof", &good_signals(commitment))
            .await
            .unwrap();

        let err = ledger
            .submit_claim(1, b"proof", &good_signals(commitment))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClaimed(1)));
    }

    #[tokio::test]
    async fn unknown_policy_rejected() {
        let ledger = MockLedger::new(table());
        let err = ledger
            .submit_claim(9, b"proof", &good_signals(B256::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PolicyNotFound(9)));
    }

    #[tokio::test]
    async fn tampered_price_difference_rejected() {
        let ledger = MockLedger::new(table());
        let commitment = B256::repeat_byte(0x0C);
        ledger.register_policy(1, policy(commitment)).await.unwrap();

        let mut signals = good_signals(commitment);
        signals.price_difference = 500; // claim a bigger payout than the drop
        let err = ledger.submit_claim(1, b"proof", &signals).await.unwrap_err();
        assert!(matches!(err, LedgerError::ClaimRejected(_)));
        assert!(!ledger.policy(1).await.unwrap().claimed);
    }

    #[tokio::test]
    async fn premium_flag_must_match_rederivation() {
        let ledger = MockLedger::new(table());
        let commitment = B256::repeat_byte(0x0C);
        // Policy paid 39, below the tier-2 premium of 40.
        let mut p = policy(commitment);
        p.paid_premium = 39;
        ledger.register_policy(1, p).await.unwrap();

        let mut signals = good_signals(commitment);
        signals.paid_premium = 39; // consistent with policy, but flag lies
        let err = ledger.submit_claim(1, b"proof", &signals).await.unwrap_err();
        assert!(matches!(err, LedgerError::ClaimRejected("premium flag inconsistent")));
    }

    #[tokio::test]
    async fn commitment_mismatch_rejected() {
        let ledger = MockLedger::new(table());
        ledger
            .register_policy(1, policy(B256::repeat_byte(0x0C)))
            .await
            .unwrap();

        let signals = good_signals(B256::repeat_byte(0x0D));
        let err = ledger.submit_claim(1, b"proof", &signals).await.unwrap_err();
        assert!(matches!(err, LedgerError::ClaimRejected("commitment mismatch")));
    }

    #[tokio::test]
    async fn duplicate_policy_rejected() {
        let ledger = MockLedger::new(table());
        ledger.register_policy(1, policy(B256::ZERO)).await.unwrap();
        let err = ledger.register_policy(1, policy(B256::ZERO)).await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicatePolicy(1)));
    }

    #[tokio::test]
    async fn registration_increments_purchase_count() {
        let ledger = MockLedger::new(table());
        assert_eq!(ledger.purchase_count().await.unwrap(), 0);
        ledger.register_policy(1, policy(B256::ZERO)).await.unwrap();
        ledger.register_policy(2, policy(B256::ZERO)).await.unwrap();
        assert_eq!(ledger.purchase_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn outage_fails_writes_but_not_reads() {
        let ledger = MockLedger::new(table());
        ledger.write_root(B256::repeat_byte(0x01)).await.unwrap();
        ledger.set_fail_writes(true);

        assert!(matches!(
            ledger.write_root(B256::repeat_byte(0x02)).await,
            Err(LedgerError::Unavailable(_))
        ));
        assert_eq!(ledger.read_root().await.unwrap(), B256::repeat_byte(0x01));

        ledger.set_fail_writes(false);
        ledger.write_root(B256::repeat_byte(0x02)).await.unwrap();
        assert_eq!(ledger.read_root().await.unwrap(), B256::repeat_byte(0x02));
    }

    #[tokio::test]
    async fn write_root_is_idempotent() {
        let ledger = MockLedger::new(table());
        let root = B256::repeat_byte(0x01);
        ledger.write_root(root).await.unwrap();
        ledger.write_root(root).await.unwrap();
        assert_eq!(ledger.read_root().await.unwrap(), root);
    }

    #[tokio::test]
    async fn blobs_accumulate() {
        let ledger = MockLedger::new(table());
        ledger.publish_blob(&[B256::ZERO]).await.unwrap();
        ledger.publish_blob(&[B256::ZERO, B256::ZERO]).await.unwrap();
        assert_eq!(ledger.published_blob_count().await, 2);
        assert_eq!(ledger.last_published_blob().await.unwrap().len(), 2);
    }
}
