//! Claim-validation arithmetic: the single specification mirrored by the
//! proving circuit, the settlement check, and the witness preparer.
//!
//! Every consumer calls these functions instead of re-deriving the formulas;
//! any divergence among copies would break claim correctness, so there are
//! no copies.

use thiserror::Error;

use super::tier::TierTable;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("price {0} is outside every tier band")]
    PriceOutOfRange(u64),

    #[error("unknown tier id {0}")]
    UnknownTier(u8),

    #[error("premium for tier {tier_id} under factor {factor} exceeds u64")]
    PremiumOverflow { tier_id: u8, factor: u64 },
}

/// Outcome of evaluating one claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub valid_claim: bool,
    pub valid_premium: bool,
    /// `price_drop` iff both predicates hold, else 0.
    pub payout: u64,
}

/// Everything the claim arithmetic needs, independent of where the values
/// came from (witness preparer, settlement check, or test fixture).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimInputs {
    pub invoice_price: u64,
    pub current_price: u64,
    pub invoice_date: u64,
    pub policy_start_date: u64,
    pub selected_tier: u8,
    pub paid_premium: u64,
    /// Demand factor frozen at purchase time (`dynamic_factor` of the
    /// purchase count back then).
    pub factor_at_purchase: u64,
}

/// The unique tier band containing `price`.
pub fn classify_tier(price: u64, table: &TierTable) -> Result<u8, ClaimError> {
    table
        .band_for(price)
        .map(|b| b.tier_id)
        .ok_or(ClaimError::PriceOutOfRange(price))
}

/// Demand-driven premium multiplier in percentage points, 100 = neutral.
///
/// `factor = 100 + floor(total_sold / 10)`
pub fn dynamic_factor(total_sold: u64) -> u64 {
    100 + total_sold / 10
}

/// Premium owed for a tier under a demand factor, floor division.
///
/// `premium = floor(base_premium * factor / 100)`
pub fn expected_premium(tier_id: u8, factor: u64, table: &TierTable) -> Result<u64, ClaimError> {
    let base = table
        .base_premium(tier_id)
        .ok_or(ClaimError::UnknownTier(tier_id))?;
    u64::try_from(base as u128 * factor as u128 / 100)
        .map_err(|_| ClaimError::PremiumOverflow { tier_id, factor })
}

/// `max(invoice_price - current_price, 0)`
pub fn price_drop(invoice_price: u64, current_price: u64) -> u64 {
    invoice_price.saturating_sub(current_price)
}

/// A claim is valid when the price actually dropped and the purchase predates
/// the policy.
pub fn valid_claim(
    invoice_price: u64,
    current_price: u64,
    invoice_date: u64,
    policy_start_date: u64,
) -> bool {
    invoice_price > current_price && invoice_date <= policy_start_date
}

/// The premium is valid when the selected tier matches the invoice price and
/// the paid amount matches the tier's premium under the purchase-time factor.
pub fn valid_premium(
    invoice_price: u64,
    selected_tier: u8,
    paid_premium: u64,
    factor_at_purchase: u64,
    table: &TierTable,
) -> Result<bool, ClaimError> {
    let classified = classify_tier(invoice_price, table)?;
    let expected = expected_premium(selected_tier, factor_at_purchase, table)?;
    Ok(classified == selected_tier && paid_premium == expected)
}

/// Evaluate the full claim: both predicates plus the payout.
pub fn evaluate_claim(inputs: &ClaimInputs, table: &TierTable) -> Result<ClaimOutcome, ClaimError> {
    let claim_ok = valid_claim(
        inputs.invoice_price,
        inputs.current_price,
        inputs.invoice_date,
        inputs.policy_start_date,
    );
    let premium_ok = valid_premium(
        inputs.invoice_price,
        inputs.selected_tier,
        inputs.paid_premium,
        inputs.factor_at_purchase,
        table,
    )?;
    let payout = if claim_ok && premium_ok {
        price_drop(inputs.invoice_price, inputs.current_price)
    } else {
        0
    };

    Ok(ClaimOutcome {
        valid_claim: claim_ok,
        valid_premium: premium_ok,
        payout,
    })
}
