use serde::{Deserialize, Serialize};

/// Immutable catalog entry, fixed at oracle startup.
///
/// Prices are non-negative integers in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable catalog identifier (hashed into the product's field identity).
    pub id: String,
    /// Human-readable name, never hashed.
    pub display_name: String,
    /// Price the oracle resets to on a forced rebuild.
    pub base_price: u64,
}

impl Product {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, base_price: u64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            base_price,
        }
    }
}
