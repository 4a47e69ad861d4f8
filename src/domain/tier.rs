use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TierTableError {
    #[error("tier table has no bands")]
    Empty,

    #[error("first band starts at {0}, must start at 0")]
    FirstBandNotZero(u64),

    #[error("band {index} breaks contiguity: starts at {found}, expected {expected}")]
    Discontinuous {
        index: usize,
        expected: u64,
        found: u64,
    },

    #[error("band {index} is unbounded but is not the last band")]
    UnboundedInterior { index: usize },

    #[error("band {index} is empty: [{min}, {max}) contains no prices")]
    EmptyBand { index: usize, min: u64, max: u64 },

    #[error("duplicate tier id {0}")]
    DuplicateTierId(u8),
}

/// One premium-pricing bracket.
///
/// The band covers the half-open price range `[min_price, max_price)`;
/// `max_price = None` means the band is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBand {
    pub tier_id: u8,
    pub min_price: u64,
    pub max_price: Option<u64>,
    pub base_premium: u64,
}

/// Ordered list of disjoint, contiguous price bands.
///
/// Boundary resolution: ranges are half-open `[min, max)`, so a boundary
/// price belongs to the tier whose range *starts* at it. Construction
/// enforces that bands begin at 0, are contiguous and non-overlapping, and
/// that only the final band may be open-ended — together this makes
/// classification exhaustive over the legal price domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    bands: Vec<TierBand>,
}

impl TierTable {
    pub fn new(bands: Vec<TierBand>) -> Result<Self, TierTableError> {
        if bands.is_empty() {
            return Err(TierTableError::Empty);
        }
        if bands[0].min_price != 0 {
            return Err(TierTableError::FirstBandNotZero(bands[0].min_price));
        }

        let mut seen = std::collections::HashSet::new();
        let mut expected_min = 0u64;
        let last = bands.len() - 1;
        for (index, band) in bands.iter().enumerate() {
            if !seen.insert(band.tier_id) {
                return Err(TierTableError::DuplicateTierId(band.tier_id));
            }
            if band.min_price != expected_min {
                return Err(TierTableError::Discontinuous {
                    index,
                    expected: expected_min,
                    found: band.min_price,
                });
            }
            match band.max_price {
                Some(max) => {
                    if max <= band.min_price {
                        return Err(TierTableError::EmptyBand {
                            index,
                            min: band.min_price,
                            max,
                        });
                    }
                    expected_min = max;
                }
                None => {
                    if index != last {
                        return Err(TierTableError::UnboundedInterior { index });
                    }
                }
            }
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    /// The unique band containing `price`, or `None` if the table is bounded
    /// and `price` lies beyond its last band.
    pub fn band_for(&self, price: u64) -> Option<&TierBand> {
        self.bands.iter().find(|b| {
            price >= b.min_price && b.max_price.map_or(true, |max| price < max)
        })
    }

    pub fn base_premium(&self, tier_id: u8) -> Option<u64> {
        self.bands
            .iter()
            .find(|b| b.tier_id == tier_id)
            .map(|b| b.base_premium)
    }
}
