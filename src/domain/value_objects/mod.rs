//! Value Objects for group buying

use serde::{Deserialize, Serialize};
use std::fmt;

/// One discount band: every aggregate quantity in `min..=max` earns `discount`.
///
/// `discount` is a fraction (0.05 = 5%).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min: u32,
    pub max: u32,
    pub discount: f64,
}

impl DiscountTier {
    pub fn new(min: u32, max: u32, discount: f64) -> Self { Self { min, max, discount } }

    /// Both bounds are inclusive.
    pub fn contains(&self, quantity: u32) -> bool { quantity >= self.min && quantity <= self.max }
}

/// Tiers ordered ascending by `min`.
///
/// The sort is stable, so tiers sharing a `min` keep their stored order.
pub fn sorted_tiers(tiers: &[DiscountTier]) -> Vec<DiscountTier> {
    let mut sorted = tiers.to_vec();
    sorted.sort_by_key(|t| t.min);
    sorted
}

/// Write-time view over a product's tiers.
///
/// The pricing functions accept any tier list; this is what product
/// create/update runs before anything is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct TierSchedule(Vec<DiscountTier>);

impl TierSchedule {
    pub fn new(tiers: Vec<DiscountTier>) -> Result<Self, TierError> {
        if tiers.is_empty() { return Err(TierError::Empty); }
        let sorted = sorted_tiers(&tiers);
        for (index, tier) in sorted.iter().enumerate() {
            if tier.min < 1 { return Err(TierError::MinBelowOne { index }); }
            if tier.max < tier.min { return Err(TierError::Inverted { index, min: tier.min, max: tier.max }); }
            if !(0.0..=1.0).contains(&tier.discount) { return Err(TierError::RateOutOfRange { index, discount: tier.discount }); }
            if let Some(prev) = index.checked_sub(1).map(|i| sorted[i]) {
                if tier.min <= prev.max { return Err(TierError::Overlap { at: tier.min }); }
                if tier.min > prev.max + 1 { return Err(TierError::Gap { from: prev.max + 1, to: tier.min - 1 }); }
            }
        }
        Ok(Self(sorted))
    }

    pub fn tiers(&self) -> &[DiscountTier] { &self.0 }
    pub fn into_inner(self) -> Vec<DiscountTier> { self.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TierError {
    Empty,
    MinBelowOne { index: usize },
    Inverted { index: usize, min: u32, max: u32 },
    RateOutOfRange { index: usize, discount: f64 },
    Overlap { at: u32 },
    Gap { from: u32, to: u32 },
}

impl std::error::Error for TierError {}
impl fmt::Display for TierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "at least one discount tier is required"),
            Self::MinBelowOne { index } => write!(f, "tier {index}: min must be at least 1"),
            Self::Inverted { index, min, max } => write!(f, "tier {index}: max {max} is below min {min}"),
            Self::RateOutOfRange { index, discount } => write!(f, "tier {index}: discount {discount} is outside 0..=1"),
            Self::Overlap { at } => write!(f, "tiers overlap at quantity {at}"),
            Self::Gap { from, to } => write!(f, "no tier covers quantities {from}..={to}"),
        }
    }
}

/// Shipping destination kept on the user profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient_name: String,
    pub phone_number: String,
    pub postal_code: String,
    pub address: String,
    pub detail_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_memo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let t = DiscountTier::new(6, 10, 0.1);
        assert!(t.contains(6));
        assert!(t.contains(10));
        assert!(!t.contains(5));
        assert!(!t.contains(11));
    }

    #[test]
    fn test_sort_is_stable_on_equal_min() {
        let tiers = vec![DiscountTier::new(6, 10, 0.1), DiscountTier::new(1, 5, 0.05), DiscountTier::new(1, 3, 0.2)];
        let sorted = sorted_tiers(&tiers);
        assert_eq!(sorted[0], DiscountTier::new(1, 5, 0.05));
        assert_eq!(sorted[1], DiscountTier::new(1, 3, 0.2));
        assert_eq!(sorted[2].min, 6);
    }

    #[test]
    fn test_schedule_accepts_contiguous_tiers_in_any_order() {
        let s = TierSchedule::new(vec![DiscountTier::new(6, 10, 0.1), DiscountTier::new(1, 5, 0.05)]).unwrap();
        assert_eq!(s.tiers()[0].min, 1);
        assert_eq!(s.tiers()[1].min, 6);
    }

    #[test]
    fn test_schedule_rejects_malformed_tiers() {
        assert_eq!(TierSchedule::new(vec![]), Err(TierError::Empty));
        assert!(matches!(TierSchedule::new(vec![DiscountTier::new(0, 5, 0.05)]), Err(TierError::MinBelowOne { .. })));
        assert!(matches!(TierSchedule::new(vec![DiscountTier::new(5, 1, 0.05)]), Err(TierError::Inverted { .. })));
        assert!(matches!(TierSchedule::new(vec![DiscountTier::new(1, 5, 1.5)]), Err(TierError::RateOutOfRange { .. })));
        assert_eq!(
            TierSchedule::new(vec![DiscountTier::new(1, 5, 0.05), DiscountTier::new(5, 9, 0.1)]),
            Err(TierError::Overlap { at: 5 })
        );
        assert_eq!(
            TierSchedule::new(vec![DiscountTier::new(1, 5, 0.05), DiscountTier::new(8, 9, 0.1)]),
            Err(TierError::Gap { from: 6, to: 7 })
        );
    }
}
