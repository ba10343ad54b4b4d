//! Tiered participation discounts
//!
//! A product's unit price depends only on its aggregate committed quantity and
//! its discount tiers. Everything here is pure: no I/O, no validation. A
//! quantity outside every tier is not an error, it simply earns no discount.

use crate::domain::value_objects::{sorted_tiers, DiscountTier};

/// Discount fraction earned at `quantity`, or `0.0` when no tier contains it.
///
/// Tiers are scanned ascending by `min`; the first containing tier wins.
pub fn rate_for(quantity: u32, tiers: &[DiscountTier]) -> f64 {
    sorted_tiers(tiers)
        .iter()
        .find(|t| t.contains(quantity))
        .map(|t| t.discount)
        .unwrap_or(0.0)
}

/// Discounted unit price, truncated toward negative infinity.
///
/// Evaluated as `floor(base - base * rate)` in double precision, in that exact
/// order, so prices match what buyers were previously quoted to the unit.
/// Callers must pass a positive `base_price`.
pub fn final_price(base_price: i64, quantity: u32, tiers: &[DiscountTier]) -> i64 {
    let base = base_price as f64;
    let discount_amount = base * rate_for(quantity, tiers);
    (base - discount_amount).floor() as i64
}

/// Units still needed to reach the next tier.
///
/// `None` when `quantity` already sits in the highest tier, or sits in no tier
/// at all (below the first tier or inside a gap).
pub fn units_until_next_tier(quantity: u32, tiers: &[DiscountTier]) -> Option<u32> {
    let sorted = sorted_tiers(tiers);
    let current = sorted.iter().position(|t| t.contains(quantity))?;
    sorted.get(current + 1).map(|next| next.min.saturating_sub(quantity))
}

/// Whole-percent label, e.g. `0.05` -> `"5%"`. Half percents round up.
pub fn format_discount_rate(rate: f64) -> String {
    format!("{}%", (rate * 100.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers() -> Vec<DiscountTier> {
        vec![DiscountTier::new(1, 5, 0.05), DiscountTier::new(6, 10, 0.10)]
    }

    #[test]
    fn test_reference_prices() {
        let t = tiers();
        assert_eq!(final_price(10000, 3, &t), 9500);
        assert_eq!(final_price(10000, 7, &t), 9000);
        assert_eq!(final_price(10000, 0, &t), 10000);
        assert_eq!(units_until_next_tier(3, &t), Some(3));
        assert_eq!(units_until_next_tier(8, &t), None);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let t = tiers();
        assert_eq!(rate_for(1, &t), 0.05);
        assert_eq!(rate_for(5, &t), 0.05);
        assert_eq!(rate_for(6, &t), 0.10);
        assert_eq!(rate_for(10, &t), 0.10);
        assert_eq!(rate_for(11, &t), 0.0);
    }

    #[test]
    fn test_unsorted_input_is_sorted_before_lookup() {
        let t = vec![DiscountTier::new(6, 10, 0.10), DiscountTier::new(1, 5, 0.05)];
        assert_eq!(rate_for(4, &t), 0.05);
        assert_eq!(units_until_next_tier(4, &t), Some(2));
    }

    #[test]
    fn test_overlapping_tiers_pick_lowest_min() {
        let t = vec![DiscountTier::new(3, 10, 0.2), DiscountTier::new(1, 5, 0.05)];
        assert_eq!(rate_for(4, &t), 0.05);
    }

    #[test]
    fn test_gap_yields_no_discount() {
        let t = vec![DiscountTier::new(1, 5, 0.05), DiscountTier::new(10, 20, 0.2)];
        assert_eq!(rate_for(7, &t), 0.0);
        assert_eq!(final_price(5000, 7, &t), 5000);
        assert_eq!(units_until_next_tier(7, &t), None);
        assert_eq!(units_until_next_tier(0, &t), None);
    }

    #[test]
    fn test_price_is_truncated_not_rounded() {
        let t = tiers();
        // 9999 - 499.95 = 9499.05
        assert_eq!(final_price(9999, 2, &t), 9499);
        // 1001 - 100.1 = 900.9
        assert_eq!(final_price(1001, 8, &t), 900);
    }

    #[test]
    fn test_rate_is_zero_or_a_tier_discount() {
        let t = vec![DiscountTier::new(2, 4, 0.03), DiscountTier::new(5, 9, 0.07), DiscountTier::new(12, 15, 0.15)];
        for q in 0..20 {
            let rate = rate_for(q, &t);
            assert!(rate == 0.0 || t.iter().any(|tier| tier.discount == rate), "q={q} rate={rate}");
            let price = final_price(20000, q, &t);
            assert!(price <= 20000);
            if rate == 0.0 { assert_eq!(price, 20000); }
            assert_eq!(price, final_price(20000, q, &t));
        }
    }

    #[test]
    fn test_contiguous_tiers_match_exactly_one() {
        let t = vec![DiscountTier::new(1, 3, 0.01), DiscountTier::new(4, 8, 0.02), DiscountTier::new(9, 30, 0.03)];
        for q in 1..=30 {
            let containing: Vec<_> = t.iter().filter(|tier| tier.contains(q)).collect();
            assert_eq!(containing.len(), 1);
            assert_eq!(rate_for(q, &t), containing[0].discount);
        }
    }

    #[test]
    fn test_format_discount_rate() {
        assert_eq!(format_discount_rate(0.05), "5%");
        assert_eq!(format_discount_rate(0.1), "10%");
        assert_eq!(format_discount_rate(0.0), "0%");
        assert_eq!(format_discount_rate(0.005), "1%");
        assert_eq!(format_discount_rate(0.025), "3%");
        assert_eq!(format_discount_rate(0.125), "13%");
        assert_eq!(format_discount_rate(1.0), "100%");
    }
}
