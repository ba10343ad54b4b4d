//! Product Aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::domain::pricing;
use crate::domain::value_objects::{DiscountTier, TierError, TierSchedule};

/// Upper bound on `base_price`. Keeps `unit price * quantity` within `i64`
/// for any `u32` quantity.
pub const MAX_BASE_PRICE: i64 = 1_000_000_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub base_price: i64,
    pub discount_tiers: Vec<DiscountTier>,
    /// Units committed across all non-cancelled orders.
    pub current_quantity: u32,
    pub current_participants: u32,
    pub status: ProductStatus,
    pub created_by: Uuid,
    pub image_urls: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub product_info_template_id: Option<Uuid>,
    pub product_info_data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { #[default] Active, Completed, Cancelled }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Completed => "completed", Self::Cancelled => "cancelled" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s { "active" => Some(Self::Active), "completed" => Some(Self::Completed), "cancelled" => Some(Self::Cancelled), _ => None }
    }
}

/// Where `now` falls relative to a product's purchase window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowPhase { Upcoming, Active, Ended }

/// Fields an administrator supplies when listing a product.
#[derive(Clone, Debug, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub base_price: i64,
    pub discount_tiers: Vec<DiscountTier>,
    pub image_urls: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub product_info_template_id: Option<Uuid>,
    pub product_info_data: BTreeMap<String, String>,
}

impl Product {
    pub fn create(draft: ProductDraft, created_by: Uuid) -> Result<Self, ProductError> {
        let tiers = Self::check(&draft)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), name: draft.name.trim().to_string(), description: draft.description,
            base_price: draft.base_price, discount_tiers: tiers, current_quantity: 0, current_participants: 0,
            status: ProductStatus::Active, created_by, image_urls: draft.image_urls,
            start_date: draft.start_date, end_date: draft.end_date,
            product_info_template_id: draft.product_info_template_id, product_info_data: draft.product_info_data,
            created_at: now, updated_at: now,
        })
    }

    /// Replaces the editable fields. Aggregates and status are untouched.
    ///
    /// Returns `true` when the change affects pricing (base price or tiers).
    pub fn revise(&mut self, draft: ProductDraft) -> Result<bool, ProductError> {
        let tiers = Self::check(&draft)?;
        let repriced = self.base_price != draft.base_price || self.discount_tiers != tiers;
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.base_price = draft.base_price;
        self.discount_tiers = tiers;
        self.image_urls = draft.image_urls;
        self.start_date = draft.start_date;
        self.end_date = draft.end_date;
        self.product_info_template_id = draft.product_info_template_id;
        self.product_info_data = draft.product_info_data;
        self.touch();
        Ok(repriced)
    }

    fn check(draft: &ProductDraft) -> Result<Vec<DiscountTier>, ProductError> {
        if draft.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if !(1..=MAX_BASE_PRICE).contains(&draft.base_price) { return Err(ProductError::PriceOutOfRange(draft.base_price)); }
        if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
            if end <= start { return Err(ProductError::InvalidWindow); }
        }
        Ok(TierSchedule::new(draft.discount_tiers.clone()).map_err(ProductError::Tiers)?.into_inner())
    }

    pub fn set_status(&mut self, status: ProductStatus) { self.status = status; self.touch(); }
    pub fn is_open(&self) -> bool { self.status == ProductStatus::Active }

    pub fn discount_rate(&self) -> f64 { pricing::rate_for(self.current_quantity, &self.discount_tiers) }
    pub fn unit_price(&self) -> i64 { pricing::final_price(self.base_price, self.current_quantity, &self.discount_tiers) }

    pub fn phase(&self, now: DateTime<Utc>) -> WindowPhase {
        match (self.start_date, self.end_date) {
            (Some(start), _) if now < start => WindowPhase::Upcoming,
            (_, Some(end)) if now > end => WindowPhase::Ended,
            _ => WindowPhase::Active,
        }
    }

    pub fn is_within_period(&self, now: DateTime<Utc>) -> bool { self.phase(now) == WindowPhase::Active }
    pub fn is_before_start(&self, now: DateTime<Utc>) -> bool { self.start_date.is_some_and(|s| now < s) }
    pub fn is_after_end(&self, now: DateTime<Utc>) -> bool { self.end_date.is_some_and(|e| now > e) }

    pub fn time_until_start(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.start_date.filter(|s| now < *s).map(|s| s - now)
    }

    pub fn time_until_end(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.end_date.filter(|e| now < *e).map(|e| e - now)
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Compact remaining-time label: `"2d 3h"`, `"3h 20m"` or `"15m"`.
pub fn format_remaining(remaining: Duration) -> String {
    let (days, hours, minutes) = (remaining.num_days(), remaining.num_hours() % 24, remaining.num_minutes() % 60);
    if days > 0 { format!("{days}d {hours}h") }
    else if hours > 0 { format!("{hours}h {minutes}m") }
    else { format!("{minutes}m") }
}

#[derive(Debug, Clone, PartialEq)] pub enum ProductError { MissingName, PriceOutOfRange(i64), InvalidWindow, Tiers(TierError) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Missing name"),
            Self::PriceOutOfRange(p) => write!(f, "Base price must be between 1 and {MAX_BASE_PRICE}, got {p}"),
            Self::InvalidWindow => write!(f, "End date must be after start date"),
            Self::Tiers(e) => write!(f, "Invalid discount tiers: {e}"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_draft() -> ProductDraft {
    ProductDraft {
        name: "Dried pollack strips".into(),
        description: "1kg pack".into(),
        base_price: 10000,
        discount_tiers: vec![DiscountTier::new(1, 5, 0.05), DiscountTier::new(6, 10, 0.10)],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Order;

    #[test]
    fn test_product_create() {
        let p = Product::create(sample_draft(), Uuid::now_v7()).unwrap();
        assert_eq!(p.status, ProductStatus::Active);
        assert_eq!(p.current_quantity, 0);
        assert_eq!(p.unit_price(), 10000);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let mut d = sample_draft();
        d.name = "  ".into();
        assert_eq!(Product::create(d, Uuid::nil()).unwrap_err(), ProductError::MissingName);
        let mut d = sample_draft();
        d.base_price = 0;
        assert_eq!(Product::create(d, Uuid::nil()).unwrap_err(), ProductError::PriceOutOfRange(0));
        let mut d = sample_draft();
        d.base_price = MAX_BASE_PRICE + 1;
        assert_eq!(Product::create(d, Uuid::nil()).unwrap_err(), ProductError::PriceOutOfRange(MAX_BASE_PRICE + 1));
        let mut d = sample_draft();
        d.base_price = MAX_BASE_PRICE;
        let p = Product::create(d, Uuid::nil()).unwrap();
        assert!(Order::place(p.id, Uuid::nil(), u32::MAX, 1, p.base_price).is_ok());
        let mut d = sample_draft();
        d.discount_tiers.push(DiscountTier::new(20, 30, 0.2));
        assert!(matches!(Product::create(d, Uuid::nil()), Err(ProductError::Tiers(TierError::Gap { .. }))));
    }

    #[test]
    fn test_revise_reports_price_changes() {
        let mut p = Product::create(sample_draft(), Uuid::nil()).unwrap();
        let mut d = sample_draft();
        d.description = "500g pack".into();
        assert!(!p.revise(d).unwrap());
        let mut d = sample_draft();
        d.base_price = 12000;
        assert!(p.revise(d).unwrap());
        assert_eq!(p.base_price, 12000);
    }

    #[test]
    fn test_window_phases() {
        let now = Utc::now();
        let mut p = Product::create(sample_draft(), Uuid::nil()).unwrap();
        assert_eq!(p.phase(now), WindowPhase::Active);
        p.start_date = Some(now + Duration::hours(2));
        assert_eq!(p.phase(now), WindowPhase::Upcoming);
        assert!(p.is_before_start(now));
        assert_eq!(p.time_until_start(now), Some(Duration::hours(2)));
        p.start_date = Some(now - Duration::days(1));
        p.end_date = Some(now - Duration::minutes(1));
        assert_eq!(p.phase(now), WindowPhase::Ended);
        assert!(p.is_after_end(now));
        assert_eq!(p.time_until_end(now), None);
        p.end_date = Some(now + Duration::days(3));
        assert!(p.is_within_period(now));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::days(2) + Duration::hours(3) + Duration::minutes(5)), "2d 3h");
        assert_eq!(format_remaining(Duration::hours(3) + Duration::minutes(20)), "3h 20m");
        assert_eq!(format_remaining(Duration::minutes(15)), "15m");
    }
}
