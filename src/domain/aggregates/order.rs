//! Order Aggregate
//!
//! One order is one buyer's participation in one product's group purchase.
//! While `Pending` its price tracks the product's aggregate quantity; once it
//! leaves `Pending` the price is fixed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: u32,
    /// Participants on the product right after this order joined.
    pub participant_count: u32,
    /// Unit price after discount.
    pub final_price: i64,
    pub total_price: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Confirmed, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Confirmed => "confirmed", Self::Cancelled => "cancelled" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s { "pending" => Some(Self::Pending), "confirmed" => Some(Self::Confirmed), "cancelled" => Some(Self::Cancelled), _ => None }
    }
}

impl Order {
    pub fn place(product_id: Uuid, user_id: Uuid, quantity: u32, participant_count: u32, unit_price: i64) -> Result<Self, OrderError> {
        if quantity == 0 { return Err(OrderError::InvalidQuantity); }
        let total_price = unit_price.checked_mul(i64::from(quantity)).ok_or(OrderError::TotalOverflow)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), product_id, user_id, quantity, participant_count,
            final_price: unit_price, total_price,
            status: OrderStatus::Pending, created_at: now, updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool { self.status == OrderStatus::Pending }

    /// Price this order would carry at `unit_price`, or `None` if already there.
    ///
    /// Unit prices never exceed the product's bounded base price, so the total
    /// saturates only for records written outside the services.
    pub fn reprice(&self, unit_price: i64) -> Option<PriceUpdate> {
        let total_price = unit_price.saturating_mul(i64::from(self.quantity));
        (self.final_price != unit_price || self.total_price != total_price)
            .then_some(PriceUpdate { order_id: self.id, final_price: unit_price, total_price })
    }

    pub fn confirm(&mut self) -> Result<DomainEvent, OrderError> {
        self.leave_pending(OrderStatus::Confirmed)?;
        Ok(DomainEvent::Order(OrderEvent::Confirmed { order_id: self.id, product_id: self.product_id, final_price: self.final_price }))
    }

    pub fn cancel(&mut self) -> Result<DomainEvent, OrderError> {
        self.leave_pending(OrderStatus::Cancelled)?;
        Ok(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, product_id: self.product_id, quantity: self.quantity }))
    }

    fn leave_pending(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if self.status != OrderStatus::Pending { return Err(OrderError::NotPending(self.status)); }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A staged price change for one pending order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub order_id: Uuid,
    pub final_price: i64,
    pub total_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { InvalidQuantity, TotalOverflow, NotPending(OrderStatus) }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuantity => write!(f, "Quantity must be at least 1"),
            Self::TotalOverflow => write!(f, "Order total is too large"),
            Self::NotPending(s) => write!(f, "Order is {} and can no longer change", s.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place(Uuid::now_v7(), Uuid::now_v7(), 3, 1, 9500).unwrap();
        assert_eq!(order.total_price, 28500);
        assert!(order.is_pending());
        order.confirm().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.cancel().unwrap_err(), OrderError::NotPending(OrderStatus::Confirmed));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert_eq!(Order::place(Uuid::nil(), Uuid::nil(), 0, 1, 100).unwrap_err(), OrderError::InvalidQuantity);
    }

    #[test]
    fn test_total_overflow_rejected() {
        assert_eq!(Order::place(Uuid::nil(), Uuid::nil(), u32::MAX, 1, i64::MAX / 2).unwrap_err(), OrderError::TotalOverflow);
        let order = Order::place(Uuid::nil(), Uuid::nil(), 4, 1, 100).unwrap();
        assert_eq!(order.reprice(i64::MAX / 2).map(|u| u.total_price), Some(i64::MAX));
    }

    #[test]
    fn test_reprice_only_when_changed() {
        let order = Order::place(Uuid::nil(), Uuid::nil(), 2, 1, 9500).unwrap();
        assert_eq!(order.reprice(9500), None);
        let update = order.reprice(9000).unwrap();
        assert_eq!(update.final_price, 9000);
        assert_eq!(update.total_price, 18000);
    }

    #[test]
    fn test_reprice_catches_stale_total() {
        let mut order = Order::place(Uuid::nil(), Uuid::nil(), 2, 1, 9500).unwrap();
        order.total_price = 9500;
        assert_eq!(order.reprice(9500).map(|u| u.total_price), Some(19000));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
        assert_eq!(OrderStatus::parse("pending"), Some(OrderStatus::Pending));
        assert_eq!(OrderStatus::parse("shipped"), None);
    }
}
