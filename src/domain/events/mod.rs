//! Domain events
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Pricing(PricingEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Joined { order_id: Uuid, product_id: Uuid, user_id: Uuid, quantity: u32 },
    Confirmed { order_id: Uuid, product_id: Uuid, final_price: i64 },
    Cancelled { order_id: Uuid, product_id: Uuid, quantity: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PricingEvent {
    Repriced { product_id: Uuid, aggregate_quantity: u32, unit_price: i64, orders_updated: usize },
}

impl DomainEvent {
    /// Message-bus subject this event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Joined { .. }) => "groupbuy.order.joined",
            Self::Order(OrderEvent::Confirmed { .. }) => "groupbuy.order.confirmed",
            Self::Order(OrderEvent::Cancelled { .. }) => "groupbuy.order.cancelled",
            Self::Pricing(PricingEvent::Repriced { .. }) => "groupbuy.orders.repriced",
        }
    }
}
