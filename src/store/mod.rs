//! Document-store abstraction
//!
//! The services only need equality filters and one atomic multi-record write
//! (the price batch), so the seams are narrow per-collection traits.
//! [`memory::MemoryStore`] backs tests and local runs, [`postgres::PgStore`]
//! backs deployments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus, PriceUpdate, Product, ProductInfoTemplate, ProductStatus, SiteSettings, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} record {id} does not exist")]
    Missing { collection: &'static str, id: Uuid },

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Equality filter over orders. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub product_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn pending_for_product(product_id: Uuid) -> Self {
        Self { product_id: Some(product_id), status: Some(OrderStatus::Pending), ..Default::default() }
    }

    pub fn pending_for_user(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id), status: Some(OrderStatus::Pending), ..Default::default() }
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.product_id.map_or(true, |p| p == order.product_id)
            && self.user_id.map_or(true, |u| u == order.user_id)
            && self.status.map_or(true, |s| s == order.status)
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn products(&self, status: Option<ProductStatus>) -> StoreResult<Vec<Product>>;
    /// Overwrites editable fields and status; aggregates are left as stored.
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;
    /// Atomically adds the deltas to the aggregate counters and returns the
    /// product as it stands after the write. Counters never go below zero.
    async fn adjust_participation(&self, id: Uuid, quantity_delta: i64, participants_delta: i64) -> StoreResult<Option<Product>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    /// Compare-and-set on status. `false` when the stored status is not `from`.
    async fn transition_order(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool>;
    /// Applies every update or none of them.
    async fn commit_price_updates(&self, updates: &[PriceUpdate]) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn users(&self) -> StoreResult<Vec<User>>;
    async fn update_user(&self, user: &User) -> StoreResult<bool>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_template(&self, template: &ProductInfoTemplate) -> StoreResult<()>;
    async fn template(&self, id: Uuid) -> StoreResult<Option<ProductInfoTemplate>>;
    async fn templates(&self) -> StoreResult<Vec<ProductInfoTemplate>>;
    async fn update_template(&self, template: &ProductInfoTemplate) -> StoreResult<bool>;
    async fn delete_template(&self, id: Uuid) -> StoreResult<bool>;
    async fn site_settings(&self) -> StoreResult<Option<SiteSettings>>;
    async fn save_site_settings(&self, settings: &SiteSettings) -> StoreResult<()>;
}

/// Everything the service needs from one backend.
pub trait Store: ProductStore + OrderStore + UserStore + CatalogStore {}
impl<T: ProductStore + OrderStore + UserStore + CatalogStore> Store for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_on_set_fields_only() {
        let order = Order::place(Uuid::now_v7(), Uuid::now_v7(), 1, 1, 100).unwrap();
        assert!(OrderFilter::default().matches(&order));
        assert!(OrderFilter::pending_for_product(order.product_id).matches(&order));
        assert!(!OrderFilter::pending_for_product(Uuid::now_v7()).matches(&order));
        let by_user = OrderFilter { user_id: Some(order.user_id), status: Some(OrderStatus::Cancelled), ..Default::default() };
        assert!(!by_user.matches(&order));
    }
}
