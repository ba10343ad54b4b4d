//! In-process store
//!
//! Every collection sits behind one `RwLock`, so each trait call, including a
//! price batch, is applied under a single write guard.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus, PriceUpdate, Product, ProductInfoTemplate, ProductStatus, SiteSettings, User};
use super::{CatalogStore, OrderFilter, OrderStore, ProductStore, StoreError, StoreResult, UserStore};

#[derive(Default)]
struct Collections {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    users: HashMap<Uuid, User>,
    templates: HashMap<Uuid, ProductInfoTemplate>,
    settings: Option<SiteSettings>,
}

#[derive(Default)]
pub struct MemoryStore { inner: RwLock<Collections> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn by_created<T>(mut rows: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    rows.sort_by_key(|r| std::cmp::Reverse(created(r)));
    rows
}

fn apply_delta(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if db.products.contains_key(&product.id) { return Err(StoreError::Duplicate(format!("product {}", product.id))); }
        db.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn products(&self, status: Option<ProductStatus>) -> StoreResult<Vec<Product>> {
        let db = self.inner.read().await;
        let rows: Vec<_> = db.products.values().filter(|p| status.map_or(true, |s| p.status == s)).cloned().collect();
        Ok(by_created(rows, |p: &Product| p.created_at))
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        let Some(stored) = db.products.get_mut(&product.id) else { return Ok(false) };
        let (quantity, participants) = (stored.current_quantity, stored.current_participants);
        *stored = Product { current_quantity: quantity, current_participants: participants, ..product.clone() };
        Ok(true)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.products.remove(&id).is_some())
    }

    async fn adjust_participation(&self, id: Uuid, quantity_delta: i64, participants_delta: i64) -> StoreResult<Option<Product>> {
        let mut db = self.inner.write().await;
        Ok(db.products.get_mut(&id).map(|p| {
            p.current_quantity = apply_delta(p.current_quantity, quantity_delta);
            p.current_participants = apply_delta(p.current_participants, participants_delta);
            p.updated_at = chrono::Utc::now();
            p.clone()
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if db.orders.contains_key(&order.id) { return Err(StoreError::Duplicate(format!("order {}", order.id))); }
        db.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let db = self.inner.read().await;
        let rows: Vec<_> = db.orders.values().filter(|o| filter.matches(o)).cloned().collect();
        Ok(by_created(rows, |o: &Order| o.created_at))
    }

    async fn transition_order(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        match db.orders.get_mut(&id) {
            Some(o) if o.status == from => {
                o.status = to;
                o.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit_price_updates(&self, updates: &[PriceUpdate]) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if let Some(missing) = updates.iter().find(|u| !db.orders.contains_key(&u.order_id)) {
            return Err(StoreError::Missing { collection: "orders", id: missing.order_id });
        }
        let now = chrono::Utc::now();
        for update in updates {
            if let Some(o) = db.orders.get_mut(&update.order_id) {
                o.final_price = update.final_price;
                o.total_price = update.total_price;
                o.updated_at = now;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut db = self.inner.write().await;
        if db.users.values().any(|u| u.id == user.id || u.email == user.email) {
            return Err(StoreError::Duplicate(format!("user {}", user.email)));
        }
        db.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.inner.read().await.users.values().find(|u| u.email == email).cloned())
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<_> = self.inner.read().await.users.values().cloned().collect();
        Ok(by_created(rows, |u: &User| u.created_at))
    }

    async fn update_user(&self, user: &User) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        Ok(db.users.get_mut(&user.id).map(|stored| *stored = user.clone()).is_some())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_template(&self, template: &ProductInfoTemplate) -> StoreResult<()> {
        self.inner.write().await.templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn template(&self, id: Uuid) -> StoreResult<Option<ProductInfoTemplate>> {
        Ok(self.inner.read().await.templates.get(&id).cloned())
    }

    async fn templates(&self) -> StoreResult<Vec<ProductInfoTemplate>> {
        let rows: Vec<_> = self.inner.read().await.templates.values().cloned().collect();
        Ok(by_created(rows, |t: &ProductInfoTemplate| t.created_at))
    }

    async fn update_template(&self, template: &ProductInfoTemplate) -> StoreResult<bool> {
        let mut db = self.inner.write().await;
        Ok(db.templates.get_mut(&template.id).map(|stored| *stored = template.clone()).is_some())
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.inner.write().await.templates.remove(&id).is_some())
    }

    async fn site_settings(&self) -> StoreResult<Option<SiteSettings>> {
        Ok(self.inner.read().await.settings.clone())
    }

    async fn save_site_settings(&self, settings: &SiteSettings) -> StoreResult<()> {
        self.inner.write().await.settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample_draft;

    #[tokio::test]
    async fn test_price_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let order = Order::place(Uuid::now_v7(), Uuid::now_v7(), 2, 1, 9500).unwrap();
        store.insert_order(&order).await.unwrap();
        let updates = [
            PriceUpdate { order_id: order.id, final_price: 9000, total_price: 18000 },
            PriceUpdate { order_id: Uuid::now_v7(), final_price: 9000, total_price: 9000 },
        ];
        let err = store.commit_price_updates(&updates).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { collection: "orders", .. }));
        assert_eq!(store.order(order.id).await.unwrap().unwrap().final_price, 9500);

        store.commit_price_updates(&updates[..1]).await.unwrap();
        let stored = store.order(order.id).await.unwrap().unwrap();
        assert_eq!((stored.final_price, stored.total_price), (9000, 18000));
    }

    #[tokio::test]
    async fn test_adjust_participation_clamps_at_zero() {
        let store = MemoryStore::new();
        let product = Product::create(sample_draft(), Uuid::nil()).unwrap();
        store.insert_product(&product).await.unwrap();
        let p = store.adjust_participation(product.id, 4, 1).await.unwrap().unwrap();
        assert_eq!((p.current_quantity, p.current_participants), (4, 1));
        let p = store.adjust_participation(product.id, -9, -3).await.unwrap().unwrap();
        assert_eq!((p.current_quantity, p.current_participants), (0, 0));
        assert!(store.adjust_participation(Uuid::now_v7(), 1, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_product_keeps_aggregates() {
        let store = MemoryStore::new();
        let mut product = Product::create(sample_draft(), Uuid::nil()).unwrap();
        store.insert_product(&product).await.unwrap();
        store.adjust_participation(product.id, 3, 1).await.unwrap();
        product.name = "Renamed".into();
        assert!(store.update_product(&product).await.unwrap());
        let stored = store.product(product.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.current_quantity, 3);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let order = Order::place(Uuid::now_v7(), Uuid::now_v7(), 1, 1, 100).unwrap();
        store.insert_order(&order).await.unwrap();
        assert!(store.transition_order(order.id, OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap());
        assert!(!store.transition_order(order.id, OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&User::register("a@b.c", "A", Default::default())).await.unwrap();
        let err = store.insert_user(&User::register("A@B.C", "A2", Default::default())).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.user_by_email("A@b.c").await.unwrap().is_some());
    }
}
