//! PostgreSQL store
//!
//! Tiers, template fields and addresses are JSONB documents; the price batch
//! runs inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, types::Json, FromRow};
use std::collections::BTreeMap;
use uuid::Uuid;
use crate::domain::aggregates::{
    AccountStatus, AuthProvider, Order, OrderStatus, PriceUpdate, Product, ProductInfoField, ProductInfoTemplate, ProductStatus,
    Role, SiteSettings, User,
};
use crate::domain::value_objects::{DiscountTier, ShippingAddress};
use super::{CatalogStore, OrderFilter, OrderStore, ProductStore, StoreError, StoreResult, UserStore};

const SETTINGS_KEY: &str = "main";

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
    pub fn pool(&self) -> &PgPool { &self.pool }
}

fn count(column: &str, value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} = {value}")))
}

fn parsed<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> StoreResult<T> {
    parse(value).ok_or_else(|| StoreError::Corrupt(format!("{column} = {value:?}")))
}

fn unique_violation(e: sqlx::Error, what: String) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(e),
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid, name: String, description: String, base_price: i64, discount_tiers: Json<Vec<DiscountTier>>,
    current_quantity: i64, current_participants: i64, status: String, created_by: Uuid, image_urls: Vec<String>,
    start_date: Option<DateTime<Utc>>, end_date: Option<DateTime<Utc>>, product_info_template_id: Option<Uuid>,
    product_info_data: Json<BTreeMap<String, String>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(r: ProductRow) -> StoreResult<Self> {
        Ok(Product {
            id: r.id, name: r.name, description: r.description, base_price: r.base_price, discount_tiers: r.discount_tiers.0,
            current_quantity: count("current_quantity", r.current_quantity)?,
            current_participants: count("current_participants", r.current_participants)?,
            status: parsed("products.status", &r.status, ProductStatus::parse)?, created_by: r.created_by, image_urls: r.image_urls,
            start_date: r.start_date, end_date: r.end_date, product_info_template_id: r.product_info_template_id,
            product_info_data: r.product_info_data.0, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid, product_id: Uuid, user_id: Uuid, quantity: i64, participant_count: i64, final_price: i64, total_price: i64,
    status: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> StoreResult<Self> {
        Ok(Order {
            id: r.id, product_id: r.product_id, user_id: r.user_id, quantity: count("quantity", r.quantity)?,
            participant_count: count("participant_count", r.participant_count)?, final_price: r.final_price,
            total_price: r.total_price, status: parsed("orders.status", &r.status, OrderStatus::parse)?,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid, email: String, display_name: String, provider: String, role: String, status: String,
    blocked_until: Option<DateTime<Utc>>, blocked_reason: Option<String>, blocked_by: Option<Uuid>, phone_number: Option<String>,
    shipping_address: Option<Json<ShippingAddress>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;
    fn try_from(r: UserRow) -> StoreResult<Self> {
        Ok(User {
            id: r.id, email: r.email, display_name: r.display_name,
            provider: parsed("users.provider", &r.provider, AuthProvider::parse)?,
            role: parsed("users.role", &r.role, Role::parse)?,
            status: parsed("users.status", &r.status, AccountStatus::parse)?,
            blocked_until: r.blocked_until, blocked_reason: r.blocked_reason, blocked_by: r.blocked_by,
            phone_number: r.phone_number, shipping_address: r.shipping_address.map(|a| a.0),
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct TemplateRow { id: Uuid, name: String, fields: Json<Vec<ProductInfoField>>, created_by: Uuid, created_at: DateTime<Utc> }

impl From<TemplateRow> for ProductInfoTemplate {
    fn from(r: TemplateRow) -> Self {
        Self { id: r.id, name: r.name, fields: r.fields.0, created_by: r.created_by, created_at: r.created_at }
    }
}

#[derive(FromRow)]
struct SettingsRow { site_name: String, logo_url: Option<String>, updated_at: DateTime<Utc>, updated_by: Option<Uuid> }

fn convert<R, T: TryFrom<R, Error = StoreError>>(rows: Vec<R>) -> StoreResult<Vec<T>> {
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query("INSERT INTO products (id, name, description, base_price, discount_tiers, current_quantity, current_participants, status, created_by, image_urls, start_date, end_date, product_info_template_id, product_info_data, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.base_price).bind(Json(&p.discount_tiers))
            .bind(i64::from(p.current_quantity)).bind(i64::from(p.current_participants)).bind(p.status.as_str()).bind(p.created_by)
            .bind(&p.image_urls).bind(p.start_date).bind(p.end_date).bind(p.product_info_template_id).bind(Json(&p.product_info_data))
            .bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await.map_err(|e| unique_violation(e, format!("product {}", p.id)))?;
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn products(&self, status: Option<ProductStatus>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC")
            .bind(status.map(|s| s.as_str())).fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn update_product(&self, p: &Product) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE products SET name = $2, description = $3, base_price = $4, discount_tiers = $5, status = $6, image_urls = $7, start_date = $8, end_date = $9, product_info_template_id = $10, product_info_data = $11, updated_at = $12 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.base_price).bind(Json(&p.discount_tiers)).bind(p.status.as_str())
            .bind(&p.image_urls).bind(p.start_date).bind(p.end_date).bind(p.product_info_template_id).bind(Json(&p.product_info_data))
            .bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn adjust_participation(&self, id: Uuid, quantity_delta: i64, participants_delta: i64) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("UPDATE products SET current_quantity = GREATEST(current_quantity + $2, 0), current_participants = GREATEST(current_participants + $3, 0), updated_at = NOW() WHERE id = $1 RETURNING *")
            .bind(id).bind(quantity_delta).bind(participants_delta)
            .fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, o: &Order) -> StoreResult<()> {
        sqlx::query("INSERT INTO orders (id, product_id, user_id, quantity, participant_count, final_price, total_price, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(o.id).bind(o.product_id).bind(o.user_id).bind(i64::from(o.quantity)).bind(i64::from(o.participant_count))
            .bind(o.final_price).bind(o.total_price).bind(o.status.as_str()).bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await.map_err(|e| unique_violation(e, format!("order {}", o.id)))?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE ($1::uuid IS NULL OR product_id = $1) AND ($2::uuid IS NULL OR user_id = $2) AND ($3::text IS NULL OR status = $3) ORDER BY created_at DESC")
            .bind(filter.product_id).bind(filter.user_id).bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn transition_order(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2")
            .bind(id).bind(from.as_str()).bind(to.as_str()).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn commit_price_updates(&self, updates: &[PriceUpdate]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for u in updates {
            let r = sqlx::query("UPDATE orders SET final_price = $2, total_price = $3, updated_at = NOW() WHERE id = $1")
                .bind(u.order_id).bind(u.final_price).bind(u.total_price).execute(&mut *tx).await?;
            // dropping `tx` rolls back everything staged so far
            if r.rows_affected() == 0 { return Err(StoreError::Missing { collection: "orders", id: u.order_id }); }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, u: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (id, email, display_name, provider, role, status, blocked_until, blocked_reason, blocked_by, phone_number, shipping_address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)")
            .bind(u.id).bind(&u.email).bind(&u.display_name).bind(u.provider.as_str()).bind(u.role.as_str()).bind(u.status.as_str())
            .bind(u.blocked_until).bind(&u.blocked_reason).bind(u.blocked_by).bind(&u.phone_number)
            .bind(u.shipping_address.as_ref().map(Json)).bind(u.created_at).bind(u.updated_at)
            .execute(&self.pool).await.map_err(|e| unique_violation(e, format!("user {}", u.email)))?;
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1").bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool).await?
            .map(User::try_from).transpose()
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at DESC").fetch_all(&self.pool).await?;
        convert(rows)
    }

    async fn update_user(&self, u: &User) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE users SET display_name = $2, role = $3, status = $4, blocked_until = $5, blocked_reason = $6, blocked_by = $7, phone_number = $8, shipping_address = $9, updated_at = $10 WHERE id = $1")
            .bind(u.id).bind(&u.display_name).bind(u.role.as_str()).bind(u.status.as_str()).bind(u.blocked_until)
            .bind(&u.blocked_reason).bind(u.blocked_by).bind(&u.phone_number).bind(u.shipping_address.as_ref().map(Json))
            .bind(u.updated_at)
            .execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_template(&self, t: &ProductInfoTemplate) -> StoreResult<()> {
        sqlx::query("INSERT INTO product_info_templates (id, name, fields, created_by, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(t.id).bind(&t.name).bind(Json(&t.fields)).bind(t.created_by).bind(t.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn template(&self, id: Uuid) -> StoreResult<Option<ProductInfoTemplate>> {
        let row = sqlx::query_as::<_, TemplateRow>("SELECT * FROM product_info_templates WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Into::into))
    }

    async fn templates(&self) -> StoreResult<Vec<ProductInfoTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>("SELECT * FROM product_info_templates ORDER BY created_at DESC").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_template(&self, t: &ProductInfoTemplate) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE product_info_templates SET name = $2, fields = $3 WHERE id = $1")
            .bind(t.id).bind(&t.name).bind(Json(&t.fields)).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_template(&self, id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM product_info_templates WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn site_settings(&self) -> StoreResult<Option<SiteSettings>> {
        let row = sqlx::query_as::<_, SettingsRow>("SELECT site_name, logo_url, updated_at, updated_by FROM site_settings WHERE id = $1")
            .bind(SETTINGS_KEY).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| SiteSettings { site_name: r.site_name, logo_url: r.logo_url, updated_at: r.updated_at, updated_by: r.updated_by }))
    }

    async fn save_site_settings(&self, s: &SiteSettings) -> StoreResult<()> {
        sqlx::query("INSERT INTO site_settings (id, site_name, logo_url, updated_at, updated_by) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (id) DO UPDATE SET site_name = EXCLUDED.site_name, logo_url = EXCLUDED.logo_url, updated_at = EXCLUDED.updated_at, updated_by = EXCLUDED.updated_by")
            .bind(SETTINGS_KEY).bind(&s.site_name).bind(&s.logo_url).bind(s.updated_at).bind(s.updated_by)
            .execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn store() -> PgStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch database");
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        PgStore::new(pool)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_price_batch_rolls_back_on_missing_order() {
        let store = store().await;
        let order = Order::place(Uuid::now_v7(), Uuid::now_v7(), 2, 1, 9500).unwrap();
        store.insert_order(&order).await.unwrap();

        let updates = [
            PriceUpdate { order_id: order.id, final_price: 9000, total_price: 18000 },
            PriceUpdate { order_id: Uuid::now_v7(), final_price: 9000, total_price: 9000 },
        ];
        let err = store.commit_price_updates(&updates).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { collection: "orders", .. }));
        let stored = store.order(order.id).await.unwrap().unwrap();
        assert_eq!((stored.final_price, stored.total_price), (9500, 19000));

        store.commit_price_updates(&updates[..1]).await.unwrap();
        let stored = store.order(order.id).await.unwrap().unwrap();
        assert_eq!((stored.final_price, stored.total_price), (9000, 18000));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_adjust_participation_clamps_at_zero() {
        let store = store().await;
        let product = Product::create(crate::domain::aggregates::product::sample_draft(), Uuid::now_v7()).unwrap();
        store.insert_product(&product).await.unwrap();
        let p = store.adjust_participation(product.id, 3, 1).await.unwrap().unwrap();
        assert_eq!((p.current_quantity, p.current_participants), (3, 1));
        let p = store.adjust_participation(product.id, -5, -2).await.unwrap().unwrap();
        assert_eq!((p.current_quantity, p.current_participants), (0, 0));
        store.delete_product(product.id).await.unwrap();
    }
}
