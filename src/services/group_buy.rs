//! Group purchase flows: quoting, joining, cancelling, confirming, and the
//! product administration that feeds them.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use crate::domain::aggregates::{format_remaining, Order, OrderError, OrderStatus, Product, ProductDraft, ProductStatus, User, WindowPhase};
use crate::domain::events::{DomainEvent, OrderEvent, PricingEvent};
use crate::domain::pricing;
use crate::messaging::Notifier;
use crate::services::recalculator::OrderRecalculator;
use crate::services::require_admin;
use crate::store::{OrderFilter, Store};
use crate::{GroupBuyError, Result};

/// Price preview for a product at some aggregate quantity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Quote {
    pub product_id: Uuid,
    pub base_price: i64,
    pub aggregate_quantity: u32,
    pub discount_rate: f64,
    pub discount_label: String,
    pub unit_price: i64,
    pub units_until_next_tier: Option<u32>,
    pub phase: WindowPhase,
    pub starts_in: Option<String>,
    pub ends_in: Option<String>,
}

#[derive(Clone)]
pub struct GroupBuyService {
    store: Arc<dyn Store>,
    recalculator: OrderRecalculator<dyn Store>,
    notifier: Notifier,
}

impl GroupBuyService {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { recalculator: OrderRecalculator::new(Arc::clone(&store)), store, notifier }
    }

    async fn load_product(&self, id: Uuid) -> Result<Product> {
        self.store.product(id).await?.ok_or(GroupBuyError::ProductNotFound)
    }

    async fn load_order(&self, id: Uuid) -> Result<Order> {
        self.store.order(id).await?.ok_or(GroupBuyError::OrderNotFound)
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub async fn product(&self, id: Uuid) -> Result<Product> { self.load_product(id).await }

    pub async fn products(&self, status: Option<ProductStatus>) -> Result<Vec<Product>> {
        Ok(self.store.products(status).await?)
    }

    /// `quantity` previews the price at a hypothetical aggregate instead of
    /// the current one.
    pub async fn quote(&self, product_id: Uuid, quantity: Option<u32>) -> Result<Quote> {
        let product = self.load_product(product_id).await?;
        let now = Utc::now();
        let aggregate_quantity = quantity.unwrap_or(product.current_quantity);
        let discount_rate = pricing::rate_for(aggregate_quantity, &product.discount_tiers);
        Ok(Quote {
            product_id,
            base_price: product.base_price,
            aggregate_quantity,
            discount_rate,
            discount_label: pricing::format_discount_rate(discount_rate),
            unit_price: pricing::final_price(product.base_price, aggregate_quantity, &product.discount_tiers),
            units_until_next_tier: pricing::units_until_next_tier(aggregate_quantity, &product.discount_tiers),
            phase: product.phase(now),
            starts_in: product.time_until_start(now).map(format_remaining),
            ends_in: product.time_until_end(now).map(format_remaining),
        })
    }

    pub async fn create_product(&self, actor: &User, draft: ProductDraft) -> Result<Product> {
        require_admin(actor)?;
        self.check_template(&draft).await?;
        let product = Product::create(draft, actor.id)?;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, base_price = product.base_price, tiers = product.discount_tiers.len(), "product created");
        Ok(product)
    }

    /// Pricing edits reprice the product's pending orders.
    pub async fn update_product(&self, actor: &User, id: Uuid, draft: ProductDraft) -> Result<Product> {
        require_admin(actor)?;
        self.check_template(&draft).await?;
        let mut product = self.load_product(id).await?;
        let repriced = product.revise(draft)?;
        if !self.store.update_product(&product).await? { return Err(GroupBuyError::ProductNotFound); }
        info!(product_id = %id, repriced, "product updated");
        if repriced {
            // aggregates may have moved since the load
            let current = self.load_product(id).await?;
            self.reprice(&current).await;
            return Ok(current);
        }
        Ok(product)
    }

    pub async fn set_product_status(&self, actor: &User, id: Uuid, status: ProductStatus) -> Result<Product> {
        require_admin(actor)?;
        let mut product = self.load_product(id).await?;
        product.set_status(status);
        if !self.store.update_product(&product).await? { return Err(GroupBuyError::ProductNotFound); }
        info!(product_id = %id, status = status.as_str(), "product status changed");
        Ok(product)
    }

    pub async fn delete_product(&self, actor: &User, id: Uuid) -> Result<()> {
        require_admin(actor)?;
        if !self.store.orders(&OrderFilter::pending_for_product(id)).await?.is_empty() {
            return Err(GroupBuyError::HasPendingOrders);
        }
        if !self.store.delete_product(id).await? { return Err(GroupBuyError::ProductNotFound); }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// A referenced template must exist and define every filled-in label.
    async fn check_template(&self, draft: &ProductDraft) -> Result<()> {
        let Some(template_id) = draft.product_info_template_id else { return Ok(()) };
        let template = self.store.template(template_id).await?.ok_or(GroupBuyError::TemplateNotFound)?;
        match draft.product_info_data.keys().find(|k| !template.labels().any(|l| l == k.as_str())) {
            Some(unknown) => Err(GroupBuyError::Validation(format!("template {} has no field {unknown:?}", template.name))),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Customers only ever see their own orders.
    pub async fn orders(&self, actor: &User, mut filter: OrderFilter) -> Result<Vec<Order>> {
        if !actor.is_admin() { filter.user_id = Some(actor.id); }
        Ok(self.store.orders(&filter).await?)
    }

    pub async fn order(&self, actor: &User, id: Uuid) -> Result<Order> {
        let order = self.load_order(id).await?;
        if order.user_id != actor.id && !actor.is_admin() { return Err(GroupBuyError::OrderNotFound); }
        Ok(order)
    }

    #[tracing::instrument(skip_all, fields(user_id = %actor.id, product_id = %product_id, quantity = quantity))]
    pub async fn join(&self, actor: &User, product_id: Uuid, quantity: u32) -> Result<Order> {
        let now = Utc::now();
        if actor.is_blocked(now) { return Err(GroupBuyError::Blocked); }
        if quantity == 0 { return Err(OrderError::InvalidQuantity.into()); }

        let product = self.load_product(product_id).await?;
        if !product.is_open() { return Err(GroupBuyError::ProductClosed); }
        match product.phase(now) {
            WindowPhase::Upcoming => {
                let starts_in = product.time_until_start(now).map(format_remaining).unwrap_or_default();
                return Err(GroupBuyError::NotStarted { starts_in });
            }
            WindowPhase::Ended => return Err(GroupBuyError::Ended),
            WindowPhase::Active => {}
        }

        let mine = OrderFilter { product_id: Some(product_id), user_id: Some(actor.id), status: None };
        if self.store.orders(&mine).await?.iter().any(|o| o.status != OrderStatus::Cancelled) {
            return Err(GroupBuyError::AlreadyJoined);
        }

        let projected = product.current_quantity.saturating_add(quantity);
        let unit_price = pricing::final_price(product.base_price, projected, &product.discount_tiers);
        let order = Order::place(product_id, actor.id, quantity, product.current_participants + 1, unit_price)?;
        self.store.insert_order(&order).await?;

        let updated = self.store.adjust_participation(product_id, i64::from(quantity), 1).await?.ok_or(GroupBuyError::ProductNotFound)?;
        info!(order_id = %order.id, aggregate_quantity = updated.current_quantity, unit_price, "joined group purchase");
        self.notifier.publish(DomainEvent::Order(OrderEvent::Joined { order_id: order.id, product_id, user_id: actor.id, quantity })).await;

        self.reprice(&updated).await;
        Ok(self.store.order(order.id).await?.unwrap_or(order))
    }

    /// Owners cancel their own pending orders; administrators may cancel any.
    #[tracing::instrument(skip_all, fields(user_id = %actor.id, order_id = %order_id))]
    pub async fn cancel(&self, actor: &User, order_id: Uuid) -> Result<Order> {
        let mut order = self.order(actor, order_id).await?;
        let event = order.cancel()?;
        if !self.store.transition_order(order_id, OrderStatus::Pending, OrderStatus::Cancelled).await? {
            let current = self.load_order(order_id).await?;
            return Err(OrderError::NotPending(current.status).into());
        }

        let delta = -i64::from(order.quantity);
        match self.store.adjust_participation(order.product_id, delta, -1).await? {
            Some(product) => {
                info!(aggregate_quantity = product.current_quantity, "order cancelled");
                self.reprice(&product).await;
            }
            None => warn!(product_id = %order.product_id, "cancelled order references a missing product"),
        }
        self.notifier.publish(event).await;
        Ok(order)
    }

    /// Freezes the order's current price.
    pub async fn confirm(&self, actor: &User, order_id: Uuid) -> Result<Order> {
        require_admin(actor)?;
        let mut order = self.load_order(order_id).await?;
        let event = order.confirm()?;
        if !self.store.transition_order(order_id, OrderStatus::Pending, OrderStatus::Confirmed).await? {
            let current = self.load_order(order_id).await?;
            return Err(OrderError::NotPending(current.status).into());
        }
        info!(%order_id, final_price = order.final_price, "order confirmed");
        self.notifier.publish(event).await;
        Ok(order)
    }

    /// Best-effort: a failed pass is logged, never propagated, and never
    /// undoes the change that triggered it.
    async fn reprice(&self, product: &Product) {
        match self.recalculator.recalculate(product.id, product.current_quantity, product.base_price, &product.discount_tiers).await {
            Ok(outcome) if outcome.updated > 0 => {
                self.notifier.publish(DomainEvent::Pricing(PricingEvent::Repriced {
                    product_id: product.id,
                    aggregate_quantity: product.current_quantity,
                    unit_price: outcome.unit_price,
                    orders_updated: outcome.updated,
                })).await;
            }
            Ok(_) => {}
            Err(e) => warn!(product_id = %product.id, error = %e, "pending order repricing failed"),
        }
    }
}
