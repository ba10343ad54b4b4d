//! Pending-order repricing
//!
//! A pending order's unit price is a view over its product's live aggregate
//! quantity. Whenever that aggregate moves, [`OrderRecalculator::recalculate`]
//! brings every pending order of the product back in line in one atomic batch.
//!
//! This pass is not coupled transactionally to the counter change that
//! triggers it: the aggregate it is handed may already be stale if another
//! join or cancel lands in between, and a failed pass leaves the counter
//! change in place. Callers log the failure and move on.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use crate::domain::aggregates::PriceUpdate;
use crate::domain::pricing;
use crate::domain::value_objects::DiscountTier;
use crate::store::{OrderFilter, OrderStore, StoreResult};

/// What one repricing pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repricing {
    pub unit_price: i64,
    pub pending: usize,
    pub updated: usize,
}

pub struct OrderRecalculator<S: ?Sized> { store: Arc<S> }

impl<S: ?Sized> Clone for OrderRecalculator<S> {
    fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: OrderStore + ?Sized> OrderRecalculator<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    #[tracing::instrument(skip_all, fields(product_id = %product_id, aggregate_quantity = aggregate_quantity))]
    pub async fn recalculate(&self, product_id: Uuid, aggregate_quantity: u32, base_price: i64, tiers: &[DiscountTier]) -> StoreResult<Repricing> {
        let pending = self.store.orders(&OrderFilter::pending_for_product(product_id)).await?;
        // every pending order of the product shares one unit price
        let unit_price = pricing::final_price(base_price, aggregate_quantity, tiers);
        let staged: Vec<PriceUpdate> = pending.iter().filter_map(|o| o.reprice(unit_price)).collect();
        let outcome = Repricing { unit_price, pending: pending.len(), updated: staged.len() };

        if staged.is_empty() {
            debug!(pending = pending.len(), unit_price, "pending orders already priced");
            return Ok(outcome);
        }
        self.store.commit_price_updates(&staged).await?;
        info!(updated = staged.len(), unit_price, aggregate_quantity, "pending orders repriced");
        Ok(outcome)
    }
}
