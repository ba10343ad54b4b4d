//! HTTP/JSON surface
//!
//! Callers are identified by the `x-user-id` header, set by the authenticating
//! gateway in front of this service. Role checks happen in the services.

mod accounts;
mod extract;
mod orders;
mod products;
mod site;

pub use extract::{Caller, OptionalJson, USER_HEADER};

use axum::{http::StatusCode, response::{IntoResponse, Response}, routing::{get, post, put}, Json, Router};
use std::sync::Arc;
use validator::Validate;
use crate::domain::aggregates::OrderError;
use crate::messaging::Notifier;
use crate::services::{AccountService, GroupBuyService, SiteService};
use crate::store::Store;
use crate::GroupBuyError;

#[derive(Clone)]
pub struct AppState {
    pub group_buy: GroupBuyService,
    pub accounts: AccountService,
    pub site: SiteService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self {
            group_buy: GroupBuyService::new(Arc::clone(&store), notifier),
            accounts: AccountService::new(Arc::clone(&store)),
            site: SiteService::new(store),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, GroupBuyError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "groupbuy-commerce"})) }))
        .route("/api/v1/products", get(products::list_products).post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .route("/api/v1/products/:id/status", put(products::set_status))
        .route("/api/v1/products/:id/quote", get(products::quote))
        .route("/api/v1/products/:id/join", post(products::join))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/:id/confirm", post(orders::confirm_order))
        .route("/api/v1/accounts", post(accounts::register))
        .route("/api/v1/me", get(accounts::me))
        .route("/api/v1/me/shipping-address", put(accounts::update_shipping_address))
        .route("/api/v1/admin/users", get(accounts::list_users).post(accounts::create_user))
        .route("/api/v1/admin/users/:id", get(accounts::get_user).put(accounts::update_user).delete(accounts::delete_user))
        .route("/api/v1/admin/users/:id/block", post(accounts::block_user))
        .route("/api/v1/admin/users/:id/unblock", post(accounts::unblock_user))
        .route("/api/v1/templates", get(site::list_templates).post(site::create_template))
        .route("/api/v1/templates/:id", get(site::get_template).put(site::update_template).delete(site::delete_template))
        .route("/api/v1/settings", get(site::get_settings).put(site::update_settings))
        .with_state(state)
}

pub(crate) fn validated<T: Validate>(body: T) -> ApiResult<T> {
    body.validate()?;
    Ok(body)
}

impl GroupBuyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::OrderNotFound | Self::UserNotFound | Self::TemplateNotFound => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::Blocked => StatusCode::FORBIDDEN,
            Self::ProductClosed | Self::NotStarted { .. } | Self::Ended | Self::AlreadyJoined | Self::HasPendingOrders
            | Self::Duplicate(_) | Self::Order(OrderError::NotPending(_)) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::Order(OrderError::InvalidQuantity | OrderError::TotalOverflow) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GroupBuyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
