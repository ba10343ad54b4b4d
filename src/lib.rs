//! Group-buying storefront
//!
//! Buyers join a product's group purchase and pay a unit price set by how many
//! units everyone has committed so far.
//!
//! ## Features
//! - Tiered participation discounts ([`domain::pricing`])
//! - Repricing of pending orders when participation changes ([`services::recalculator`])
//! - Join / cancel / confirm flows with purchase windows and account blocking
//! - Product, user, template and site-settings administration
//! - PostgreSQL or in-memory storage, NATS event publishing

use thiserror::Error;

pub mod api;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod services;
pub mod store;

use domain::aggregates::{OrderError, ProductError, TemplateError, UserError};
use store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum GroupBuyError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Template not found")]
    TemplateNotFound,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Administrator access required")]
    Forbidden,

    #[error("Account is blocked")]
    Blocked,

    #[error("Product is no longer open for participation")]
    ProductClosed,

    #[error("Group purchase has not started yet (starts in {starts_in})")]
    NotStarted { starts_in: String },

    #[error("Group purchase has ended")]
    Ended,

    #[error("Already participating in this product")]
    AlreadyJoined,

    #[error("Pending orders still reference this record")]
    HasPendingOrders,

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for GroupBuyError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => Self::Duplicate(what),
            other => Self::Storage(other),
        }
    }
}

impl From<ProductError> for GroupBuyError {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<TemplateError> for GroupBuyError {
    fn from(e: TemplateError) -> Self { Self::Validation(e.to_string()) }
}

impl From<UserError> for GroupBuyError {
    fn from(e: UserError) -> Self { Self::Validation(e.to_string()) }
}

impl From<validator::ValidationErrors> for GroupBuyError {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, GroupBuyError>;
