//! Aggregates module
pub mod product;
pub mod order;
pub mod user;
pub mod catalog;

pub use product::{format_remaining, Product, ProductDraft, ProductError, ProductStatus, WindowPhase};
pub use order::{Order, OrderError, OrderStatus, PriceUpdate};
pub use user::{AccountStatus, AuthProvider, Role, User, UserError};
pub use catalog::{FieldKind, ProductInfoField, ProductInfoTemplate, SiteSettings, TemplateError};
