use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{Order, Product, ProductDraft, ProductStatus};
use crate::domain::value_objects::DiscountTier;
use crate::services::Quote;
use super::{validated, ApiResult, AppState, Caller, OptionalJson};

#[derive(Debug, Deserialize)] pub struct ListParams { pub status: Option<ProductStatus> }
#[derive(Debug, Deserialize)] pub struct QuoteParams { pub quantity: Option<u32> }
#[derive(Debug, Deserialize)] pub struct StatusRequest { pub status: ProductStatus }

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1, max = 1000000000))]
    pub base_price: i64,
    pub discount_tiers: Vec<DiscountTier>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub product_info_template_id: Option<Uuid>,
    #[serde(default)]
    pub product_info_data: BTreeMap<String, String>,
}

impl From<ProductRequest> for ProductDraft {
    fn from(r: ProductRequest) -> Self {
        Self {
            name: r.name, description: r.description, base_price: r.base_price, discount_tiers: r.discount_tiers,
            image_urls: r.image_urls, start_date: r.start_date, end_date: r.end_date,
            product_info_template_id: r.product_info_template_id, product_info_data: r.product_info_data,
        }
    }
}

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 10000))]
    pub quantity: u32,
}

pub(super) async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(s.group_buy.products(p.status).await?))
}

pub(super) async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.group_buy.product(id).await?))
}

pub(super) async fn create_product(State(s): State<AppState>, Caller(actor): Caller, Json(r): Json<ProductRequest>) -> ApiResult<(StatusCode, Json<Product>)> {
    let draft = validated(r)?.into();
    Ok((StatusCode::CREATED, Json(s.group_buy.create_product(&actor, draft).await?)))
}

pub(super) async fn update_product(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, Json(r): Json<ProductRequest>) -> ApiResult<Json<Product>> {
    let draft = validated(r)?.into();
    Ok(Json(s.group_buy.update_product(&actor, id, draft).await?))
}

pub(super) async fn set_status(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, Json(r): Json<StatusRequest>) -> ApiResult<Json<Product>> {
    Ok(Json(s.group_buy.set_product_status(&actor, id, r.status).await?))
}

pub(super) async fn delete_product(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.group_buy.delete_product(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn quote(State(s): State<AppState>, Path(id): Path<Uuid>, Query(p): Query<QuoteParams>) -> ApiResult<Json<Quote>> {
    Ok(Json(s.group_buy.quote(id, p.quantity).await?))
}

/// A missing body joins with one unit.
pub(super) async fn join(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, OptionalJson(body): OptionalJson<JoinRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    let quantity = match body {
        Some(r) => validated(r)?.quantity,
        None => one(),
    };
    Ok((StatusCode::CREATED, Json(s.group_buy.join(&actor, id, quantity).await?)))
}
