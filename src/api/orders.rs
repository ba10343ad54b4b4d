use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus};
use crate::store::OrderFilter;
use super::{ApiResult, AppState, Caller};

/// Customers' `user_id` is always forced to themselves.
#[derive(Debug, Deserialize)]
pub struct OrderParams {
    pub product_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

pub(super) async fn list_orders(State(s): State<AppState>, Caller(actor): Caller, Query(p): Query<OrderParams>) -> ApiResult<Json<Vec<Order>>> {
    let filter = OrderFilter { product_id: p.product_id, user_id: p.user_id, status: p.status };
    Ok(Json(s.group_buy.orders(&actor, filter).await?))
}

pub(super) async fn get_order(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.group_buy.order(&actor, id).await?))
}

pub(super) async fn cancel_order(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.group_buy.cancel(&actor, id).await?))
}

pub(super) async fn confirm_order(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.group_buy.confirm(&actor, id).await?))
}
