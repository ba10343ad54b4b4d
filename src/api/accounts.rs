use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{AuthProvider, Role, User};
use crate::domain::value_objects::ShippingAddress;
use crate::services::UserChanges;
use super::{validated, ApiResult, AppState, Caller, OptionalJson};

/// A user as returned over HTTP, with the block state evaluated now.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub is_blocked: bool,
    pub block_status: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        let now = Utc::now();
        Self { is_blocked: user.is_blocked(now), block_status: user.block_status(now), user }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[serde(default)]
    pub provider: AuthProvider,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub phone_number: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1))]
    pub recipient_name: String,
    #[validate(length(min = 1, max = 30))]
    pub phone_number: String,
    #[validate(length(min = 1, max = 10))]
    pub postal_code: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[serde(default)]
    pub detail_address: String,
    pub delivery_memo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockRequest {
    /// Omitted means a permanent block.
    pub until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

pub(super) async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> ApiResult<(StatusCode, Json<UserView>)> {
    let r = validated(r)?;
    let user = s.accounts.register(&r.email, &r.display_name, r.provider).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(super) async fn me(Caller(actor): Caller) -> Json<UserView> {
    Json(actor.into())
}

pub(super) async fn update_shipping_address(State(s): State<AppState>, Caller(actor): Caller, Json(r): Json<ShippingAddressRequest>) -> ApiResult<Json<UserView>> {
    let r = validated(r)?;
    let address = ShippingAddress {
        recipient_name: r.recipient_name, phone_number: r.phone_number, postal_code: r.postal_code,
        address: r.address, detail_address: r.detail_address, delivery_memo: r.delivery_memo,
    };
    Ok(Json(s.accounts.update_shipping_address(&actor, address).await?.into()))
}

pub(super) async fn list_users(State(s): State<AppState>, Caller(actor): Caller) -> ApiResult<Json<Vec<UserView>>> {
    let users = s.accounts.users(&actor).await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

pub(super) async fn get_user(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<Json<UserView>> {
    Ok(Json(s.accounts.user(&actor, id).await?.into()))
}

pub(super) async fn create_user(State(s): State<AppState>, Caller(actor): Caller, Json(r): Json<CreateUserRequest>) -> ApiResult<(StatusCode, Json<UserView>)> {
    let r = validated(r)?;
    let user = s.accounts.create_user(&actor, &r.email, &r.display_name, r.role).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub(super) async fn update_user(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, Json(r): Json<UpdateUserRequest>) -> ApiResult<Json<UserView>> {
    let r = validated(r)?;
    let changes = UserChanges { display_name: r.display_name, phone_number: r.phone_number, role: r.role };
    Ok(Json(s.accounts.update_user(&actor, id, changes).await?.into()))
}

pub(super) async fn delete_user(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.accounts.delete_user(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn block_user(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, OptionalJson(body): OptionalJson<BlockRequest>) -> ApiResult<Json<UserView>> {
    let BlockRequest { until, reason } = body.unwrap_or_default();
    Ok(Json(s.accounts.block(&actor, id, until, reason).await?.into()))
}

pub(super) async fn unblock_user(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<Json<UserView>> {
    Ok(Json(s.accounts.unblock(&actor, id).await?.into()))
}
