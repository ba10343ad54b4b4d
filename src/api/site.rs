use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{ProductInfoField, ProductInfoTemplate, SiteSettings};
use super::{validated, ApiResult, AppState, Caller};

#[derive(Debug, Deserialize, Validate)]
pub struct TemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<ProductInfoField>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SettingsRequest {
    #[validate(length(min = 1, max = 100))]
    pub site_name: String,
    #[validate(url)]
    pub logo_url: Option<String>,
}

pub(super) async fn list_templates(State(s): State<AppState>) -> ApiResult<Json<Vec<ProductInfoTemplate>>> {
    Ok(Json(s.site.templates().await?))
}

pub(super) async fn get_template(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<ProductInfoTemplate>> {
    Ok(Json(s.site.template(id).await?))
}

pub(super) async fn create_template(State(s): State<AppState>, Caller(actor): Caller, Json(r): Json<TemplateRequest>) -> ApiResult<(StatusCode, Json<ProductInfoTemplate>)> {
    let r = validated(r)?;
    Ok((StatusCode::CREATED, Json(s.site.create_template(&actor, &r.name, r.fields).await?)))
}

pub(super) async fn update_template(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>, Json(r): Json<TemplateRequest>) -> ApiResult<Json<ProductInfoTemplate>> {
    let r = validated(r)?;
    Ok(Json(s.site.update_template(&actor, id, &r.name, r.fields).await?))
}

pub(super) async fn delete_template(State(s): State<AppState>, Caller(actor): Caller, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    s.site.delete_template(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn get_settings(State(s): State<AppState>) -> ApiResult<Json<SiteSettings>> {
    Ok(Json(s.site.settings().await?))
}

pub(super) async fn update_settings(State(s): State<AppState>, Caller(actor): Caller, Json(r): Json<SettingsRequest>) -> ApiResult<Json<SiteSettings>> {
    let r = validated(r)?;
    Ok(Json(s.site.update_settings(&actor, &r.site_name, r.logo_url).await?))
}
