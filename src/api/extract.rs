use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use crate::domain::aggregates::User;
use crate::GroupBuyError;
use super::AppState;

/// Header carrying the caller's user id, set by the upstream gateway.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller's user record.
pub struct Caller(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = GroupBuyError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts.headers.get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(GroupBuyError::Unauthenticated)?;
        state.accounts.authenticate(id).await.map(Caller)
    }
}

/// JSON body that may be omitted entirely.
///
/// An empty body yields `None`. Anything else must parse as `T`.
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = GroupBuyError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await
            .map_err(|e| GroupBuyError::Validation(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        serde_json::from_slice(&bytes)
            .map(|body| Self(Some(body)))
            .map_err(|e| GroupBuyError::Validation(format!("invalid JSON body: {e}")))
    }
}
