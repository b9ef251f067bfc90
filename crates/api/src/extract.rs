//! Request extractors: JSON bodies with API errors, and session principals.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use domain::Principal;
use event_store::EventStore;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

const TOKEN_COOKIE: &str = "token";

/// `Json` whose rejections render as [`ApiError`] bodies.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// The caller behind a session token.
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentUser
where
    S: EventStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let principal = state
            .accounts
            .authenticate(&token)
            .await
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self(principal))
    }
}

/// The caller behind a session token, if there is a valid one.
pub struct OptionalUser(pub Option<Principal>);

impl<S> FromRequestParts<Arc<AppState<S>>> for OptionalUser
where
    S: EventStore + Clone + 'static,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let principal = match session_token(&parts.headers) {
            Some(token) => state.accounts.authenticate(&token).await,
            None => None,
        };
        Ok(Self(principal))
    }
}

/// A caller with the administrator role.
pub struct AdminUser(pub Principal);

impl<S> FromRequestParts<Arc<AppState<S>>> for AdminUser
where
    S: EventStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(Self(principal))
    }
}

/// Bearer token first, then the `token` cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
