//! Authorization extractors
//!
//! Both extractors run the auth service gate: bearer token present, valid
//! user token, not revoked. [`ResourceOwner`] additionally requires the
//! `id` path parameter to name the token's subject.

use std::collections::HashMap;

use crate::error::ApiError;
use crate::services::Authorized;
use crate::state::AppState;
use axum::{
    extract::{FromRef, FromRequestParts, Path},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use innotaxi_shared::{AccountId, Identity};

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Caller that passed the authorization gate
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    /// The access token as presented, needed to revoke it on logout
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn id(&self) -> AccountId {
        self.identity.id()
    }
}

impl From<Authorized> for AuthUser {
    fn from(authorized: Authorized) -> Self {
        Self {
            identity: authorized.verified.identity,
            token: authorized.token,
            expires_at: authorized.verified.expires_at,
        }
    }
}

async fn authorize(parts: &Parts, state: &AppState, resource_id: Option<&str>) -> Result<AuthUser, ApiError> {
    let authorized = state
        .auth
        .authorize(bearer_token(&parts.headers), resource_id, Utc::now())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Authorization rejected");
            ApiError::from(e)
        })?;

    Ok(authorized.into())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        authorize(parts, &app_state, None).await
    }
}

/// Caller acting on the account named by the `id` path parameter
#[derive(Debug, Clone)]
pub struct ResourceOwner(pub AuthUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ResourceOwner
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let resource_id = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .ok()
            .and_then(|Path(mut params)| params.remove("id"));

        // A route without an id never matches a subject
        let user = authorize(parts, &app_state, Some(resource_id.as_deref().unwrap_or_default())).await?;
        Ok(ResourceOwner(user))
    }
}
