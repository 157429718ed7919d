//! Authentication routes
//!
//! Sign-up, sign-in, token refresh and logout. The access token is returned
//! in the body; the refresh token only ever travels in the cookie.

use crate::auth::cookie::{clear_refresh_cookie, refresh_token_from, set_refresh_cookie};
use crate::auth::{AuthUser, TokenPair, Verified};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use innotaxi_shared::{AccessTokenResponse, SignInRequest, SignUpRequest};
use tracing::{info, warn};

/// Create auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/refresh", get(refresh))
        .route("/logout", get(logout))
}

/// Body plus refresh cookie for a freshly issued pair
fn session_response(
    state: &AppState,
    jar: CookieJar,
    pair: TokenPair,
    now: DateTime<Utc>,
) -> (CookieJar, Json<AccessTokenResponse>) {
    let max_age = (pair.refresh.expires_at - now).num_seconds();
    let jar = set_refresh_cookie(jar, &pair.refresh.token, max_age, state.config().auth.secure_cookie);

    (
        jar,
        Json(AccessTokenResponse {
            access_token: pair.access.token,
        }),
    )
}

/// Register a new user
///
/// POST /users/auth/sign-up
async fn sign_up(State(state): State<AppState>, Json(req): Json<SignUpRequest>) -> ApiResult<StatusCode> {
    let id = state.auth.sign_up(req).await.map_err(|e| {
        warn!(error = %e, "Sign-up failed");
        ApiError::from(e)
    })?;

    info!(user_id = id, "User signed up");
    Ok(StatusCode::CREATED)
}

/// Exchange phone and password for a session
///
/// POST /users/auth/sign-in
async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let pair = state.auth.sign_in(req, now).await.map_err(|e| {
        warn!(error = %e, "Sign-in failed");
        ApiError::from(e)
    })?;

    info!("User signed in");
    Ok(session_response(&state, jar, pair, now))
}

/// Issue a new pair from the refresh cookie
///
/// GET /users/auth/refresh
async fn refresh(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let now = Utc::now();
    let refresh_token = refresh_token_from(&jar);
    let pair = state
        .auth
        .refresh(refresh_token.as_deref(), now)
        .await
        .map_err(|e| {
            warn!(error = %e, "Token refresh failed");
            ApiError::from(e)
        })?;

    Ok(session_response(&state, jar, pair, now))
}

/// Revoke the presented access token and drop the refresh cookie
///
/// GET /users/auth/logout
async fn logout(State(state): State<AppState>, jar: CookieJar, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let verified = Verified {
        identity: user.identity,
        expires_at: user.expires_at,
    };
    state.auth.logout(&user.token, &verified, Utc::now()).await?;

    info!(user_id = user.id(), "User logged out");
    Ok((StatusCode::OK, clear_refresh_cookie(jar, state.config().auth.secure_cookie)))
}
