//! User profile API routes
//!
//! Every route names an account id and only its owner may touch it.

use crate::auth::ResourceOwner;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use innotaxi_shared::{UpdateProfileRequest, UserProfileResponse};
use tracing::info;

/// Create profile routes, mounted under `/users`
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/:id", get(get_profile).put(update_profile))
        .route("/:id", delete(delete_user))
}

/// GET /users/profile/:id - Get user profile
async fn get_profile(
    State(state): State<AppState>,
    ResourceOwner(user): ResourceOwner,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let profile = state.profiles.get_profile(user.id()).await?;
    Ok(Json(profile))
}

/// PUT /users/profile/:id - Update name, phone number or email
async fn update_profile(
    State(state): State<AppState>,
    ResourceOwner(user): ResourceOwner,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let profile = state.profiles.update_profile(user.id(), req).await?;
    info!(user_id = user.id(), "Profile updated");
    Ok(Json(profile))
}

/// DELETE /users/:id - Soft-delete the account
async fn delete_user(
    State(state): State<AppState>,
    ResourceOwner(user): ResourceOwner,
) -> Result<StatusCode, ApiError> {
    state.profiles.delete_user(user.id()).await?;
    info!(user_id = user.id(), "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
