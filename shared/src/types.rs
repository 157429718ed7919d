//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{AccountId, UserStatus};

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Registration request
///
/// Missing fields deserialize as empty strings so that the validation
/// step, not the JSON decoder, reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "phone_number is required"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignInRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "phone_number is required"))]
    pub phone_number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// Body returned by sign-in and refresh; the refresh token travels in a cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "phone_number cannot be empty"))]
    pub phone_number: Option<String>,
    #[validate(email(message = "email is invalid"))]
    pub email: Option<String>,
}

/// User profile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub id: AccountId,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub rating: f64,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}
