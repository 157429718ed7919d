//! Application error handling
//!
//! This module provides unified error handling for the API,
//! converting internal errors to appropriate HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use innotaxi_shared::{ErrorDetail, ErrorResponse};
use thiserror::Error;
use tracing::error;

use crate::auth::{AuthError, TokenError};
use crate::repositories::RepositoryError;

/// API error type that can be converted to HTTP responses
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidInput(msg) => ApiError::Validation(msg),
            AuthError::UserAlreadyExists => ApiError::Conflict(message),
            AuthError::UserDoesNotExist => ApiError::NotFound(message),
            AuthError::MissingToken | AuthError::Token(TokenError::Expired) => ApiError::Unauthorized(message),
            AuthError::IncorrectPassword
            | AuthError::TokenRevoked
            | AuthError::ResourceMismatch
            | AuthError::Token(
                TokenError::Malformed(_) | TokenError::InvalidSignature | TokenError::UnknownOrWrongActorType,
            ) => ApiError::Forbidden(message),
            AuthError::Token(TokenError::IssuanceFailed(reason)) => {
                ApiError::Internal(anyhow::anyhow!("token issuance failed: {}", reason))
            }
            AuthError::Directory(err) => err.into(),
            AuthError::Revocation(err) => ApiError::Internal(err.context("revocation store failure")),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserAlreadyExists => ApiError::Conflict("user already exists".to_string()),
            RepositoryError::Database(err) => ApiError::Database(err),
            RepositoryError::Backend(err) => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Internal(err) => {
                error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
