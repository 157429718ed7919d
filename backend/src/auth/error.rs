//! Error taxonomy of the authentication core

use crate::repositories::RepositoryError;
use thiserror::Error;

/// Failures of token issuance and verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(&'static str),

    #[error("token expired")]
    Expired,

    #[error("wrong signature")]
    InvalidSignature,

    #[error("unknown or wrong actor type")]
    UnknownOrWrongActorType,

    #[error("token issuance failed: {0}")]
    IssuanceFailed(String),
}

/// Failures of the auth service operations
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("user does not exist")]
    UserDoesNotExist,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("missing token")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token revoked")]
    TokenRevoked,

    #[error("token subject does not match the requested resource")]
    ResourceMismatch,

    #[error("user directory failure")]
    Directory(#[source] RepositoryError),

    #[error("revocation store failure")]
    Revocation(#[source] anyhow::Error),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UserAlreadyExists => AuthError::UserAlreadyExists,
            other => AuthError::Directory(other),
        }
    }
}
