//! Authentication module
//!
//! Salted SHA-256 credentials, HS256 session tokens, a revocation ledger and
//! the axum extractors that gate protected routes.

pub mod cookie;
mod error;
mod jwt;
mod middleware;
mod password;
mod revocation;
mod verifier;

pub use error::{AuthError, TokenError};
pub use jwt::{Claims, IssuedToken, JwtService, SigningKey, TokenKind, TokenPair};
pub use middleware::{bearer_token, AuthUser, ResourceOwner};
pub use password::{Credential, PasswordService};
pub use revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore};
pub use verifier::{TokenVerifier, Verified};
