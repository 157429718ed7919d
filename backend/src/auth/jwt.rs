//! Session token issuance
//!
//! Tokens are compact HS256 JWTs built by hand:
//! `base64url(header).base64url(payload).base64url(hmac)`, no padding.
//! The header is always `{"alg":"HS256","typ":"JWT"}`; the payload carries
//! `user_id`, `exp` (unix seconds, UTC) and the actor `type`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use innotaxi_shared::Identity;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

use super::error::TokenError;
use super::verifier::TokenVerifier;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const TOKEN_TYPE: &str = "JWT";
pub(crate) const ALGORITHM: &str = "HS256";

/// Token header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Header {
    pub alg: String,
    pub typ: String,
}

impl Header {
    fn hs256() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
    /// Actor type tag; absent in tokens from untagged issuers
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// Which lifetime a token gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// HMAC key shared by the issuer and the verifier
#[derive(Clone)]
pub struct SigningKey {
    secret: Arc<SecretString>,
}

impl SigningKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Arc::new(SecretString::new(secret.into())),
        }
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
    }

    /// MAC over `signing_input`
    pub(crate) fn sign(&self, signing_input: &str) -> Result<Vec<u8>, TokenError> {
        let mut mac = self
            .mac()
            .map_err(|e| TokenError::IssuanceFailed(format!("hmac key rejected: {}", e)))?;
        mac.update(signing_input.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Constant-time check of `signature` over `signing_input`
    pub(crate) fn verify(&self, signing_input: &str, signature: &[u8]) -> bool {
        match self.mac() {
            Ok(mut mac) => {
                mac.update(signing_input.as_bytes());
                mac.verify_slice(signature).is_ok()
            }
            Err(_) => false,
        }
    }
}

/// Lifetimes for the two token kinds, in seconds
#[derive(Debug, Clone, Copy)]
struct Lifetimes {
    access_secs: i64,
    refresh_secs: i64,
}

/// A freshly issued token with its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh tokens issued together for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Token issuing service
///
/// Cloning is cheap: the key is behind an `Arc`.
#[derive(Clone)]
pub struct JwtService {
    key: SigningKey,
    lifetimes: Lifetimes,
}

impl JwtService {
    pub fn new(secret: impl Into<String>, access_token_ttl_secs: i64, refresh_token_ttl_secs: i64) -> Self {
        Self {
            key: SigningKey::new(secret),
            lifetimes: Lifetimes {
                access_secs: access_token_ttl_secs,
                refresh_secs: refresh_token_ttl_secs,
            },
        }
    }

    /// Verifier sharing this service's key
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(self.key.clone())
    }

    /// `now` plus the lifetime of `kind`; out-of-range lifetimes fail closed
    fn expiry(&self, kind: TokenKind, now: DateTime<Utc>) -> Result<DateTime<Utc>, TokenError> {
        let secs = match kind {
            TokenKind::Access => self.lifetimes.access_secs,
            TokenKind::Refresh => self.lifetimes.refresh_secs,
        };
        if secs < 0 {
            return Err(TokenError::IssuanceFailed(format!("negative token lifetime {}s", secs)));
        }

        Duration::try_seconds(secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| TokenError::IssuanceFailed(format!("token lifetime {}s out of range", secs)))
    }

    /// Issue one token for `identity` expiring the lifetime of `kind` after `now`
    pub fn issue(&self, identity: Identity, kind: TokenKind, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = self.expiry(kind, now)?;
        let claims = Claims {
            user_id: identity.id(),
            exp: expires_at.timestamp(),
            actor: Some(identity.actor_type().as_str().to_string()),
        };

        let header = serde_json::to_vec(&Header::hs256())
            .map_err(|e| TokenError::IssuanceFailed(format!("marshal header failed: {}", e)))?;
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::IssuanceFailed(format!("marshal payload failed: {}", e)))?;

        let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(&payload));
        let signature = self.key.sign(&signing_input)?;

        Ok(IssuedToken {
            token: format!("{}.{}", signing_input, encode_segment(&signature)),
            expires_at,
        })
    }

    /// Issue an independent access/refresh pair for `identity`
    pub fn issue_pair(&self, identity: Identity, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access: self.issue(identity, TokenKind::Access, now)?,
            refresh: self.issue(identity, TokenKind::Refresh, now)?,
        })
    }
}

pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(segment).ok()
}
