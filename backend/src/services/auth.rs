//! Authentication service
//!
//! Orchestrates the user directory, password hasher, token codec and
//! revocation ledger. Every time-dependent operation takes `now` from the
//! caller; handlers pass `Utc::now()`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use innotaxi_shared::validation::validate_phone_number;
use innotaxi_shared::{AccountId, ActorType, Identity, SignInRequest, SignUpRequest};
use validator::{Validate, ValidationErrors};

use crate::auth::{AuthError, JwtService, PasswordService, RevocationStore, TokenError, TokenPair, TokenVerifier, Verified};
use crate::repositories::{NewUser, UserDirectory};

/// Outcome of the authorization gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    /// The bearer token as presented
    pub token: String,
    pub verified: Verified,
}

/// Authentication service
///
/// Cheap to clone; shared state is behind `Arc`s.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    revocations: Arc<dyn RevocationStore>,
    passwords: PasswordService,
    tokens: JwtService,
    verifier: TokenVerifier,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        revocations: Arc<dyn RevocationStore>,
        passwords: PasswordService,
        tokens: JwtService,
    ) -> Self {
        let verifier = tokens.verifier();
        Self {
            users,
            revocations,
            passwords,
            tokens,
            verifier,
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Register a user; returns the new account id
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AccountId, AuthError> {
        request.validate().map_err(invalid_input)?;
        validate_phone_number(&request.phone_number).map_err(AuthError::InvalidInput)?;

        let credential = self.passwords.hash(&request.password);
        let id = self
            .users
            .create_user(NewUser {
                name: request.name,
                phone_number: request.phone_number,
                email: request.email,
                credential,
            })
            .await?;

        Ok(id)
    }

    /// Check credentials and open a session
    pub async fn sign_in(&self, request: SignInRequest, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        request.validate().map_err(invalid_input)?;

        let user = self
            .users
            .find_active_by_phone(&request.phone_number)
            .await?
            .ok_or(AuthError::UserDoesNotExist)?;

        if !self.passwords.verify(&request.password, &user.credential) {
            return Err(AuthError::IncorrectPassword);
        }

        Ok(self.tokens.issue_pair(Identity::User(user.id), now)?)
    }

    /// Exchange a refresh token for a new pair
    ///
    /// The presented refresh token stays valid until its own expiry.
    pub async fn refresh(&self, refresh_token: Option<&str>, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let token = refresh_token.ok_or(AuthError::MissingToken)?;
        let verified = self.verifier.verify(token, Some(ActorType::User), now)?;

        Ok(self.tokens.issue_pair(verified.identity, now)?)
    }

    /// Revoke the access token of an authorized request
    ///
    /// The ledger entry lives exactly as long as the token would have.
    pub async fn logout(&self, token: &str, verified: &Verified, now: DateTime<Utc>) -> Result<(), AuthError> {
        let Some(remaining) = verified.remaining(now) else {
            // Already expired, nothing left to block
            return Ok(());
        };

        self.revocations
            .revoke(token, remaining)
            .await
            .map_err(AuthError::Revocation)
    }

    /// Gate for protected user routes
    ///
    /// `resource_id` is the account id named by the route, when it names one.
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        resource_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Authorized, AuthError> {
        let token = bearer.ok_or(AuthError::MissingToken)?;
        let verified = self.verifier.verify(token, Some(ActorType::User), now)?;

        if self
            .revocations
            .is_revoked(token)
            .await
            .map_err(AuthError::Revocation)?
        {
            return Err(AuthError::TokenRevoked);
        }

        if let Some(resource_id) = resource_id {
            let owner = resource_id.parse::<AccountId>().map_err(|_| AuthError::ResourceMismatch)?;
            if owner != verified.identity.id() {
                return Err(AuthError::ResourceMismatch);
            }
        }

        Ok(Authorized {
            token: token.to_string(),
            verified,
        })
    }

    /// Issue a pair for another service acting on behalf of `id`
    pub fn get_jwt(&self, id: AccountId, type_name: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let actor = type_name
            .parse::<ActorType>()
            .map_err(|_| TokenError::UnknownOrWrongActorType)?;

        Ok(self.tokens.issue_pair(Identity::new(actor, id), now)?)
    }
}

fn invalid_input(errors: ValidationErrors) -> AuthError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect();
    messages.sort();
    AuthError::InvalidInput(messages.join("; "))
}
