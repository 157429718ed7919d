//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::auth::{JwtService, PasswordService, RevocationStore};
use crate::config::AppConfig;
use crate::repositories::UserDirectory;
use crate::services::{AuthService, ProfileService};
use std::sync::Arc;

/// Shared application state
///
/// All fields are `Arc`s or wrap them, so cloning per request is O(1).
#[derive(Clone)]
pub struct AppState {
    /// User store, shared with the services
    pub users: Arc<dyn UserDirectory>,
    /// Revoked access tokens
    pub revocations: Arc<dyn RevocationStore>,
    pub auth: AuthService,
    pub profiles: ProfileService,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire the services from the configured secrets and lifetimes
    pub fn new(users: Arc<dyn UserDirectory>, revocations: Arc<dyn RevocationStore>, config: AppConfig) -> Self {
        let passwords = PasswordService::new(config.auth.salt.clone());
        let tokens = JwtService::new(
            config.auth.hs256_secret.clone(),
            config.auth.access_token_ttl_secs(),
            config.auth.refresh_token_ttl_secs(),
        );

        Self {
            auth: AuthService::new(users.clone(), revocations.clone(), passwords, tokens),
            profiles: ProfileService::new(users.clone()),
            users,
            revocations,
            config: Arc::new(config),
        }
    }

    /// Get a reference to the configuration
    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
