//! Token revocation ledger
//!
//! Logout records the presented access token here with a TTL equal to the
//! token's remaining lifetime, so an entry never outlives the token it
//! blocks. Entries are keyed by the literal token string: revoking one
//! token leaves the user's other sessions untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const KEY_PREFIX: &str = "revoked_token:";

/// Storage for revoked tokens
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Mark `token` invalid for `ttl`
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<()>;

    /// Whether `token` is currently revoked
    async fn is_revoked(&self, token: &str) -> Result<bool>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> Result<()>;

    /// Why a reachable store still falls short of a shared ledger
    fn degraded_reason(&self) -> Option<&'static str> {
        None
    }
}

/// Redis-backed ledger (`SET key 1 EX ttl` / `EXISTS key`)
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }
}

/// Whole seconds covering `ttl`; Redis rejects `EX 0`
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(Self::key(token))
            .arg(1)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
            .context("redis SET failed")
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        redis::cmd("EXISTS")
            .arg(Self::key(token))
            .query_async::<_, bool>(&mut conn)
            .await
            .context("redis EXISTS failed")
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .context("redis PING failed")
    }
}

/// Process-local ledger
///
/// Used in tests, and outside production when Redis is unavailable.
/// Revocations are lost on restart and are not shared between instances.
#[derive(Default)]
pub struct MemoryRevocationStore {
    entries: RwLock<HashMap<String, Instant>>,
    fallback: bool,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger standing in for an unreachable Redis; readiness reports it as degraded
    pub fn fallback() -> Self {
        Self {
            fallback: true,
            ..Self::default()
        }
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|deadline| **deadline > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let deadline = now.checked_add(ttl).context("revocation ttl out of range")?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, deadline| *deadline > now);
        entries.insert(token.to_string(), deadline);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(token)
            .is_some_and(|deadline| *deadline > Instant::now()))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn degraded_reason(&self) -> Option<&'static str> {
        self.fallback
            .then_some("in-memory fallback; revocations are not shared between instances")
    }
}
