//! InnoTaxi users backend
//!
//! Account registration and session management for taxi passengers.
//!
//! ## Architecture
//!
//! - Routes: HTTP request handling, cookies and the authorization extractors
//! - Services: sign-up / sign-in / refresh / logout orchestration and profiles
//! - Repositories: user directory (PostgreSQL with SQLx)
//! - Revocation ledger: Redis, or process memory when Redis is unreachable

use std::sync::Arc;

use anyhow::Result;
use innotaxi_backend::{
    auth::{MemoryRevocationStore, RedisRevocationStore, RevocationStore},
    config, db,
    repositories::UserRepository,
    routes,
    state::AppState,
};
use redis::aio::ConnectionManager;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        access_token_minutes = config.auth.access_token_exp,
        refresh_token_days = config.auth.refresh_token_exp,
        "Starting InnoTaxi users backend"
    );

    if config::AppConfig::is_production() {
        validate_production_config(&config)?;
    }

    info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database).await?;

    // Production runs migrations as a separate job
    if !config::AppConfig::is_production() {
        db::run_migrations(&db_pool).await?;
    }

    let revocations = revocation_store(&config.redis.url, config::AppConfig::is_production()).await?;
    let users = Arc::new(UserRepository::new(db_pool));

    let state = AppState::new(users, revocations, config.clone());
    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Connect to Redis
///
/// Returns None if Redis is unavailable
async fn connect_redis(url: &str) -> Option<ConnectionManager> {
    info!("Connecting to Redis...");

    match redis::Client::open(url) {
        Ok(client) => match ConnectionManager::new(client).await {
            Ok(conn) => {
                info!("Redis connection established");
                Some(conn)
            }
            Err(e) => {
                warn!("Failed to connect to Redis: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("Invalid Redis URL: {}", e);
            None
        }
    }
}

/// Revocation ledger; outside production, process memory stands in for an unreachable Redis
async fn revocation_store(url: &str, require_redis: bool) -> Result<Arc<dyn RevocationStore>> {
    match connect_redis(url).await {
        Some(conn) => Ok(Arc::new(RedisRevocationStore::new(conn))),
        None if require_redis => {
            error!("Redis is unreachable; production needs a shared revocation store");
            anyhow::bail!("Redis is required in production")
        }
        None => {
            warn!("Using in-memory revocation store; logouts are not shared between instances and are lost on restart");
            Ok(Arc::new(MemoryRevocationStore::fallback()))
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "innotaxi_backend=info,tower_http=info".into()
        } else {
            "innotaxi_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Refuse to start in production with development secrets
fn validate_production_config(config: &config::AppConfig) -> Result<()> {
    let issues = config.production_issues();

    if config.database.url.contains("localhost") || config.database.url.contains("127.0.0.1") {
        warn!("Database URL contains localhost - ensure this is intentional for production");
    }
    if !config.auth.secure_cookie {
        warn!("Refresh cookie is not marked Secure");
    }

    if !issues.is_empty() {
        for issue in &issues {
            error!("Configuration error: {}", issue);
        }
        anyhow::bail!("Invalid production configuration");
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
