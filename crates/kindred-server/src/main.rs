//! # kindred-server
//!
//! HTTP boundary for the Kindred social-matching service.
//!
//! This binary provides:
//! - **REST API** (axum) for registration, login, matchmaking, the friend
//!   workflow, abuse reports and account deletion
//! - **Session tokens**: opaque bearer tokens with a fixed TTL
//! - **Per-IP throttling** to protect against abuse
//!
//! All domain rules live in `kindred-core`; the server only maps HTTP
//! requests onto core operations and core results onto status codes.

mod api;
mod config;
mod error;
mod rate_limit;
mod sessions;

use std::sync::Arc;

use chrono::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kindred_core::Argon2Hasher;
use kindred_shared::constants::SESSION_TTL_DAYS;
use kindred_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::rate_limit::IpThrottle;
use crate::sessions::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kindred_server=debug")),
        )
        .init();

    info!("Starting Kindred server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Store (runs migrations on open).
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    // Session store: 7-day opaque bearer tokens.
    let sessions = Arc::new(SessionStore::new(Duration::days(SESSION_TTL_DAYS)));

    // Throttle: 10 req/s sustained, burst of 30.
    let throttle = IpThrottle::new(10.0, 30.0, config.trust_proxy);

    let app_state = AppState {
        db: Arc::new(tokio::sync::Mutex::new(db)),
        sessions: sessions.clone(),
        hasher: Arc::new(Argon2Hasher),
        throttle: throttle.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------
    // Cache hygiene only; domain state has no background jobs (ban expiry is
    // a read-time check).

    // Periodic throttle cleanup (every 5 minutes, evict buckets idle >10 min)
    let th = throttle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            th.purge_idle(600.0).await;
        }
    });

    // Periodic session cleanup (every 10 minutes)
    let se = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            se.purge_expired().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let http_addr = config.http_addr;

    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
