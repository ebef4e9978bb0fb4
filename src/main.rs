//! Script Key Server - Main Application Entry Point
//!
//! A license key validation service for scripts. Clients send a key plus an
//! optional hardware id and user id; the server answers whether the key is
//! valid and binds it to the first device/user that uses it. Admin endpoints
//! generate, disable, blacklist, delete and unbind keys.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Storage**: one JSON document, cached in memory and written through on every change
//! - **Authentication**: shared admin key in the `x-admin-key` header
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Open the key document (seeding it on first run)
//! 3. Build HTTP router with routes and middleware
//! 4. Start server on configured port

mod clock;
mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod store;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Open the key document
    let seed = store::Seed {
        key: config.seed_key.clone(),
        owner: Some(config.seed_owner.clone()),
    };
    let key_store = store::KeyStore::open(
        config.keys_file.clone(),
        seed,
        Arc::new(clock::SystemClock),
    )
    .await?;
    let total = key_store.read(|keys| keys.len()).await;
    tracing::info!(path = %key_store.path().display(), total, "Key store opened");

    let addr = format!("0.0.0.0:{}", config.server_port);

    let state = routes::AppState {
        store: Arc::new(key_store),
        config: Arc::new(config),
    };
    let app = routes::build_router(state);

    // Bind to network address and start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
