//! Health check endpoint for service monitoring.

use crate::routes::AppState;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Number of keys currently loaded
    pub keys: usize,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,

    /// Public endpoint map
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

/// Health check handler, served on `/` and `/health`.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "online",
///   "keys": 3,
///   "timestamp": "2025-12-21T19:00:00Z",
///   "endpoints": {
///     "admin": "/admin/keys (x-admin-key)",
///     "health": "/ (GET)",
///     "validate": "/validate (GET, POST)"
///   }
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let keys = state.store.read(|keys| keys.len()).await;

    let endpoints = BTreeMap::from([
        ("validate", "/validate (GET, POST)"),
        ("health", "/ (GET)"),
        ("admin", "/admin/keys (x-admin-key)"),
    ]);

    Json(HealthResponse {
        status: "online".to_string(),
        keys,
        timestamp: state.store.now(),
        endpoints,
    })
}
