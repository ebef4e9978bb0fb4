//! Admin HTTP handlers.
//!
//! All routes here sit behind `admin_auth_middleware`:
//! - GET /admin/keys - List every key
//! - POST /admin/keys - Generate a key
//! - DELETE /admin/keys/{key} - Delete a key
//! - POST /admin/keys/{key}/toggle - Enable/disable a key
//! - POST /admin/keys/{key}/blacklist - Blacklist/unblacklist a key
//! - POST /admin/keys/{key}/reset-hwid - Clear the device binding (`?includeUser=true` also clears the user)
//! - POST /admin/reload - Re-read the key document from disk

use crate::{
    error::AppError,
    middleware::auth::AdminContext,
    models::{
        admin::{
            ActiveToggleResponse, BlacklistToggleResponse, GenerateKeyRequest,
            GenerateKeyResponse, ReloadResponse, ResetBindingQuery, ResetBindingResponse,
        },
        key_record::KeyListing,
    },
    routes::AppState,
    services::admin_service::{self, NewKey},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

/// List all keys with their full state.
///
/// # Response (200)
///
/// ```json
/// [
///   {
///     "key": "scriptkey",
///     "active": true,
///     "blacklisted": false,
///     "hardwareId": "ABC123XYZ",
///     "userId": null,
///     "expiresAt": null,
///     "executionCount": 12,
///     "hwidResetCount": 0,
///     "createdAt": "2025-12-20T10:00:00Z",
///     "owner": "Admin"
///   }
/// ]
/// ```
pub async fn list_keys(State(state): State<AppState>) -> Json<Vec<KeyListing>> {
    Json(admin_service::list_keys(&state.store).await)
}

/// Generate a new key.
///
/// # Request Body
///
/// ```json
/// { "prefix": "promo", "owner": "TestUser", "expiresAt": "2026-12-31T00:00:00Z" }
/// ```
///
/// # Response
///
/// - **201 Created**: `{ "key": "promo_...", "expires": "2026-12-31T00:00:00+00:00" }`
/// - **400**: invalid prefix
pub async fn generate_key(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Json(request): Json<GenerateKeyRequest>,
) -> Result<(StatusCode, Json<GenerateKeyResponse>), AppError> {
    let expires_at = request.expires_at;
    let key = admin_service::generate_key(
        &state.store,
        NewKey {
            prefix: request.prefix,
            owner: request.owner,
            expires_at,
        },
    )
    .await?;

    tracing::info!(admin = %admin.fingerprint, key = %key, "admin generated key");

    let expires = expires_at
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "Never".to_string());

    Ok((StatusCode::CREATED, Json(GenerateKeyResponse { key, expires })))
}

/// Delete a key.
///
/// Returns 204 No Content, or 404 if the key does not exist.
pub async fn delete_key(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_key(&state.store, &key).await?;
    tracing::info!(admin = %admin.fingerprint, key = %key, "admin deleted key");

    Ok(StatusCode::NO_CONTENT)
}

/// Flip the `active` flag.
///
/// # Response (200)
///
/// ```json
/// { "key": "scriptkey", "active": false }
/// ```
pub async fn toggle_active(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(key): Path<String>,
) -> Result<Json<ActiveToggleResponse>, AppError> {
    let active = admin_service::toggle_active(&state.store, &key).await?;
    tracing::info!(admin = %admin.fingerprint, key = %key, active, "admin toggled key");

    Ok(Json(ActiveToggleResponse { key, active }))
}

/// Flip the `blacklisted` flag.
///
/// # Response (200)
///
/// ```json
/// { "key": "scriptkey", "blacklisted": true }
/// ```
pub async fn toggle_blacklist(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(key): Path<String>,
) -> Result<Json<BlacklistToggleResponse>, AppError> {
    let blacklisted = admin_service::toggle_blacklist(&state.store, &key).await?;
    tracing::info!(admin = %admin.fingerprint, key = %key, blacklisted, "admin toggled blacklist");

    Ok(Json(BlacklistToggleResponse { key, blacklisted }))
}

/// Clear the device binding so the key can be used on a new machine.
///
/// `POST /admin/keys/{key}/reset-hwid?includeUser=true` also clears the user
/// binding. Without the parameter, `RESET_USER_ON_UNBIND` decides.
pub async fn reset_binding(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(key): Path<String>,
    Query(query): Query<ResetBindingQuery>,
) -> Result<Json<ResetBindingResponse>, AppError> {
    let clear_user = query
        .include_user
        .unwrap_or(state.config.reset_user_on_unbind);

    let hwid_reset_count = admin_service::reset_binding(&state.store, &key, clear_user).await?;
    tracing::info!(admin = %admin.fingerprint, key = %key, clear_user, "admin reset binding");

    Ok(Json(ResetBindingResponse {
        key,
        hwid_reset_count,
    }))
}

/// Discard the in-memory collection and re-read the document.
pub async fn reload(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
) -> Json<ReloadResponse> {
    let total = state.store.reload().await;
    tracing::info!(admin = %admin.fingerprint, total, "admin reloaded key document");

    Json(ReloadResponse { total })
}
