//! Admin key authentication middleware.
//!
//! This middleware guards every admin route:
//! 1. Extract the admin key from the `x-admin-key` header
//!    (an empty header, or an empty configured key, never authenticates)
//! 2. Compare its SHA-256 digest with the digest of the configured key
//! 3. Inject an `AdminContext` into the request
//! 4. Reject anything else with HTTP 401

use crate::{error::AppError, routes::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

/// Header carrying the shared admin secret.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Authentication context attached to admin requests.
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// First 8 hex characters of the admin key digest, safe to log
    pub fingerprint: String,
}

/// Admin authentication middleware function.
///
/// # Headers
///
/// ```text
/// x-admin-key: <ADMIN_KEY>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if the key matches (calls next handler)
/// - `Err(AppError::InvalidAdminKey)` otherwise (returns 401)
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let supplied = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|key| !key.is_empty())
        .ok_or(AppError::InvalidAdminKey)?;

    if state.config.admin_key.is_empty() {
        tracing::warn!(path = %request.uri().path(), "admin key not configured, rejecting admin request");
        return Err(AppError::InvalidAdminKey);
    }

    // Digests have a fixed length, so the comparison does not depend on the secret's length.
    let supplied_hash = Sha256::digest(supplied.as_bytes());
    let expected_hash = Sha256::digest(state.config.admin_key.as_bytes());

    if supplied_hash != expected_hash {
        tracing::warn!(path = %request.uri().path(), "rejected admin request");
        return Err(AppError::InvalidAdminKey);
    }

    let context = AdminContext {
        fingerprint: hex::encode(&supplied_hash[..4]),
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
