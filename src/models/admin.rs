//! Request and response bodies of the admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for generating a key.
///
/// # JSON Example
///
/// ```json
/// {
///   "prefix": "promo",
///   "owner": "TestUser",
///   "expiresAt": "2026-12-31T00:00:00Z"
/// }
/// ```
///
/// All fields are optional; an empty body `{}` generates an unprefixed, non-expiring key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeyRequest {
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    /// RFC 3339 timestamp or `YYYY-MM-DD` date
    #[serde(default, deserialize_with = "crate::models::key_record::deserialize_expiry")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response of a successful generate call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeyResponse {
    pub key: String,
    pub expires: String,
}

/// Response of the activation toggle.
#[derive(Debug, Serialize)]
pub struct ActiveToggleResponse {
    pub key: String,
    pub active: bool,
}

/// Response of the blacklist toggle.
#[derive(Debug, Serialize)]
pub struct BlacklistToggleResponse {
    pub key: String,
    pub blacklisted: bool,
}

/// Query string of the binding reset endpoint.
///
/// `includeUser` overrides `RESET_USER_ON_UNBIND` for this one reset.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetBindingQuery {
    #[serde(default)]
    pub include_user: Option<bool>,
}

/// Response of the binding reset endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetBindingResponse {
    pub key: String,
    pub hwid_reset_count: u64,
}

/// Response of the reload endpoint.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub total: usize,
}
