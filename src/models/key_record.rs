//! License key records as they are stored in the key document.
//!
//! The document is a single JSON object keyed by the license key string:
//!
//! ```json
//! {
//!   "scriptkey": {
//!     "active": true,
//!     "blacklisted": false,
//!     "hardwareId": null,
//!     "userId": null,
//!     "expiresAt": null,
//!     "executionCount": 0,
//!     "hwidResetCount": 0,
//!     "createdAt": "2025-12-20T10:00:00Z",
//!     "owner": "Admin"
//!   }
//! }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Every record in the store, keyed by license key string.
///
/// A `BTreeMap` keeps the persisted document sorted so diffs of the file stay readable.
pub type KeyMap = BTreeMap<String, KeyRecord>;

/// State of a single license key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    /// Administratively enabled. Disabled keys are rejected but keep their bindings.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Revoked by an administrator. Dominates `active`: re-enabling a blacklisted key
    /// does not let it validate again.
    #[serde(default)]
    pub blacklisted: bool,

    /// Hardware identifier bound on the first accepted validation that supplied one.
    #[serde(default)]
    pub hardware_id: Option<String>,

    /// User identifier, bound the same way as `hardware_id`.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Absolute expiry. `None` never expires.
    ///
    /// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC)
    /// so hand-written documents keep working.
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Number of accepted validations.
    #[serde(default)]
    pub execution_count: u64,

    /// Number of administrative binding resets.
    #[serde(default)]
    pub hwid_reset_count: u64,

    pub created_at: DateTime<Utc>,

    /// Free-form label, never consulted during validation.
    #[serde(default)]
    pub owner: Option<String>,
}

fn default_active() -> bool {
    true
}

impl KeyRecord {
    /// Fresh record: active, not blacklisted, unbound, zero counters.
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            active: true,
            blacklisted: false,
            hardware_id: None,
            user_id: None,
            expires_at: None,
            execution_count: 0,
            hwid_reset_count: 0,
            created_at,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Expiry as reported to clients: RFC 3339, or `"Never"`.
    pub fn expires_label(&self) -> String {
        self.expires_at
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "Never".to_string())
    }
}

/// Parse an expiry given either as RFC 3339 or as a calendar date.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub(crate) fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    raw.map(|value| {
        parse_expiry(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid expiry timestamp `{}`", value))
        })
    })
    .transpose()
}

/// A record together with its key string, as returned by the admin listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyListing {
    pub key: String,

    #[serde(flatten)]
    pub record: KeyRecord,
}
