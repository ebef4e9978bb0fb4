//! Request and response bodies of the public validation endpoint.

use serde::{Deserialize, Deserializer, Serialize};

/// Validation request, accepted both as a JSON body and as a query string.
///
/// # JSON Example
///
/// ```json
/// {
///   "key": "scriptkey",
///   "hwid": "ABC123XYZ",
///   "username": "player1",
///   "userId": "123456"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    /// The license key; missing is treated like an empty key.
    #[serde(default)]
    pub key: Option<String>,

    /// Hardware identifier of the requesting device
    #[serde(default)]
    pub hwid: Option<String>,

    /// Display name, only logged
    #[serde(default)]
    pub username: Option<String>,

    /// Stable user identifier of the requesting account; numeric ids are accepted too
    #[serde(default, alias = "user_id", deserialize_with = "deserialize_user_id")]
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserId {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id: Option<UserId> = Option::deserialize(deserializer)?;
    Ok(id.map(|id| match id {
        UserId::Text(text) => text,
        UserId::Number(number) => number.to_string(),
    }))
}

/// Validation answer. Denials are reported here too, never as an HTTP error.
///
/// # JSON Example
///
/// ```json
/// {
///   "success": true,
///   "message": "Key validated successfully",
///   "executions": 4,
///   "expires": "Never",
///   "owner": "Admin"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidateResponse {
    pub success: bool,

    pub message: String,

    /// Execution count after this validation (accepted only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executions: Option<u64>,

    /// RFC 3339 expiry or `"Never"` (accepted only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}
