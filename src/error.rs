//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! Validation denials are not errors: they are answered with a structured
//! `ValidateResponse`. Only admin failures and storage write failures end up here.

use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Storage Errors**: the key document could not be written
/// - **Authentication Errors**: missing or wrong admin key
/// - **Resource Errors**: admin operation on a key that does not exist
/// - **Validation Errors**: invalid admin request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Persisting the key document failed; the mutation was discarded.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// `x-admin-key` header is missing or does not match.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid admin key")]
    InvalidAdminKey,

    /// Admin operation targeted a key that is not in the store.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Key not found")]
    KeyNotFound,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidAdminKey` → 401 Unauthorized
/// - `KeyNotFound` → 404 Not Found
/// - `InvalidRequest` → 400 Bad Request
/// - `Storage` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidAdminKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_admin_key",
                self.to_string(),
            ),
            AppError::KeyNotFound => (StatusCode::NOT_FOUND, "key_not_found", self.to_string()),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Storage(ref err) => {
                tracing::error!(error = %err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
