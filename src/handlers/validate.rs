//! Public validation endpoints.
//!
//! - POST /validate - JSON body
//! - GET /validate - query string, for executors that cannot send POST bodies
//!
//! Both answer 200 with a `ValidateResponse`; a denied key is `success: false`,
//! not an HTTP error.

use crate::{
    error::AppError,
    models::validation::{ValidateRequest, ValidateResponse},
    routes::AppState,
    services::validator,
};
use axum::{
    Json,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
};

/// Validate a key from a JSON body.
///
/// A body that is not a JSON object of the expected shape (wrong content type,
/// malformed JSON, non-string key) is treated as a request without a key and
/// answered with the "No key provided" denial.
///
/// # Request Body
///
/// ```json
/// {
///   "key": "scriptkey",
///   "hwid": "ABC123XYZ",
///   "username": "player1",
///   "userId": "123456"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "message": "Key validated successfully",
///   "executions": 1,
///   "expires": "Never",
///   "owner": "Admin"
/// }
/// ```
pub async fn validate_post(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable validation body");
            ValidateRequest::default()
        }
    };

    let response = validator::validate(&state.store, &request).await?;
    Ok(Json(response))
}

/// Validate a key from query parameters.
///
/// `GET /validate?key=scriptkey&hwid=ABC123XYZ&username=player1&userId=123456`
pub async fn validate_get(
    State(state): State<AppState>,
    query: Result<Query<ValidateRequest>, QueryRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let request = match query {
        Ok(Query(request)) => request,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "unreadable validation query");
            ValidateRequest::default()
        }
    };

    let response = validator::validate(&state.store, &request).await?;
    Ok(Json(response))
}
