//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, query string, URL params)
//! 2. Delegates to a service in `crate::services`
//! 3. Returns HTTP response (JSON, status code)

/// Admin key management endpoints
pub mod admin;
/// Service status endpoint
pub mod health;
/// Public key validation endpoints
pub mod validate;
