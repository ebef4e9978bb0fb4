//! Data models for stored key records and the HTTP request/response bodies.

/// Admin endpoint bodies
pub mod admin;
/// Stored key records
pub mod key_record;
/// Validation endpoint bodies
pub mod validation;
