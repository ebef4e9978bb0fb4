//! Business logic services.
//!
//! Services contain the key lifecycle rules, separated from HTTP handlers.
//! Each mutating operation is a single read-modify-write cycle on the `KeyStore`.

pub mod admin_service;
pub mod validator;
