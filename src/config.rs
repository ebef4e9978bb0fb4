//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;
use std::path::PathBuf;

/// Failure to build a usable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("ADMIN_KEY must not be empty")]
    EmptyAdminKey,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `ADMIN_KEY` (required, non-blank): shared secret expected in the `x-admin-key` header
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `KEYS_FILE` (optional): path of the key document, defaults to `keys.json`
/// - `SEED_KEY` / `SEED_OWNER` (optional): record written when the document does not exist yet
/// - `RESET_USER_ON_UNBIND` (optional): whether a binding reset also clears the user id
/// - `PUBLIC_DIR` (optional): directory of static assets served for unmatched paths
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub admin_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_keys_file")]
    pub keys_file: PathBuf,

    #[serde(default = "default_seed_key")]
    pub seed_key: String,

    #[serde(default = "default_seed_owner")]
    pub seed_owner: String,

    #[serde(default)]
    pub reset_user_on_unbind: bool,

    #[serde(default)]
    pub public_dir: Option<PathBuf>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_keys_file() -> PathBuf {
    PathBuf::from("keys.json")
}

fn default_seed_key() -> String {
    "scriptkey".to_string()
}

fn default_seed_owner() -> String {
    "Admin".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., ADMIN_KEY)
    /// - Environment variable values cannot be parsed into expected types
    /// - ADMIN_KEY is empty or whitespace
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Build the configuration from explicit `NAME=value` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // Field names are automatically converted: keys_file -> KEYS_FILE
        let config = envy::from_iter::<_, Config>(vars)?;

        if config.admin_key.trim().is_empty() {
            return Err(ConfigError::EmptyAdminKey);
        }

        Ok(config)
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests; the keys file is never touched through it.
    pub fn for_tests(admin_key: &str) -> Self {
        Self {
            admin_key: admin_key.to_string(),
            server_port: default_port(),
            keys_file: default_keys_file(),
            seed_key: default_seed_key(),
            seed_owner: default_seed_owner(),
            reset_user_on_unbind: false,
            public_dir: None,
        }
    }
}
