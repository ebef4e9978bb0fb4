//! Administrative key operations.
//!
//! Every mutation is one `KeyStore::update` cycle, so admin changes are
//! serialized with validations and with each other.

use crate::{
    error::AppError,
    models::key_record::{KeyListing, KeyRecord},
    store::KeyStore,
};
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};

/// Length of the random part of a generated key.
///
/// 32 symbols from a 62-symbol alphabet is roughly 190 bits of entropy.
pub const KEY_RANDOM_LEN: usize = 32;

const MAX_PREFIX_LEN: usize = 32;

/// Options for a newly generated key.
#[derive(Debug, Default, Clone)]
pub struct NewKey {
    pub prefix: Option<String>,
    pub owner: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Generate a fresh key, store it with default state and return it.
///
/// # Errors
///
/// - `InvalidRequest`: prefix is empty, too long or contains characters outside `[A-Za-z0-9_-]`
/// - `Storage`: the document could not be written
pub async fn generate_key(store: &KeyStore, new_key: NewKey) -> Result<String, AppError> {
    let prefix = match new_key.prefix.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(prefix) => {
            validate_prefix(prefix)?;
            Some(prefix.to_string())
        }
    };

    let key = store
        .update(|keys, now| {
            // Regenerate on collision; never overwrite an existing record.
            let key = loop {
                let candidate = random_key(prefix.as_deref());
                if !keys.contains_key(&candidate) {
                    break candidate;
                }
                tracing::warn!("generated key collided with an existing key, regenerating");
            };

            let record = KeyRecord::new(now)
                .with_owner(new_key.owner)
                .with_expiry(new_key.expires_at);
            keys.insert(key.clone(), record);

            Ok::<_, AppError>(key)
        })
        .await?;

    tracing::info!(key = %key, "key generated");
    Ok(key)
}

/// Remove a key.
pub async fn delete_key(store: &KeyStore, key: &str) -> Result<(), AppError> {
    store
        .update(|keys, _| keys.remove(key).map(drop).ok_or(AppError::KeyNotFound))
        .await?;

    tracing::info!(key, "key deleted");
    Ok(())
}

/// Flip `active` and return the new value.
pub async fn toggle_active(store: &KeyStore, key: &str) -> Result<bool, AppError> {
    let active = store
        .update(|keys, _| {
            let record = keys.get_mut(key).ok_or(AppError::KeyNotFound)?;
            record.active = !record.active;
            Ok::<_, AppError>(record.active)
        })
        .await?;

    tracing::info!(key, active, "key activation toggled");
    Ok(active)
}

/// Flip `blacklisted` and return the new value.
pub async fn toggle_blacklist(store: &KeyStore, key: &str) -> Result<bool, AppError> {
    let blacklisted = store
        .update(|keys, _| {
            let record = keys.get_mut(key).ok_or(AppError::KeyNotFound)?;
            record.blacklisted = !record.blacklisted;
            Ok::<_, AppError>(record.blacklisted)
        })
        .await?;

    tracing::info!(key, blacklisted, "key blacklist toggled");
    Ok(blacklisted)
}

/// Clear the hardware binding (and the user binding when `clear_user` is set).
///
/// Returns the updated reset count.
pub async fn reset_binding(store: &KeyStore, key: &str, clear_user: bool) -> Result<u64, AppError> {
    let resets = store
        .update(|keys, _| {
            let record = keys.get_mut(key).ok_or(AppError::KeyNotFound)?;
            record.hardware_id = None;
            if clear_user {
                record.user_id = None;
            }
            record.hwid_reset_count += 1;
            Ok::<_, AppError>(record.hwid_reset_count)
        })
        .await?;

    tracing::info!(key, resets, clear_user, "key binding reset");
    Ok(resets)
}

/// Every record with its key string, sorted by key.
pub async fn list_keys(store: &KeyStore) -> Vec<KeyListing> {
    store
        .read(|keys| {
            keys.iter()
                .map(|(key, record)| KeyListing {
                    key: key.clone(),
                    record: record.clone(),
                })
                .collect()
        })
        .await
}

fn validate_prefix(prefix: &str) -> Result<(), AppError> {
    if prefix.len() > MAX_PREFIX_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Prefix must be at most {} characters",
            MAX_PREFIX_LEN
        )));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::InvalidRequest(
            "Prefix may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }

    Ok(())
}

fn random_key(prefix: Option<&str>) -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_RANDOM_LEN)
        .map(char::from)
        .collect();

    match prefix {
        Some(prefix) => format!("{}_{}", prefix, random),
        None => random,
    }
}
