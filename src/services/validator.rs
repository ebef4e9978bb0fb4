//! Key validation - the lifecycle state machine.
//!
//! # Decision order
//!
//! Checks run in this order, the first failing one wins:
//!
//! 1. key supplied (not empty, not the `"null"` / `"undefined"` sentinels)
//! 2. key exists
//! 3. not blacklisted (dominates `active`, so reactivation cannot lift a blacklist)
//! 4. active
//! 5. hardware binding matches, if the key is bound to a device
//! 6. user binding matches, if the key is bound to a user
//! 7. not expired
//!
//! Only a request that passes every check mutates the record: unset bindings
//! are filled from the claim and the execution count is incremented. Expiry is
//! checked before binding, so an expired key never acquires a binding.
//!
//! The whole decision runs inside one `KeyStore::update` cycle, which makes
//! first-use binding exactly-once under concurrent requests.

use crate::{
    error::AppError,
    models::{
        key_record::KeyRecord,
        validation::{ValidateRequest, ValidateResponse},
    },
    store::KeyStore,
};
use chrono::{DateTime, Utc};

/// Why a validation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("No key provided")]
    NoKey,

    #[error("Invalid key")]
    NotFound,

    #[error("Key has been blacklisted")]
    Blacklisted,

    #[error("Key has been disabled")]
    Disabled,

    #[error("Key is bound to another device")]
    DeviceMismatch,

    #[error("Key is bound to another user")]
    UserMismatch,

    #[error("Key has expired")]
    Expired,
}

/// Identity the client claims for this validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Claim<'a> {
    pub hwid: Option<&'a str>,
    pub user_id: Option<&'a str>,
}

impl<'a> Claim<'a> {
    pub fn from_request(request: &'a ValidateRequest) -> Self {
        Self {
            hwid: non_empty(request.hwid.as_deref()),
            user_id: non_empty(request.user_id.as_deref()),
        }
    }
}

/// Result of an accepted validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Acceptance {
    pub executions: u64,
    pub expires: String,
    pub owner: Option<String>,
    pub bound_hwid: bool,
    pub bound_user: bool,
}

/// Map the "no key" forms to `None`.
///
/// Any other value is looked up exactly as supplied, surrounding whitespace
/// included.
pub fn supplied_key(raw: Option<&str>) -> Option<&str> {
    match raw? {
        "" | "null" | "undefined" => None,
        key => Some(key),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Run the state machine against one record and apply the accepted-path mutations.
///
/// `record` is `None` when the key is not in the store. On any denial the
/// record is left untouched.
pub fn decide(
    record: Option<&mut KeyRecord>,
    claim: &Claim<'_>,
    now: DateTime<Utc>,
) -> Result<Acceptance, Denial> {
    let record = record.ok_or(Denial::NotFound)?;

    if record.blacklisted {
        return Err(Denial::Blacklisted);
    }

    if !record.active {
        return Err(Denial::Disabled);
    }

    if let Some(bound) = record.hardware_id.as_deref() {
        if claim.hwid != Some(bound) {
            return Err(Denial::DeviceMismatch);
        }
    }

    if let Some(bound) = record.user_id.as_deref() {
        if claim.user_id != Some(bound) {
            return Err(Denial::UserMismatch);
        }
    }

    if record.expires_at.is_some_and(|expires_at| expires_at < now) {
        return Err(Denial::Expired);
    }

    let mut bound_hwid = false;
    if record.hardware_id.is_none() {
        if let Some(hwid) = claim.hwid {
            record.hardware_id = Some(hwid.to_string());
            bound_hwid = true;
        }
    }

    let mut bound_user = false;
    if record.user_id.is_none() {
        if let Some(user_id) = claim.user_id {
            record.user_id = Some(user_id.to_string());
            bound_user = true;
        }
    }

    record.execution_count += 1;

    Ok(Acceptance {
        executions: record.execution_count,
        expires: record.expires_label(),
        owner: record.owner.clone(),
        bound_hwid,
        bound_user,
    })
}

/// Validate a key and persist the resulting bindings and execution count.
///
/// Denials come back as `Ok` with `success: false`; the only error is a failed
/// write of an accepted validation, in which case nothing was recorded.
pub async fn validate(
    store: &KeyStore,
    request: &ValidateRequest,
) -> Result<ValidateResponse, AppError> {
    let username = request.username.as_deref().unwrap_or("Unknown");

    let Some(key) = supplied_key(request.key.as_deref()) else {
        tracing::info!(username, "validation without key");
        return Ok(denied(Denial::NoKey));
    };

    let claim = Claim::from_request(request);
    let verdict = store
        .update(|keys, now| Ok::<_, AppError>(decide(keys.get_mut(key), &claim, now)))
        .await?;

    match verdict {
        Ok(acceptance) => {
            if acceptance.bound_hwid {
                tracing::info!(key, hwid = claim.hwid, "key bound to hardware id");
            }
            if acceptance.bound_user {
                tracing::info!(key, user_id = claim.user_id, "key bound to user id");
            }
            tracing::info!(
                key,
                username,
                executions = acceptance.executions,
                "key validated"
            );

            Ok(ValidateResponse {
                success: true,
                message: "Key validated successfully".to_string(),
                executions: Some(acceptance.executions),
                expires: Some(acceptance.expires),
                owner: acceptance.owner,
            })
        }
        Err(denial) => {
            tracing::info!(key, username, hwid = claim.hwid, reason = %denial, "validation denied");
            Ok(denied(denial))
        }
    }
}

fn denied(denial: Denial) -> ValidateResponse {
    ValidateResponse {
        success: false,
        message: denial.to_string(),
        executions: None,
        expires: None,
        owner: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::{Clock, MockClock},
        models::key_record::KeyMap,
    };
    use chrono::Duration;
    use std::sync::Arc;
    use tempfile::TempDir;

    const NOW: &str = "2025-06-01T12:00:00Z";

    fn now() -> DateTime<Utc> {
        MockClock::from_rfc3339(NOW).now_utc()
    }

    fn claim<'a>(hwid: Option<&'a str>, user_id: Option<&'a str>) -> Claim<'a> {
        Claim { hwid, user_id }
    }

    fn request(key: &str, hwid: Option<&str>) -> ValidateRequest {
        ValidateRequest {
            key: Some(key.to_string()),
            hwid: hwid.map(str::to_string),
            ..Default::default()
        }
    }

    async fn store_with(keys: KeyMap) -> (TempDir, KeyStore) {
        let tmp = TempDir::new().unwrap();
        let store = KeyStore::with_keys(
            tmp.path().join("keys.json"),
            keys,
            Arc::new(MockClock::from_rfc3339(NOW)),
        );
        (tmp, store)
    }

    fn single(key: &str, record: KeyRecord) -> KeyMap {
        let mut keys = KeyMap::new();
        keys.insert(key.to_string(), record);
        keys
    }

    #[test]
    fn sentinel_keys_count_as_missing() {
        assert_eq!(supplied_key(None), None);
        assert_eq!(supplied_key(Some("")), None);
        assert_eq!(supplied_key(Some("null")), None);
        assert_eq!(supplied_key(Some("undefined")), None);
        assert_eq!(supplied_key(Some("   ")), Some("   "));
        assert_eq!(supplied_key(Some(" K1 ")), Some(" K1 "));
    }

    #[test]
    fn unknown_key_is_not_found() {
        let verdict = decide(None, &claim(Some("H1"), Some("U1")), now());
        assert_eq!(verdict, Err(Denial::NotFound));
    }

    #[test]
    fn blacklist_dominates_reactivation() {
        let mut record = KeyRecord::new(now());
        record.blacklisted = true;
        record.active = true;

        assert_eq!(
            decide(Some(&mut record), &claim(None, None), now()),
            Err(Denial::Blacklisted)
        );

        record.active = false;
        assert_eq!(
            decide(Some(&mut record), &claim(None, None), now()),
            Err(Denial::Blacklisted)
        );
        assert_eq!(record.execution_count, 0);
    }

    #[test]
    fn disabled_key_is_rejected() {
        let mut record = KeyRecord::new(now());
        record.active = false;

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H1"), None), now()),
            Err(Denial::Disabled)
        );
        assert!(record.hardware_id.is_none());
    }

    #[test]
    fn first_use_binds_then_mismatch_is_rejected() {
        let mut record = KeyRecord::new(now());

        let accepted = decide(Some(&mut record), &claim(Some("H1"), None), now()).unwrap();
        assert!(accepted.bound_hwid);
        assert_eq!(accepted.executions, 1);
        assert_eq!(record.hardware_id.as_deref(), Some("H1"));

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H2"), None), now()),
            Err(Denial::DeviceMismatch)
        );
        assert_eq!(record.hardware_id.as_deref(), Some("H1"));
        assert_eq!(record.execution_count, 1);

        let again = decide(Some(&mut record), &claim(Some("H1"), None), now()).unwrap();
        assert!(!again.bound_hwid);
        assert_eq!(again.executions, 2);
    }

    #[test]
    fn bound_key_without_hwid_is_mismatch() {
        let mut record = KeyRecord::new(now());
        record.hardware_id = Some("ABC123XYZ".to_string());

        assert_eq!(
            decide(Some(&mut record), &claim(None, None), now()),
            Err(Denial::DeviceMismatch)
        );
    }

    #[test]
    fn user_binding_is_independent_of_hwid() {
        let mut record = KeyRecord::new(now());

        let accepted = decide(Some(&mut record), &claim(None, Some("U1")), now()).unwrap();
        assert!(accepted.bound_user);
        assert!(!accepted.bound_hwid);
        assert!(record.hardware_id.is_none());

        // hwid still binds later on
        decide(Some(&mut record), &claim(Some("H1"), Some("U1")), now()).unwrap();
        assert_eq!(record.hardware_id.as_deref(), Some("H1"));

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H1"), Some("U2")), now()),
            Err(Denial::UserMismatch)
        );
        assert_eq!(record.user_id.as_deref(), Some("U1"));
    }

    #[test]
    fn device_mismatch_dominates_expiry() {
        let mut record = KeyRecord::new(now()).with_expiry(Some(now() - Duration::days(1)));
        record.hardware_id = Some("H1".to_string());

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H2"), None), now()),
            Err(Denial::DeviceMismatch)
        );
    }

    #[test]
    fn expired_key_is_rejected_without_binding() {
        let mut record = KeyRecord::new(now()).with_expiry(Some(now() - Duration::seconds(1)));

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H1"), Some("U1")), now()),
            Err(Denial::Expired)
        );
        assert!(record.hardware_id.is_none());
        assert!(record.user_id.is_none());
        assert_eq!(record.execution_count, 0);
    }

    #[test]
    fn expired_key_with_matching_hwid_is_rejected() {
        let mut record = KeyRecord::new(now()).with_expiry(Some(now() - Duration::days(30)));
        record.hardware_id = Some("H1".to_string());

        assert_eq!(
            decide(Some(&mut record), &claim(Some("H1"), None), now()),
            Err(Denial::Expired)
        );
    }

    #[test]
    fn expiry_at_exactly_now_is_still_valid() {
        let mut record = KeyRecord::new(now()).with_expiry(Some(now()));

        let accepted = decide(Some(&mut record), &claim(None, None), now()).unwrap();
        assert_eq!(accepted.expires, now().to_rfc3339());
    }

    #[tokio::test]
    async fn bind_then_mismatch_persists_single_binding() {
        let (tmp, store) = store_with(single("K1", KeyRecord::new(now()))).await;

        let first = validate(&store, &request("K1", Some("H1"))).await.unwrap();
        assert!(first.success);
        assert_eq!(first.executions, Some(1));
        assert_eq!(first.expires.as_deref(), Some("Never"));

        let second = validate(&store, &request("K1", Some("H2"))).await.unwrap();
        assert!(!second.success);
        assert_eq!(second.message, "Key is bound to another device");
        assert_eq!(second.executions, None);

        let record = store.read(|keys| keys["K1"].clone()).await;
        assert_eq!(record.hardware_id.as_deref(), Some("H1"));
        assert_eq!(record.execution_count, 1);

        let raw = tokio::fs::read_to_string(tmp.path().join("keys.json"))
            .await
            .unwrap();
        let on_disk: KeyMap = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk["K1"].hardware_id.as_deref(), Some("H1"));
        assert_eq!(on_disk["K1"].execution_count, 1);
    }

    #[tokio::test]
    async fn missing_key_never_touches_store() {
        let (tmp, store) = store_with(single("K1", KeyRecord::new(now()))).await;

        let response = validate(&store, &ValidateRequest::default()).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "No key provided");

        let response = validate(&store, &request("nope", Some("H1"))).await.unwrap();
        assert_eq!(response.message, "Invalid key");

        assert!(!tmp.path().join("keys.json").exists());
    }

    #[tokio::test]
    async fn padded_key_does_not_match_stored_key() {
        let (tmp, store) = store_with(single("K1", KeyRecord::new(now()))).await;

        let response = validate(&store, &request(" K1 ", Some("H1"))).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "Invalid key");

        assert!(store.read(|keys| keys["K1"].hardware_id.is_none()).await);
        assert!(!tmp.path().join("keys.json").exists());
    }

    #[tokio::test]
    async fn accepted_validation_fails_when_write_fails() {
        let tmp = TempDir::new().unwrap();
        let store = KeyStore::with_keys(
            tmp.path().join("missing-dir").join("keys.json"),
            single("K1", KeyRecord::new(now())),
            Arc::new(MockClock::from_rfc3339(NOW)),
        );

        let result = validate(&store, &request("K1", Some("H1"))).await;
        assert!(matches!(result, Err(AppError::Storage(_))));

        let record = store.read(|keys| keys["K1"].clone()).await;
        assert!(record.hardware_id.is_none());
        assert_eq!(record.execution_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_binds_exactly_once() {
        let (_tmp, store) = store_with(single("K1", KeyRecord::new(now()))).await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let hwid = format!("H{}", i);
                validate(&store, &request("K1", Some(&hwid))).await.unwrap()
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().success {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 1);
        let record = store.read(|keys| keys["K1"].clone()).await;
        assert!(record.hardware_id.is_some());
        assert_eq!(record.execution_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_validations_do_not_lose_increments() {
        let (_tmp, store) = store_with(single("K1", KeyRecord::new(now()))).await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..25 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                validate(&store, &request("K1", Some("H1"))).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().success);
        }

        assert_eq!(store.read(|keys| keys["K1"].execution_count).await, 25);
    }
}
