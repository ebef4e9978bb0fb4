//! Key document persistence.
//!
//! The whole key collection lives in one JSON document on disk. `KeyStore`
//! keeps a copy of it in memory behind a single async mutex and writes the
//! full document back after every mutation.
//!
//! # Concurrency
//!
//! Every read-modify-write runs inside [`KeyStore::update`], which holds the
//! lock for the complete decide → mutate → save cycle. Two first-use
//! validations of the same key can therefore never both observe an unbound
//! record, and an execution-count increment can never be overwritten by a
//! concurrent admin save.
//!
//! # Failure policy
//!
//! - Reading: a missing, unreadable or malformed document degrades to an empty
//!   collection (logged), the service keeps running.
//! - Writing: mutations are applied to a draft copy, the draft only replaces the
//!   in-memory collection once the document was written. A failed write leaves
//!   both the file and the cache untouched and is reported to the caller.

use crate::{
    clock::Clock,
    models::key_record::{KeyMap, KeyRecord},
};
use chrono::{DateTime, Utc};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;

/// Failure to make a mutation durable.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize key document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write key document {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Record written when the key document does not exist yet.
#[derive(Debug, Clone)]
pub struct Seed {
    pub key: String,
    pub owner: Option<String>,
}

/// Shared handle to the key document.
pub struct KeyStore {
    path: PathBuf,
    keys: Mutex<KeyMap>,
    clock: Arc<dyn Clock>,
}

impl KeyStore {
    /// Open the document at `path`.
    ///
    /// A missing document is created containing only the seed record. An
    /// existing but unreadable document, or one whose existence cannot be
    /// determined, is treated as empty and never overwritten with the seed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the seeded document cannot be written.
    pub async fn open(path: PathBuf, seed: Seed, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        let keys = match tokio::fs::try_exists(&path).await {
            Ok(true) => load(&path).await,
            Ok(false) => seed_document(&path, &seed, clock.as_ref()).await?,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to stat key document, starting empty");
                KeyMap::new()
            }
        };

        Ok(Self {
            path,
            keys: Mutex::new(keys),
            clock,
        })
    }

    /// Build a store around an in-memory collection without touching the disk.
    #[cfg(test)]
    pub fn with_keys(path: PathBuf, keys: KeyMap, clock: Arc<dyn Clock>) -> Self {
        Self {
            path,
            keys: Mutex::new(keys),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    /// Run a read-only closure against the collection.
    pub async fn read<T>(&self, f: impl FnOnce(&KeyMap) -> T) -> T {
        let keys = self.keys.lock().await;
        f(&keys)
    }

    /// Run one read-modify-write cycle under the store lock.
    ///
    /// The closure receives a draft of the collection and the current time. If
    /// it returns `Ok` and the draft differs from the current collection, the
    /// draft is written to disk and then becomes the current collection. An
    /// `Err` from the closure or from the write discards the draft.
    pub async fn update<T, E>(
        &self,
        f: impl FnOnce(&mut KeyMap, DateTime<Utc>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut keys = self.keys.lock().await;
        let mut draft = keys.clone();

        let output = f(&mut draft, self.clock.now_utc())?;

        if draft != *keys {
            persist(&self.path, &draft).await?;
            *keys = draft;
        }

        Ok(output)
    }

    /// Replace the in-memory collection with the current document on disk.
    ///
    /// Returns the number of records loaded.
    pub async fn reload(&self) -> usize {
        let mut keys = self.keys.lock().await;
        *keys = load(&self.path).await;
        keys.len()
    }
}

/// Create the document containing only the seed record.
async fn seed_document(path: &Path, seed: &Seed, clock: &dyn Clock) -> Result<KeyMap, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }

    let mut keys = KeyMap::new();
    keys.insert(
        seed.key.clone(),
        KeyRecord::new(clock.now_utc()).with_owner(seed.owner.clone()),
    );
    persist(path, &keys).await?;
    tracing::info!(path = %path.display(), seed = %seed.key, "created key document");
    Ok(keys)
}

/// Read the whole document, degrading to an empty collection on any failure.
async fn load(path: &Path) -> KeyMap {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read key document, starting empty");
            return KeyMap::new();
        }
    };

    match serde_json::from_str::<KeyMap>(&raw) {
        Ok(keys) => {
            tracing::debug!(path = %path.display(), total = keys.len(), "loaded key document");
            keys
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to parse key document, starting empty");
            KeyMap::new()
        }
    }
}

/// Write the whole document atomically: temp file in the same directory, then rename.
async fn persist(path: &Path, keys: &KeyMap) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(keys)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "keys.json".to_string());
    let temp_path = path.with_file_name(format!("{}.tmp", file_name));

    tokio::fs::write(&temp_path, &json)
        .await
        .map_err(|source| StoreError::Write {
            path: temp_path.clone(),
            source,
        })?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(path = %path.display(), total = keys.len(), "saved key document");
    Ok(())
}
