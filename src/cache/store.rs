//! Backing stores for cached sheet exports
//!
//! [`FileStore`] persists one JSON file per key under a root directory.
//! [`MemoryStore`] keeps entries in a map and is used where touching the
//! filesystem is undesirable, such as tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

/// A cached payload as stored on disk
///
/// Serialized as `{ "content": ..., "timestamp": <ms since epoch>, "sourceKey": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The raw fetched payload
    pub content: String,
    /// When the payload was stored
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// The URL the payload was fetched from
    pub source_key: String,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time
    pub fn new(content: impl Into<String>, source_key: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: Utc::now(),
            source_key: source_key.into(),
        }
    }
}

/// Errors that can occur when writing to a cache store
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory creation or file writing failed
    #[error("Failed to write cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry could not be encoded
    #[error("Failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),

    /// The key cannot be used as a file name
    #[error("Invalid cache key: '{0}'")]
    InvalidKey(String),
}

/// Storage behind a [`SheetCache`](super::SheetCache)
///
/// Reads are infallible by contract: a missing, unreadable or corrupt entry is
/// reported as `None` so the caller falls back to a fresh fetch.
pub trait CacheStore: fmt::Debug + Send + Sync {
    /// Returns the entry stored under `key`, if it can be read
    fn read(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key`, replacing any previous entry
    fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// Stores each entry as `<key>.json` inside a cache directory
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `cache_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Directory where cache files are stored
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to a cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })
    }
}

/// Rejects keys that would escape the cache directory or produce odd names
fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        validate_key(key).ok()?;
        let path = self.cache_path(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt cache file");
                None
            }
        }
    }

    fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        validate_key(key)?;
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(entry)?;
        let path = self.cache_path(key);
        fs::write(&path, json).map_err(|source| CacheError::Io { path, source })
    }
}

/// Keeps entries in memory for the lifetime of the store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Option<CacheEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry.clone());
        Ok(())
    }
}
