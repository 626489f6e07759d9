//! Time-bounded cache for fetched sheet exports
//!
//! Provides a `SheetCache` that answers "is there fresh content for this key"
//! on top of any [`CacheStore`]. Freshness is judged against the entry's stored
//! timestamp, not the file modification time.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use super::store::{CacheEntry, CacheError, CacheStore, FileStore};

/// Default lifetime of a cache entry (one hour)
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// Source key recorded when the caller does not supply one
const UNKNOWN_SOURCE: &str = "unknown";

/// Reads and writes sheet exports with an expiry policy
///
/// An entry is fresh while `now - timestamp < lifetime`. Stale entries are
/// never returned; [`load`](Self::load) reports them as a miss.
#[derive(Debug)]
pub struct SheetCache {
    store: Box<dyn CacheStore>,
    lifetime: Duration,
}

impl SheetCache {
    /// Creates a cache over the given store
    pub fn new(store: Box<dyn CacheStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Creates a cache backed by JSON files in `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>, lifetime: Duration) -> Self {
        Self::new(Box::new(FileStore::new(cache_dir)), lifetime)
    }

    /// How long an entry stays fresh
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Returns true if a stored entry exists for `key` and is younger than the lifetime
    pub fn is_fresh(&self, key: &str) -> bool {
        self.store
            .read(key)
            .is_some_and(|entry| self.entry_is_fresh(&entry))
    }

    /// Returns the stored content for `key` if it is fresh
    ///
    /// Missing, corrupt and expired entries all come back as `None`.
    pub fn load(&self, key: &str) -> Option<String> {
        let Some(entry) = self.store.read(key) else {
            debug!(key, "cache miss");
            return None;
        };

        if self.entry_is_fresh(&entry) {
            debug!(key, source = %entry.source_key, "cache hit");
            Some(entry.content)
        } else {
            debug!(key, cached_at = %entry.timestamp, "cache entry expired");
            None
        }
    }

    /// Stores `content` under `key` with the current time
    pub fn store(&self, key: &str, content: &str) -> Result<(), CacheError> {
        self.store_for(key, UNKNOWN_SOURCE, content)
    }

    /// Stores `content` under `key`, recording the URL it was fetched from
    pub fn store_for(&self, key: &str, source_url: &str, content: &str) -> Result<(), CacheError> {
        let entry = CacheEntry::new(content, source_url);
        self.store.write(key, &entry)
    }

    fn entry_is_fresh(&self, entry: &CacheEntry) -> bool {
        // A timestamp from the future (clock skew) counts as age zero.
        let age = (Utc::now() - entry.timestamp).to_std().unwrap_or_default();
        age < self.lifetime
    }
}
