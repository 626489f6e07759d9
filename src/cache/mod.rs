//! Cache module for storing fetched spreadsheet exports
//!
//! This module provides a time-bounded cache keyed by a digest of the resolved
//! export URL. Entries are held behind a [`CacheStore`] so the on-disk store
//! can be swapped for an in-memory one. A [`SheetCache`] never hands back
//! content older than its lifetime.

mod key;
mod manager;
mod store;

pub use key::compute_key;
pub use manager::{SheetCache, DEFAULT_LIFETIME};
pub use store::{CacheEntry, CacheError, CacheStore, FileStore, MemoryStore};
