//! Time-boxed cache contract and its in-memory implementation.
//!
//! Entries are JSON blobs keyed by operation name plus a tenant
//! discriminator, so two workspaces sharing a process never read each
//! other's catalogues. Interior mutability with no locking; the toolkit
//! is single-threaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache contract injected into the resolver and the definition cache.
pub trait Cache {
    /// Fetch a live entry. Expired entries answer `None`.
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store or replace an entry, resetting its clock.
    fn put(&self, key: &str, value: serde_json::Value);

    /// Drop one entry, or every entry when `key` is `None`. Returns the
    /// number of entries removed.
    fn invalidate(&self, key: Option<&str>) -> usize;
}

/// Compose a cache key from an operation name and a tenant
/// discriminator. The tenant part is truncated to its first eight
/// characters, enough to separate workspaces without bloating keys.
pub fn scoped_key(operation: &str, tenant: &str) -> String {
    let short: String = tenant.chars().take(8).collect();
    format!("{operation}_{short}")
}

struct Entry {
    value: serde_json::Value,
    stored_at: Instant,
}

/// In-memory `Cache` with per-entry TTL, 24 hours by default.
pub struct MemoryCache {
    ttl: Duration,
    entries: RefCell<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new() -> Self {
        MemoryCache::with_ttl(Self::DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        MemoryCache {
            ttl,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Live entry count; expired entries still present are not counted.
    pub fn len(&self) -> usize {
        let entries = self.entries.borrow();
        entries
            .values()
            .filter(|e| e.stored_at.elapsed() <= self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        MemoryCache::new()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.borrow_mut();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                // Lazy expiry: drop the stale entry on first read past TTL.
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: serde_json::Value) {
        self.entries.borrow_mut().insert(
            key.to_string(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, key: Option<&str>) -> usize {
        let mut entries = self.entries.borrow_mut();
        match key {
            Some(key) => usize::from(entries.remove(key).is_some()),
            None => {
                let removed = entries.len();
                entries.clear();
                removed
            }
        }
    }
}
