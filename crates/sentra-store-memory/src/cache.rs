//! In-memory expiring cache.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use sentra_auth::storage::Cache;
use sentra_auth::SecurityResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Expiring key-value cache backed by a concurrent map.
///
/// Expired entries are dropped lazily on read and during `keys`
/// enumeration. `set_nx` is atomic per key via the map's entry lock, which
/// is what the rotation try-lock relies on.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> SecurityResult<Option<String>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> SecurityResult<()> {
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> SecurityResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> SecurityResult<bool> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(CacheEntry::new(value, ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn keys(&self, prefix: &str) -> SecurityResult<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired() && entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
