//! Shared expiring key-value cache trait.
//!
//! All cross-request coordination in the core goes through this interface,
//! never through in-process memory: any given request may be handled by a
//! different process or node. The atomic conditional set (`set_nx`) is the
//! only mutual-exclusion primitive the core relies on.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Expire entries automatically once their TTL lapses
//! - Guarantee per-key atomicity for `set_nx`
//! - Support prefix enumeration for housekeeping sweeps
//!
//! Values are opaque strings; components serialize their payloads with
//! `serde_json` before writing.

use std::time::Duration;

use async_trait::async_trait;

use crate::SecurityResult;

/// Shared expiring key-value cache.
///
/// # Errors
///
/// All methods return `SecurityError::StorageUnavailable` when the cache
/// backend cannot be reached. Callers on the revocation check path must
/// treat that error as "revoked" (fail secure); bookkeeping callers log
/// and absorb it.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> SecurityResult<Option<String>>;

    /// Sets a value in the cache with optional TTL.
    ///
    /// If `ttl` is `None`, the value does not expire automatically.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> SecurityResult<()>;

    /// Deletes a value from the cache.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    async fn delete(&self, key: &str) -> SecurityResult<()>;

    /// Sets a value only if the key doesn't exist, atomically.
    ///
    /// Returns `true` if the value was set, `false` if the key already
    /// existed. This is the try-lock primitive: acquisition is immediate,
    /// never awaited, and the lock is released by TTL expiry.
    async fn set_nx(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> SecurityResult<bool>;

    /// Lists all live keys starting with the given prefix.
    ///
    /// Used by housekeeping sweeps only; not a hot-path operation.
    async fn keys(&self, prefix: &str) -> SecurityResult<Vec<String>>;
}
