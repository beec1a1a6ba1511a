//! Token identifier revocation registry.
//!
//! The registry is the authoritative yes/no answer to "is identifier X
//! revoked". It is backed by the fast expiring cache (the enforcement path)
//! with a durable audit write-behind (the advisory path). Writes hit the
//! cache first, so a check racing a not-yet-durable audit append can never
//! observe a revoked identifier as clean.
//!
//! # Security Considerations
//!
//! - `is_blacklisted` fails secure: if the cache backend is unreachable the
//!   identifier is reported as revoked rather than letting unverifiable
//!   traffic through.
//! - An absent entry after the retention TTL means "outside retention
//!   window", not "never revoked"; permanent proof lives in the audit log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::SecurityResult;
use crate::audit::{AuditAction, AuditRecord};
use crate::config::RevocationConfig;
use crate::storage::{AuditStore, Cache};

const KEY_PREFIX: &str = "revocation:";

/// A revocation entry as stored in the fast cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationEntry {
    /// The revoked identifier.
    pub identifier: String,

    /// Why it was revoked.
    pub reason: String,

    /// When it was revoked.
    #[serde(with = "time::serde::rfc3339")]
    pub blacklisted_at: OffsetDateTime,

    /// Arbitrary structured context.
    pub metadata: Value,

    /// Retention TTL in seconds, recorded for housekeeping.
    pub ttl_secs: u64,
}

/// Result of a revocation check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatus {
    /// Whether the identifier is revoked (or unverifiable).
    pub blacklisted: bool,

    /// Revocation reason, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// When the identifier was revoked, when known.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub blacklisted_at: Option<OffsetDateTime>,
}

impl RevocationStatus {
    fn clean() -> Self {
        Self {
            blacklisted: false,
            reason: None,
            blacklisted_at: None,
        }
    }
}

/// The revocation registry.
///
/// Single writer of [`RevocationEntry`] records; every other component asks
/// it rather than touching the cache keys directly.
pub struct RevocationRegistry {
    cache: Arc<dyn Cache>,
    audit: Arc<dyn AuditStore>,
    config: RevocationConfig,
}

impl RevocationRegistry {
    /// Creates a new registry.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, audit: Arc<dyn AuditStore>, config: RevocationConfig) -> Self {
        Self {
            cache,
            audit,
            config,
        }
    }

    fn key(identifier: &str) -> String {
        format!("{KEY_PREFIX}{identifier}")
    }

    /// Adds an identifier to the registry.
    ///
    /// The cache entry is written first (it is the enforcement path); the
    /// durable audit append follows and its failure is logged and absorbed,
    /// since the cache entry already blocks traffic.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the cache write fails; without it
    /// the identifier would keep working, so this failure must stop the
    /// caller.
    pub async fn blacklist(
        &self,
        identifier: &str,
        reason: &str,
        metadata: Value,
    ) -> SecurityResult<()> {
        let entry = RevocationEntry {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
            blacklisted_at: OffsetDateTime::now_utc(),
            metadata: metadata.clone(),
            ttl_secs: self.config.retention_ttl.as_secs(),
        };

        let payload = serde_json::to_string(&entry)
            .map_err(|e| crate::SecurityError::internal(format!("serialize entry: {e}")))?;
        self.cache
            .set(&Self::key(identifier), &payload, Some(self.config.retention_ttl))
            .await?;

        let record = AuditRecord::new(AuditAction::Blacklisted, identifier, reason, metadata);
        if let Err(e) = self.audit.append(&record).await {
            warn!(identifier, error = %e, "audit append failed for blacklist; cache entry already in place");
        }

        debug!(identifier, reason, "identifier blacklisted");
        Ok(())
    }

    /// Checks whether an identifier is revoked.
    ///
    /// Fail-secure: a cache outage reports the identifier as blacklisted.
    pub async fn is_blacklisted(&self, identifier: &str) -> RevocationStatus {
        match self.cache.get(&Self::key(identifier)).await {
            Ok(Some(payload)) => match serde_json::from_str::<RevocationEntry>(&payload) {
                Ok(entry) => RevocationStatus {
                    blacklisted: true,
                    reason: Some(entry.reason),
                    blacklisted_at: Some(entry.blacklisted_at),
                },
                Err(e) => {
                    warn!(identifier, error = %e, "unparseable revocation entry; treating as revoked");
                    RevocationStatus {
                        blacklisted: true,
                        reason: Some("unparseable revocation entry".to_string()),
                        blacklisted_at: None,
                    }
                }
            },
            Ok(None) => RevocationStatus::clean(),
            Err(e) => {
                warn!(identifier, error = %e, "revocation backend unreachable; failing secure");
                RevocationStatus {
                    blacklisted: true,
                    reason: Some("revocation backend unreachable".to_string()),
                    blacklisted_at: None,
                }
            }
        }
    }

    /// Removes an identifier from the registry (admin-only reversal).
    ///
    /// Writes an audit record of the reversal distinct from the original
    /// blacklist entry.
    pub async fn unblacklist(&self, identifier: &str, reason: &str) -> SecurityResult<()> {
        self.cache.delete(&Self::key(identifier)).await?;

        let record = AuditRecord::new(
            AuditAction::Unblacklisted,
            identifier,
            reason,
            Value::Null,
        );
        if let Err(e) = self.audit.append(&record).await {
            warn!(identifier, error = %e, "audit append failed for unblacklist");
        }

        debug!(identifier, reason, "identifier unblacklisted");
        Ok(())
    }

    /// Housekeeping sweep over registry keys.
    ///
    /// TTL expiry is otherwise automatic; this pass only removes entries a
    /// backend without native expiry may have left behind. Returns the
    /// number of entries removed. Errors are logged and absorbed; sweeps
    /// must never fail anything.
    pub async fn sweep(&self) -> u64 {
        let keys = match self.cache.keys(KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "revocation sweep could not enumerate keys");
                return 0;
            }
        };

        let now = OffsetDateTime::now_utc();
        let mut removed = 0u64;
        for key in keys {
            let Ok(Some(payload)) = self.cache.get(&key).await else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<RevocationEntry>(&payload) else {
                continue;
            };
            let expires_at = entry.blacklisted_at + time::Duration::seconds(entry.ttl_secs as i64);
            if expires_at <= now {
                if self.cache.delete(&key).await.is_ok() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(removed, "revocation sweep removed lapsed entries");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecurityError;
    use async_trait::async_trait;
    use sentra_store_memory::{MemoryAuditStore, MemoryCache};
    use std::time::Duration;

    struct UnreachableCache;

    #[async_trait]
    impl Cache for UnreachableCache {
        async fn get(&self, _key: &str) -> SecurityResult<Option<String>> {
            Err(SecurityError::storage_unavailable("cache down"))
        }
        async fn set(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> SecurityResult<()> {
            Err(SecurityError::storage_unavailable("cache down"))
        }
        async fn delete(&self, _key: &str) -> SecurityResult<()> {
            Err(SecurityError::storage_unavailable("cache down"))
        }
        async fn set_nx(
            &self,
            _key: &str,
            _value: &str,
            _ttl: Option<Duration>,
        ) -> SecurityResult<bool> {
            Err(SecurityError::storage_unavailable("cache down"))
        }
        async fn keys(&self, _prefix: &str) -> SecurityResult<Vec<String>> {
            Err(SecurityError::storage_unavailable("cache down"))
        }
    }

    fn registry() -> (RevocationRegistry, Arc<MemoryAuditStore>) {
        let audit = Arc::new(MemoryAuditStore::new());
        let registry = RevocationRegistry::new(
            Arc::new(MemoryCache::new()),
            audit.clone(),
            RevocationConfig::default(),
        );
        (registry, audit)
    }

    #[tokio::test]
    async fn test_blacklist_then_check() {
        let (registry, audit) = registry();

        registry
            .blacklist("jti-1", "logout", serde_json::json!({"by": "user"}))
            .await
            .unwrap();

        let status = registry.is_blacklisted("jti-1").await;
        assert!(status.blacklisted);
        assert_eq!(status.reason.as_deref(), Some("logout"));
        assert!(status.blacklisted_at.is_some());

        let records = audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Blacklisted);
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_clean() {
        let (registry, _) = registry();
        let status = registry.is_blacklisted("never-seen").await;
        assert!(!status.blacklisted);
        assert!(status.reason.is_none());
    }

    #[tokio::test]
    async fn test_check_fails_secure_when_cache_unreachable() {
        let registry = RevocationRegistry::new(
            Arc::new(UnreachableCache),
            Arc::new(MemoryAuditStore::new()),
            RevocationConfig::default(),
        );

        let status = registry.is_blacklisted("jti-1").await;
        assert!(status.blacklisted);
        assert_eq!(
            status.reason.as_deref(),
            Some("revocation backend unreachable")
        );
    }

    #[tokio::test]
    async fn test_blacklist_fails_when_cache_unreachable() {
        let registry = RevocationRegistry::new(
            Arc::new(UnreachableCache),
            Arc::new(MemoryAuditStore::new()),
            RevocationConfig::default(),
        );

        let result = registry.blacklist("jti-1", "logout", Value::Null).await;
        assert!(matches!(
            result,
            Err(SecurityError::StorageUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_unblacklist_reverses_and_audits() {
        let (registry, audit) = registry();

        registry
            .blacklist("jti-1", "suspected theft", Value::Null)
            .await
            .unwrap();
        registry
            .unblacklist("jti-1", "false positive")
            .await
            .unwrap();

        let status = registry.is_blacklisted("jti-1").await;
        assert!(!status.blacklisted);

        let records = audit.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::Blacklisted);
        assert_eq!(records[1].action, AuditAction::Unblacklisted);
    }

    #[tokio::test]
    async fn test_sweep_removes_lapsed_entries() {
        let audit = Arc::new(MemoryAuditStore::new());
        let cache = Arc::new(MemoryCache::new());
        let registry = RevocationRegistry::new(
            cache.clone(),
            audit,
            RevocationConfig {
                retention_ttl: Duration::from_secs(0),
            },
        );

        // A zero-TTL entry is lapsed the moment it lands.
        registry
            .blacklist("jti-old", "logout", Value::Null)
            .await
            .unwrap();

        let removed = registry.sweep().await;
        // The cache may have expired it natively already; either way the
        // entry must be gone and the sweep must not error.
        assert!(removed <= 1);
        let keys = cache.keys("revocation:").await.unwrap();
        assert!(keys.is_empty());
    }
}
