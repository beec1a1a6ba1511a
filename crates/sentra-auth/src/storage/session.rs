//! Session storage trait.
//!
//! This module defines the durable storage interface for session rows.
//! Lifecycle *transitions* (revocation, refresh-pointer rotation, expiry
//! extension) are owned exclusively by the session manager; the store only
//! persists what the manager decides.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Support point lookups by session id and by refresh identifier
//! - Keep revoked rows until the manager purges them (audit trail)
//! - Provide per-row atomicity for `update` (last write wins is acceptable;
//!   cross-row coordination is handled by the rotation engine's lock)

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::SecurityResult;
use crate::session::Session;

/// Durable storage for session rows.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a new session row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be stored (e.g., duplicate id,
    /// storage unavailable).
    async fn insert(&self, session: &Session) -> SecurityResult<()>;

    /// Finds a session by its id (the access-token identifier).
    ///
    /// Returns rows regardless of revocation/expiry status; the manager
    /// applies visibility rules.
    async fn find_by_id(&self, id: &str) -> SecurityResult<Option<Session>>;

    /// Finds a session by its current refresh identifier.
    async fn find_by_refresh_id(&self, refresh_id: &str) -> SecurityResult<Option<Session>>;

    /// Lists all non-revoked, non-expired sessions for a user.
    ///
    /// Used for concurrency-cap enforcement and bulk revocation.
    async fn list_active_by_user(&self, user_id: Uuid) -> SecurityResult<Vec<Session>>;

    /// Overwrites an existing session row, keyed by `session.id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not exist or the write fails.
    async fn update(&self, session: &Session) -> SecurityResult<()>;

    /// Physically deletes revoked or expired rows whose terminal timestamp
    /// precedes `cutoff`.
    ///
    /// Called by the housekeeping task once the audit retention window has
    /// elapsed. Returns the number of rows deleted.
    async fn purge_older_than(&self, cutoff: OffsetDateTime) -> SecurityResult<u64>;
}
