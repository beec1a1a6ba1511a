//! Session lifecycle management.
//!
//! The session manager exclusively owns lifecycle transitions: creation
//! (with concurrency-cap eviction), use tracking, and revocation. Other
//! components, the rotation engine in particular, request transitions
//! through it rather than writing session rows themselves.
//!
//! # Lifecycle
//!
//! A session is created on successful authentication, mutated on use
//! (`last_used_at`, optional sliding expiry) and on revocation (terminal,
//! one-way), and physically deleted only after the retention window has
//! elapsed, preserving an audit trail.

pub mod eviction;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::config::SessionPolicyConfig;
use crate::error::SecurityError;
use crate::events::{EventSink, SecurityEvent};
use crate::fingerprint::DeviceFingerprint;
use crate::storage::SessionStore;
use crate::SecurityResult;

/// A user session and its token identifiers.
///
/// `id` is the access-token identifier; `refresh_id` is the *current*
/// member of the session's token family and moves on every rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session id (= access-token identifier).
    pub id: String,

    /// Current refresh identifier.
    pub refresh_id: String,

    /// The session owner.
    pub user_id: Uuid,

    /// Owning organization, for multi-tenant accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,

    /// Device fingerprint captured at creation.
    pub fingerprint: DeviceFingerprint,

    /// Client IP at creation.
    pub ip: String,

    /// Raw user-agent at creation.
    pub user_agent: String,

    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When the session was last used.
    #[serde(with = "time::serde::rfc3339")]
    pub last_used_at: OffsetDateTime,

    /// When the session was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Why the session was revoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_reason: Option<String>,

    /// Who revoked the session (user id, "system", admin id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_by: Option<String>,
}

impl Session {
    /// Returns `true` if this session has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this session is active: not revoked and not past
    /// its expiry.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_revoked() && self.expires_at > OffsetDateTime::now_utc()
    }
}

/// Input for session creation.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// The session owner.
    pub user_id: Uuid,
    /// Owning organization, if any.
    pub org_id: Option<Uuid>,
    /// Device fingerprint derived from the login request.
    pub fingerprint: DeviceFingerprint,
    /// Client IP.
    pub ip: String,
    /// Raw user-agent.
    pub user_agent: String,
    /// Access-token identifier minted for this session.
    pub access_id: String,
    /// Refresh identifier minted for this session.
    pub refresh_id: String,
    /// Session expiry.
    pub expires_at: OffsetDateTime,
}

/// Owns session records and lifecycle transitions.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    events: Arc<dyn EventSink>,
    config: SessionPolicyConfig,
}

impl SessionManager {
    /// Creates a new session manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        events: Arc<dyn EventSink>,
        config: SessionPolicyConfig,
    ) -> Self {
        Self {
            store,
            events,
            config,
        }
    }

    /// Creates a session, enforcing the per-user concurrency cap first.
    ///
    /// Eviction bookkeeping failures are logged and absorbed; creation
    /// must not be blocked by them.
    pub async fn create_session(&self, new: NewSession) -> SecurityResult<Session> {
        if let Err(e) = self.enforce_concurrency_cap(&new).await {
            warn!(user_id = %new.user_id, error = %e, "session eviction bookkeeping failed; creating anyway");
        }

        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: new.access_id,
            refresh_id: new.refresh_id,
            user_id: new.user_id,
            org_id: new.org_id,
            fingerprint: new.fingerprint,
            ip: new.ip,
            user_agent: new.user_agent,
            created_at: now,
            expires_at: new.expires_at,
            last_used_at: now,
            revoked_at: None,
            revoked_reason: None,
            revoked_by: None,
        };
        self.store.insert(&session).await?;

        self.events
            .emit(SecurityEvent::SessionCreated {
                session_id: session.id.clone(),
                user_id: session.user_id,
            })
            .await;

        Ok(session)
    }

    async fn enforce_concurrency_cap(&self, new: &NewSession) -> SecurityResult<()> {
        let active = self.store.list_active_by_user(new.user_id).await?;
        let now = OffsetDateTime::now_utc();
        let to_evict: Vec<String> = eviction::select_evictions(
            &active,
            &new.fingerprint,
            &new.ip,
            self.config.max_concurrent_sessions,
            now,
        )
        .into_iter()
        .map(|s| s.id.clone())
        .collect();

        for id in to_evict {
            self.revoke(&id, "evicted: concurrent session limit", Some("system"))
                .await?;
        }
        Ok(())
    }

    /// Looks up a session by id.
    ///
    /// Revoked sessions are never returned. Expiry is reported through
    /// [`Session::is_active`], not filtered here.
    pub async fn get_session(&self, id: &str) -> SecurityResult<Option<Session>> {
        Ok(self
            .store
            .find_by_id(id)
            .await?
            .filter(|s| !s.is_revoked()))
    }

    /// Looks up a session by its current refresh identifier.
    ///
    /// Revoked sessions are never returned.
    pub async fn get_by_refresh_id(&self, refresh_id: &str) -> SecurityResult<Option<Session>> {
        Ok(self
            .store
            .find_by_refresh_id(refresh_id)
            .await?
            .filter(|s| !s.is_revoked()))
    }

    /// Records use of a session, optionally sliding its expiry forward.
    ///
    /// Returns the updated session, or `None` if it does not exist or is
    /// revoked.
    pub async fn touch(&self, id: &str, extend: bool) -> SecurityResult<Option<Session>> {
        let Some(mut session) = self.get_session(id).await? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc();
        session.last_used_at = now;
        if extend && self.config.allow_sliding_expiry {
            // Slides forward only; a touch can never shorten a session.
            session.expires_at = session.expires_at.max(now + self.config.sliding_extension);
        }
        self.store.update(&session).await?;
        Ok(Some(session))
    }

    /// Revokes a session. One-way and idempotent: revoking an
    /// already-revoked session is a no-op, not an error.
    ///
    /// Returns the session in its revoked state, or `None` if it does not
    /// exist.
    pub async fn revoke(
        &self,
        id: &str,
        reason: &str,
        revoked_by: Option<&str>,
    ) -> SecurityResult<Option<Session>> {
        let Some(mut session) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };
        if session.is_revoked() {
            return Ok(Some(session));
        }

        session.revoked_at = Some(OffsetDateTime::now_utc());
        session.revoked_reason = Some(reason.to_string());
        session.revoked_by = revoked_by.map(ToString::to_string);
        self.store.update(&session).await?;

        self.events
            .emit(SecurityEvent::SessionRevoked {
                session_id: session.id.clone(),
                user_id: session.user_id,
                reason: reason.to_string(),
            })
            .await;

        Ok(Some(session))
    }

    /// Revokes all of a user's active sessions, optionally preserving one
    /// (the caller's own).
    ///
    /// Returns the sessions that were revoked.
    pub async fn revoke_all(
        &self,
        user_id: Uuid,
        reason: &str,
        except: Option<&str>,
    ) -> SecurityResult<Vec<Session>> {
        let active = self.store.list_active_by_user(user_id).await?;
        let mut revoked = Vec::new();

        for session in active {
            if Some(session.id.as_str()) == except {
                continue;
            }
            if let Some(session) = self.revoke(&session.id, reason, Some("system")).await? {
                revoked.push(session);
            }
        }

        self.events
            .emit(SecurityEvent::SessionBulkRevoked {
                user_id,
                count: revoked.len(),
                reason: reason.to_string(),
            })
            .await;

        Ok(revoked)
    }

    /// Updates a session's refresh pointer during rotation.
    ///
    /// Only the rotation engine calls this; the session must be active.
    pub async fn rotate_refresh_pointer(
        &self,
        session_id: &str,
        new_refresh_id: &str,
    ) -> SecurityResult<Session> {
        let Some(mut session) = self.get_session(session_id).await? else {
            return Err(SecurityError::SessionNotFound);
        };
        if !session.is_active() {
            return Err(SecurityError::session_inactive("session expired"));
        }

        session.refresh_id = new_refresh_id.to_string();
        session.last_used_at = OffsetDateTime::now_utc();
        self.store.update(&session).await?;
        Ok(session)
    }

    /// The synchronous query surface for the authentication request path.
    ///
    /// Storage outages surface as `SessionInactive` rather than letting an
    /// unverifiable session through.
    pub async fn verify_session_active(&self, access_id: &str) -> SecurityResult<Session> {
        let found = match self.store.find_by_id(access_id).await {
            Ok(found) => found,
            Err(SecurityError::StorageUnavailable { .. }) => {
                return Err(SecurityError::session_inactive(
                    "session state unverifiable",
                ));
            }
            Err(e) => return Err(e),
        };

        let Some(session) = found else {
            return Err(SecurityError::SessionNotFound);
        };
        if session.is_revoked() {
            return Err(SecurityError::session_inactive("session revoked"));
        }
        if !session.is_active() {
            return Err(SecurityError::session_inactive("session expired"));
        }
        Ok(session)
    }

    /// Purges terminal session rows older than the retention window.
    ///
    /// Housekeeping only; errors are logged and absorbed.
    pub async fn purge_expired(&self) -> u64 {
        let cutoff = OffsetDateTime::now_utc()
            - time::Duration::seconds(self.config.retention.as_secs() as i64);
        match self.store.purge_older_than(cutoff).await {
            Ok(purged) => purged,
            Err(e) => {
                warn!(error = %e, "session purge failed");
                0
            }
        }
    }
}
