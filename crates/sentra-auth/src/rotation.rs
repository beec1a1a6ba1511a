//! Refresh token rotation with family tracking and replay detection.
//!
//! Rotation must be exactly single-use: presenting a superseded refresh
//! identifier proves either a race (handled by the try-lock) or an
//! exfiltrated token (handled by destroying the whole family). The engine
//! never retries a failed rotation; a retry is the caller's decision and
//! must present a *new* attempt, not reuse the failed token.
//!
//! # Concurrency
//!
//! Rotation calls for one session are linearized by an atomic
//! set-if-not-exists lock on `(user_id, refresh_id)` with a short TTL. The
//! lock is acquired or denied immediately (never awaited) and released by
//! TTL expiry, not explicitly; extending or deleting it early would only
//! widen the race it exists to close.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, warn};

use crate::SecurityResult;
use crate::config::RotationConfig;
use crate::error::SecurityError;
use crate::events::{EventSink, SecurityEvent};
use crate::revocation::RevocationRegistry;
use crate::session::{Session, SessionManager};
use crate::storage::Cache;
use crate::token_id;

const LOCK_PREFIX: &str = "rotation:lock:";
const FAMILY_PREFIX: &str = "family:";

/// A verified refresh token, as produced by the caller's token layer.
///
/// The core never sees the encoded token; verification of its signature
/// and claims happens outside. Expiry is re-checked here so the grace
/// window is applied uniformly.
#[derive(Debug, Clone)]
pub struct VerifiedRefresh {
    /// The token's owner.
    pub user_id: uuid::Uuid,
    /// The session the token belongs to.
    pub session_id: String,
    /// The refresh identifier presented.
    pub refresh_id: String,
    /// The token's expiry claim.
    pub expires_at: OffsetDateTime,
}

/// One member of a token family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    /// The refresh identifier.
    pub refresh_id: String,

    /// When this member was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,

    /// When this member was superseded (None = current).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub retired_at: Option<OffsetDateTime>,
}

/// The lineage of refresh identifiers issued for one session.
///
/// At any time exactly one member is current (it matches the session's
/// `refresh_id`); all others are historical and already revoked or about
/// to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFamily {
    /// The owning session.
    pub session_id: String,

    /// Ordered members, oldest first.
    pub members: Vec<FamilyMember>,

    /// When the family was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the family last rotated.
    #[serde(with = "time::serde::rfc3339")]
    pub last_used_at: OffsetDateTime,
}

impl TokenFamily {
    /// Creates a family with a single current member.
    #[must_use]
    pub fn bootstrap(session_id: &str, refresh_id: &str, now: OffsetDateTime) -> Self {
        Self {
            session_id: session_id.to_string(),
            members: vec![FamilyMember {
                refresh_id: refresh_id.to_string(),
                issued_at: now,
                retired_at: None,
            }],
            created_at: now,
            last_used_at: now,
        }
    }

    /// Returns the current (non-retired) member, if the family is intact.
    #[must_use]
    pub fn current(&self) -> Option<&FamilyMember> {
        self.members.iter().rev().find(|m| m.retired_at.is_none())
    }

    /// Returns `true` if the identifier is a member (current or retired).
    #[must_use]
    pub fn contains(&self, refresh_id: &str) -> bool {
        self.members.iter().any(|m| m.refresh_id == refresh_id)
    }

    /// Marks a member as superseded. Idempotent: retiring an already
    /// retired member leaves its original timestamp untouched.
    pub fn retire(&mut self, refresh_id: &str, now: OffsetDateTime) {
        if let Some(member) = self
            .members
            .iter_mut()
            .find(|m| m.refresh_id == refresh_id)
            && member.retired_at.is_none()
        {
            member.retired_at = Some(now);
        }
    }

    /// Appends a new current member.
    pub fn append(&mut self, refresh_id: &str, now: OffsetDateTime) {
        self.members.push(FamilyMember {
            refresh_id: refresh_id.to_string(),
            issued_at: now,
            retired_at: None,
        });
        self.last_used_at = now;
    }
}

/// A freshly issued access/refresh identifier pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotatedPair {
    /// The session the pair belongs to.
    pub session_id: String,
    /// The token owner.
    pub user_id: uuid::Uuid,
    /// New access-token identifier.
    pub access_id: String,
    /// New refresh identifier (the family's new current member).
    pub refresh_id: String,
    /// Expiry for the new access identifier.
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
}

/// The refresh rotation engine.
pub struct RotationEngine {
    cache: Arc<dyn Cache>,
    registry: Arc<RevocationRegistry>,
    sessions: Arc<SessionManager>,
    events: Arc<dyn EventSink>,
    config: RotationConfig,
}

impl RotationEngine {
    /// Creates a new rotation engine.
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache>,
        registry: Arc<RevocationRegistry>,
        sessions: Arc<SessionManager>,
        events: Arc<dyn EventSink>,
        config: RotationConfig,
    ) -> Self {
        Self {
            cache,
            registry,
            sessions,
            events,
            config,
        }
    }

    fn lock_key(user_id: uuid::Uuid, refresh_id: &str) -> String {
        format!("{LOCK_PREFIX}{user_id}:{refresh_id}")
    }

    fn family_key(session_id: &str) -> String {
        format!("{FAMILY_PREFIX}{session_id}")
    }

    /// Rotates a refresh token, issuing a new access/refresh pair.
    ///
    /// # Errors
    ///
    /// - `InvalidToken`: expired beyond the grace window, or the
    ///   identifier is unknown to the session's family
    /// - `ConcurrentRefreshConflict`: another refresh for the same token
    ///   is in flight
    /// - `SessionNotFound` / `SessionInactive`: no usable session
    /// - `TokenFamilyCompromised`: replay of a superseded identifier
    ///   (after cascading revocation), or the family size cap was hit
    pub async fn refresh(&self, presented: &VerifiedRefresh) -> SecurityResult<RotatedPair> {
        let now = OffsetDateTime::now_utc();

        self.check_expiry(presented, now)?;

        // Non-blocking try-lock; losers fail hard rather than wait.
        let lock_key = Self::lock_key(presented.user_id, &presented.refresh_id);
        let acquired = self
            .cache
            .set_nx(&lock_key, "1", Some(self.config.refresh_lock_ttl))
            .await?;
        if !acquired {
            warn!(
                user_id = %presented.user_id,
                session_id = %presented.session_id,
                "concurrent refresh conflict"
            );
            return Err(SecurityError::ConcurrentRefreshConflict);
        }

        let session = self.load_session(presented).await?;
        let mut family = self.load_family(&session, now).await?;

        let is_current = family
            .current()
            .is_some_and(|member| member.refresh_id == presented.refresh_id);
        if !is_current {
            if family.contains(&presented.refresh_id) {
                // Historical member replayed: theft, or a race the lock
                // already ruled out. Burn the family.
                return Err(self.compromise_family(&session, family).await);
            }
            return Err(SecurityError::invalid_token(
                "refresh identifier unknown to session family",
            ));
        }

        if family.members.len() >= self.config.max_family_size {
            warn!(
                session_id = %session.id,
                members = family.members.len(),
                "token family exceeded size cap"
            );
            return Err(SecurityError::family_compromised(
                "token family size cap exceeded",
            ));
        }

        let access_id = token_id::generate();
        let new_refresh_id = token_id::generate();

        self.sessions
            .rotate_refresh_pointer(&session.id, &new_refresh_id)
            .await?;

        family.retire(&presented.refresh_id, now);
        family.append(&new_refresh_id, now);
        self.store_family(&family).await?;

        // Belt over the family check: a superseded identifier also fails
        // plain revocation lookups from here on.
        self.registry
            .blacklist(
                &presented.refresh_id,
                "superseded",
                serde_json::json!({ "sessionId": session.id }),
            )
            .await?;

        debug!(
            session_id = %session.id,
            user_id = %session.user_id,
            members = family.members.len(),
            "refresh rotated"
        );

        Ok(RotatedPair {
            session_id: session.id,
            user_id: presented.user_id,
            access_id,
            refresh_id: new_refresh_id,
            access_expires_at: now
                + time::Duration::seconds(self.config.access_lifetime.as_secs() as i64),
        })
    }

    fn check_expiry(&self, presented: &VerifiedRefresh, now: OffsetDateTime) -> SecurityResult<()> {
        if presented.expires_at > now {
            return Ok(());
        }
        let grace_limit = presented.expires_at
            + time::Duration::seconds(self.config.grace_period.as_secs() as i64);
        if now <= grace_limit {
            debug!(
                session_id = %presented.session_id,
                "expired refresh accepted within grace window"
            );
            return Ok(());
        }
        warn!(session_id = %presented.session_id, "refresh token expired beyond grace");
        Err(SecurityError::invalid_token("refresh token expired"))
    }

    async fn load_session(&self, presented: &VerifiedRefresh) -> SecurityResult<Session> {
        if let Some(session) = self
            .sessions
            .get_by_refresh_id(&presented.refresh_id)
            .await?
        {
            if session.id != presented.session_id {
                return Err(SecurityError::invalid_token(
                    "refresh identifier does not belong to the presented session",
                ));
            }
            if !session.is_active() {
                return Err(SecurityError::session_inactive("session expired"));
            }
            return Ok(session);
        }

        // The presented identifier is not any session's current pointer.
        // If it is a historical member of the session's family this is a
        // replay; the family check needs the session row either way.
        match self.sessions.get_session(&presented.session_id).await? {
            Some(session) => Ok(session),
            None => Err(SecurityError::SessionNotFound),
        }
    }

    async fn load_family(
        &self,
        session: &Session,
        now: OffsetDateTime,
    ) -> SecurityResult<TokenFamily> {
        let key = Self::family_key(&session.id);
        match self.cache.get(&key).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map_err(|e| SecurityError::internal(format!("parse token family: {e}"))),
            // Sessions created before their first rotation have no family
            // yet; the current refresh pointer seeds it.
            None => Ok(TokenFamily::bootstrap(&session.id, &session.refresh_id, now)),
        }
    }

    async fn store_family(&self, family: &TokenFamily) -> SecurityResult<()> {
        let payload = serde_json::to_string(family)
            .map_err(|e| SecurityError::internal(format!("serialize token family: {e}")))?;
        self.cache
            .set(
                &Self::family_key(&family.session_id),
                &payload,
                Some(self.config.family_ttl),
            )
            .await
    }

    /// Cascading response to a replayed identifier: blacklist every family
    /// member, revoke the session, destroy the family, emit the event.
    ///
    /// Always returns `TokenFamilyCompromised`; cleanup failures along the
    /// way are logged but cannot downgrade the outcome.
    async fn compromise_family(&self, session: &Session, family: TokenFamily) -> SecurityError {
        error!(
            session_id = %session.id,
            user_id = %session.user_id,
            members = family.members.len(),
            "superseded refresh identifier replayed; revoking token family"
        );

        for member in &family.members {
            if let Err(e) = self
                .registry
                .blacklist(
                    &member.refresh_id,
                    "token family compromised",
                    serde_json::json!({ "sessionId": session.id }),
                )
                .await
            {
                warn!(
                    refresh_id = %member.refresh_id,
                    error = %e,
                    "failed to blacklist family member"
                );
            }
        }

        if let Err(e) = self
            .sessions
            .revoke(&session.id, "token family compromised", Some("system"))
            .await
        {
            warn!(session_id = %session.id, error = %e, "failed to revoke compromised session");
        }

        if let Err(e) = self.cache.delete(&Self::family_key(&session.id)).await {
            warn!(session_id = %session.id, error = %e, "failed to delete compromised family");
        }

        self.events
            .emit(SecurityEvent::TokenFamilyCompromised {
                session_id: session.id.clone(),
                user_id: session.user_id,
                member_count: family.members.len(),
            })
            .await;

        SecurityError::family_compromised("superseded refresh identifier replayed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn family() -> TokenFamily {
        TokenFamily::bootstrap("s1", "r1", OffsetDateTime::now_utc())
    }

    #[test]
    fn test_bootstrap_has_one_current_member() {
        let family = family();
        assert_eq!(family.members.len(), 1);
        assert_eq!(family.current().unwrap().refresh_id, "r1");
        assert!(family.contains("r1"));
        assert!(!family.contains("r2"));
    }

    #[test]
    fn test_append_moves_current() {
        let mut family = family();
        let now = OffsetDateTime::now_utc();

        family.retire("r1", now);
        family.append("r2", now);

        assert_eq!(family.members.len(), 2);
        assert_eq!(family.current().unwrap().refresh_id, "r2");
        assert!(family.contains("r1"));
    }

    #[test]
    fn test_retire_is_idempotent() {
        let mut family = family();
        let first = OffsetDateTime::now_utc();

        family.retire("r1", first);
        let stamped = family.members[0].retired_at;
        assert!(stamped.is_some());

        family.retire("r1", first + Duration::minutes(5));
        assert_eq!(family.members[0].retired_at, stamped);
    }

    #[test]
    fn test_retire_unknown_member_is_noop() {
        let mut family = family();
        family.retire("never-issued", OffsetDateTime::now_utc());
        assert!(family.members[0].retired_at.is_none());
    }

    #[test]
    fn test_family_serialization_roundtrip() {
        let mut family = family();
        let now = OffsetDateTime::now_utc();
        family.retire("r1", now);
        family.append("r2", now);

        let json = serde_json::to_string(&family).unwrap();
        let parsed: TokenFamily = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert_eq!(parsed.members.len(), 2);
        assert_eq!(parsed.current().unwrap().refresh_id, "r2");
    }
}
