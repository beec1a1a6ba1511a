//! Security audit records.
//!
//! Audit records are the durable counterpart of the fast revocation cache
//! and the session lifecycle transitions:
//!
//! - Token and session revocations (and admin reversals)
//! - Bulk revocations
//! - Token family compromises

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// The action an audit record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// An identifier was added to the revocation registry.
    Blacklisted,
    /// An identifier was removed from the registry by an admin.
    Unblacklisted,
    /// A session was revoked.
    SessionRevoked,
    /// All of a user's sessions were revoked.
    SessionsBulkRevoked,
    /// A token family was destroyed after replay detection.
    FamilyCompromised,
}

impl AuditAction {
    /// Returns the action as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::Unblacklisted => "unblacklisted",
            Self::SessionRevoked => "session_revoked",
            Self::SessionsBulkRevoked => "sessions_bulk_revoked",
            Self::FamilyCompromised => "family_compromised",
        }
    }
}

/// An immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Unique identifier of this record.
    pub id: Uuid,

    /// What happened.
    pub action: AuditAction,

    /// The token/session identifier the action applies to.
    pub identifier: String,

    /// Why it happened.
    pub reason: String,

    /// Arbitrary structured context (ip, user agent, family members).
    pub metadata: Value,

    /// When it happened.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

impl AuditRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(
        action: AuditAction,
        identifier: impl Into<String>,
        reason: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            identifier: identifier.into(),
            reason: reason.into(),
            metadata,
            at: OffsetDateTime::now_utc(),
        }
    }
}
