//! Security events emitted to collaborating layers.
//!
//! The notification, webhook, and audit layers consume these events; the
//! core only emits them. Emission is fire-and-forget: a sink failure must
//! never fail the operation that produced the event.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Events the core emits to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// A session was created.
    SessionCreated {
        /// The new session's id.
        session_id: String,
        /// The session owner.
        user_id: Uuid,
    },

    /// A session was revoked.
    SessionRevoked {
        /// The revoked session's id.
        session_id: String,
        /// The session owner.
        user_id: Uuid,
        /// Why it was revoked.
        reason: String,
    },

    /// All of a user's sessions were revoked.
    SessionBulkRevoked {
        /// The user whose sessions were revoked.
        user_id: Uuid,
        /// How many sessions were revoked.
        count: usize,
        /// Why they were revoked.
        reason: String,
    },

    /// The brute-force detector locked a key out.
    BruteForceDetected {
        /// The identifier under attack (username, token id).
        identifier: String,
        /// Source IP of the attempts.
        ip: String,
        /// The attempt type (e.g. "login", "refresh").
        attempt_type: String,
        /// Lockout duration in seconds.
        lockout_secs: u64,
    },

    /// The impossible-travel evaluator flagged a login.
    ImpossibleTravelDetected {
        /// The user who logged in.
        user_id: Uuid,
        /// Great-circle distance between the two logins, km.
        distance_km: f64,
        /// Hours elapsed between the logins.
        elapsed_hours: f64,
        /// Required average speed, km/h.
        required_speed_kmh: f64,
    },

    /// The takeover scorer crossed its threshold.
    AccountTakeoverDetected {
        /// The user at risk.
        user_id: Uuid,
        /// Total risk score (capped at 10).
        score: u8,
        /// Names of the sub-checks that fired.
        signals: Vec<String>,
        /// Whether the automated response (suspension) fired.
        suspended: bool,
    },

    /// A token family was destroyed after replay detection.
    TokenFamilyCompromised {
        /// The session whose family was compromised.
        session_id: String,
        /// The session owner.
        user_id: Uuid,
        /// How many family members were revoked.
        member_count: usize,
    },
}

impl SecurityEvent {
    /// Returns the dotted event name used on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session.created",
            Self::SessionRevoked { .. } => "session.revoked",
            Self::SessionBulkRevoked { .. } => "session.bulk_revoked",
            Self::BruteForceDetected { .. } => "threat_detection.brute_force_detected",
            Self::ImpossibleTravelDetected { .. } => "threat_detection.impossible_travel_detected",
            Self::AccountTakeoverDetected { .. } => "threat_detection.account_takeover_detected",
            Self::TokenFamilyCompromised { .. } => "token_family.compromised",
        }
    }

    /// Returns `true` for events that indicate an active attack.
    #[must_use]
    pub fn is_threat(&self) -> bool {
        matches!(
            self,
            Self::BruteForceDetected { .. }
                | Self::ImpossibleTravelDetected { .. }
                | Self::AccountTakeoverDetected { .. }
                | Self::TokenFamilyCompromised { .. }
        )
    }
}

/// Consumer of security events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event. Failures are the sink's problem; the core does
    /// not retry.
    async fn emit(&self, event: SecurityEvent);
}

/// Default sink that logs events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: SecurityEvent) {
        if event.is_threat() {
            warn!(kind = event.kind(), event = ?event, "security event");
        } else {
            info!(kind = event.kind(), event = ?event, "security event");
        }
    }
}
