//! # sentra-auth
//!
//! Session and token security core for the Sentra authentication platform.
//!
//! This crate provides:
//! - Session lifecycle management with concurrency-limited eviction
//! - A revocation registry for token identifiers with fail-secure checks
//! - Refresh token rotation with family tracking and replay detection
//! - Threat-signal detectors: brute-force lockout, impossible travel,
//!   account-takeover risk scoring
//! - Device fingerprint generation
//!
//! ## Overview
//!
//! The core is invoked by many concurrent request-handling workers; all
//! cross-request coordination goes through the shared cache, never through
//! in-process memory. Components are explicit objects owning injected
//! handles; see [`service::SecurityCore`] for process-start wiring.
//!
//! Token *encoding* (signature algorithm, claims schema) is out of scope:
//! the core tracks, rotates, and revokes opaque token identifiers only.
//!
//! ## Modules
//!
//! - [`config`] - Per-concern configuration
//! - [`service`] - Component wiring and the collaborator query surface
//! - [`session`] - Session lifecycle and eviction
//! - [`revocation`] - Token identifier revocation registry
//! - [`rotation`] - Refresh rotation and token families
//! - [`threat`] - Brute-force, impossible-travel, takeover detectors
//! - [`fingerprint`] - Device fingerprint generation
//! - [`events`] - Security events emitted to collaborators
//! - [`audit`] - Durable audit records
//! - [`storage`] - Storage traits implemented by backend crates
//! - [`housekeeping`] - Cancellable periodic cleanup task

pub mod audit;
pub mod config;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod housekeeping;
pub mod revocation;
pub mod rotation;
pub mod service;
pub mod session;
pub mod storage;
pub mod threat;
pub mod token_id;

pub use config::SecurityConfig;
pub use service::{CoreDependencies, SecurityCore};
pub use error::{ErrorCategory, SecurityError};
pub use events::{EventSink, SecurityEvent, TracingEventSink};
pub use fingerprint::{DeviceFingerprint, DeviceType, RequestMetadata};
pub use revocation::{RevocationEntry, RevocationRegistry, RevocationStatus};
pub use rotation::{RotatedPair, RotationEngine, TokenFamily, VerifiedRefresh};
pub use session::{NewSession, Session, SessionManager};
pub use storage::{
    AccountControl, AuditStore, Cache, GeoPoint, GeoResolver, LoginHistoryStore, LoginRecord,
    SessionStore,
};
pub use threat::{
    BruteForceDetector, BruteForceOutcome, LockoutRecord, RiskAssessment, RiskSignal, Severity,
    TakeoverScorer, TravelCheck,
};

/// Type alias for security core results.
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sentra_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::SecurityResult;
    pub use crate::config::SecurityConfig;
    pub use crate::service::{CoreDependencies, SecurityCore};
    pub use crate::error::{ErrorCategory, SecurityError};
    pub use crate::events::{EventSink, SecurityEvent};
    pub use crate::fingerprint::{DeviceFingerprint, RequestMetadata};
    pub use crate::revocation::{RevocationRegistry, RevocationStatus};
    pub use crate::rotation::{RotatedPair, RotationEngine, VerifiedRefresh};
    pub use crate::session::{NewSession, Session, SessionManager};
    pub use crate::storage::{
        AccountControl, AuditStore, Cache, GeoPoint, GeoResolver, LoginHistoryStore, LoginRecord,
        SessionStore,
    };
    pub use crate::threat::{BruteForceDetector, TakeoverScorer};
}
