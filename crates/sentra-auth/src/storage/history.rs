//! Login history, geo resolution, and account control seams.
//!
//! The threat-signal detectors read login history and resolve IP locations
//! through these interfaces; the takeover scorer's automated response goes
//! through [`AccountControl`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::SecurityResult;
use crate::fingerprint::DeviceFingerprint;

/// A geographic point resolved from an IP address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One login event in a user's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRecord {
    /// Unique identifier of this record.
    pub id: Uuid,

    /// The user who logged in.
    pub user_id: Uuid,

    /// Client IP address at login.
    pub ip: String,

    /// Device fingerprint at login.
    pub fingerprint: DeviceFingerprint,

    /// Resolved location, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    /// When the login happened.
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// Read access to the login history source.
#[async_trait]
pub trait LoginHistoryStore: Send + Sync {
    /// Appends a login record.
    async fn append(&self, record: &LoginRecord) -> SecurityResult<()>;

    /// Lists a user's logins at or after `since`, newest first.
    async fn recent_for_user(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> SecurityResult<Vec<LoginRecord>>;

    /// Returns the most recent login strictly before `before`, if any.
    async fn last_before(
        &self,
        user_id: Uuid,
        before: OffsetDateTime,
    ) -> SecurityResult<Option<LoginRecord>>;
}

/// Best-effort IP-to-location resolution.
///
/// Absence of a result disables impossible-travel evaluation for that
/// event; resolution failures are equivalent to absence.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Resolves an IP address to a location, if known.
    async fn resolve(&self, ip: &str) -> Option<GeoPoint>;
}

/// Account-level control surface used by the automated takeover response.
#[async_trait]
pub trait AccountControl: Send + Sync {
    /// Suspends the user's account (flips account status).
    ///
    /// The caller revokes the user's sessions separately; this call only
    /// changes the account record.
    async fn suspend_user(&self, user_id: Uuid, reason: &str) -> SecurityResult<()>;
}
