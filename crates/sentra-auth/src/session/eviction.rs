//! Concurrency-cap eviction scoring.
//!
//! Scoring is a pure function over structured inputs, returning the total
//! plus a per-term breakdown. The score is a keep-priority: affinity with
//! the device and network the user is logging in from dominates, so
//! bounding concurrency rarely logs the user out of the session they are
//! actively using. The lowest-scoring sessions are evicted first.

use time::OffsetDateTime;

use crate::fingerprint::DeviceFingerprint;
use crate::session::Session;

const AGE_POINTS_PER_HOUR: f64 = 10.0;
const AGE_POINTS_CAP: f64 = 1000.0;
const IDLE_POINTS_PER_HOUR: f64 = 20.0;
const IDLE_POINTS_CAP: f64 = 2000.0;
const DEVICE_MATCH_POINTS: f64 = 5000.0;
const BROWSER_MATCH_POINTS: f64 = 1000.0;
const OS_MATCH_POINTS: f64 = 500.0;
const IP_MATCH_POINTS: f64 = 2000.0;

/// Per-term breakdown of an eviction score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    /// Points from session age, capped.
    pub age_points: f64,
    /// Points from time since last use, capped.
    pub idle_points: f64,
    /// Stable-fingerprint affinity with the incoming session.
    pub device_points: f64,
    /// Browser-family affinity.
    pub browser_points: f64,
    /// OS-family affinity.
    pub os_points: f64,
    /// IP affinity.
    pub ip_points: f64,
}

impl ScoreBreakdown {
    /// Total keep-priority score.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.age_points
            + self.idle_points
            + self.device_points
            + self.browser_points
            + self.os_points
            + self.ip_points
    }
}

/// Scores one active session against the session being created.
#[must_use]
pub fn score(
    candidate: &Session,
    incoming_fingerprint: &DeviceFingerprint,
    incoming_ip: &str,
    now: OffsetDateTime,
) -> ScoreBreakdown {
    let age_hours = hours_between(candidate.created_at, now);
    let idle_hours = hours_between(candidate.last_used_at, now);

    ScoreBreakdown {
        age_points: (age_hours * AGE_POINTS_PER_HOUR).min(AGE_POINTS_CAP),
        idle_points: (idle_hours * IDLE_POINTS_PER_HOUR).min(IDLE_POINTS_CAP),
        device_points: if candidate.fingerprint.stable_hash == incoming_fingerprint.stable_hash {
            DEVICE_MATCH_POINTS
        } else {
            0.0
        },
        browser_points: if candidate.fingerprint.browser == incoming_fingerprint.browser {
            BROWSER_MATCH_POINTS
        } else {
            0.0
        },
        os_points: if candidate.fingerprint.os == incoming_fingerprint.os {
            OS_MATCH_POINTS
        } else {
            0.0
        },
        ip_points: if candidate.ip == incoming_ip {
            IP_MATCH_POINTS
        } else {
            0.0
        },
    }
}

/// Picks the sessions to evict so the incoming session fits the cap.
///
/// Evicts the lowest-scoring sessions until the remaining count is within
/// `limit - 1`, always making room for the new session. Returns references
/// into `active`, lowest score first.
#[must_use]
pub fn select_evictions<'a>(
    active: &'a [Session],
    incoming_fingerprint: &DeviceFingerprint,
    incoming_ip: &str,
    limit: usize,
    now: OffsetDateTime,
) -> Vec<&'a Session> {
    let keep = limit.saturating_sub(1);
    if active.len() <= keep {
        return Vec::new();
    }

    let mut scored: Vec<(f64, &Session)> = active
        .iter()
        .map(|s| (score(s, incoming_fingerprint, incoming_ip, now).total(), s))
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let evict_count = active.len() - keep;
    scored
        .into_iter()
        .take(evict_count)
        .map(|(_, s)| s)
        .collect()
}

fn hours_between(from: OffsetDateTime, to: OffsetDateTime) -> f64 {
    ((to - from).whole_seconds().max(0) as f64) / 3600.0
}
