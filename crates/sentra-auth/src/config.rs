//! Security core configuration.
//!
//! This module provides configuration types for the session, revocation,
//! rotation, and threat-detection subsystems, organized into one sub-struct
//! per concern.
//!
//! # Example (TOML)
//!
//! ```toml
//! [security.session]
//! max_concurrent_sessions = 5
//! sliding_extension = "30m"
//!
//! [security.rotation]
//! refresh_lock_ttl = "1s"
//! grace_period = "5m"
//!
//! [security.brute_force]
//! max_attempts = 5
//! window = "15m"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the security core.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session lifecycle and eviction configuration.
    pub session: SessionPolicyConfig,

    /// Revocation registry configuration.
    pub revocation: RevocationConfig,

    /// Refresh rotation configuration.
    pub rotation: RotationConfig,

    /// Brute-force detector configuration.
    pub brute_force: BruteForceConfig,

    /// Impossible-travel detector configuration.
    pub travel: TravelConfig,

    /// Account-takeover risk scorer configuration.
    pub takeover: TakeoverConfig,

    /// Housekeeping task configuration.
    pub housekeeping: HousekeepingConfig,
}

/// Session lifecycle and eviction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionPolicyConfig {
    /// Maximum number of concurrently active sessions per user.
    /// Creating a session beyond this cap evicts the lowest-priority ones.
    pub max_concurrent_sessions: usize,

    /// Session lifetime applied at creation when the caller does not
    /// provide an explicit expiry.
    #[serde(with = "humantime_serde")]
    pub session_lifetime: Duration,

    /// How far `expires_at` slides forward on use, when extension is
    /// requested and allowed.
    #[serde(with = "humantime_serde")]
    pub sliding_extension: Duration,

    /// Whether `touch` may slide `expires_at` forward at all.
    pub allow_sliding_expiry: bool,

    /// How long revoked/expired session rows are retained before physical
    /// deletion, preserving the audit trail.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl Default for SessionPolicyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 5,
            session_lifetime: Duration::from_secs(3600),      // 1 hour
            sliding_extension: Duration::from_secs(30 * 60),  // 30 minutes
            allow_sliding_expiry: true,
            retention: Duration::from_secs(7 * 24 * 3600),    // 7 days
        }
    }
}

impl SessionPolicyConfig {
    /// Sets the per-user concurrency cap.
    #[must_use]
    pub fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }
}

/// Revocation registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RevocationConfig {
    /// How long revocation entries are retained in the fast cache.
    /// An absent entry after this TTL means "outside retention window",
    /// not "never revoked"; permanent proof lives in the audit log.
    #[serde(with = "humantime_serde")]
    pub retention_ttl: Duration,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            retention_ttl: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

/// Refresh rotation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RotationConfig {
    /// TTL of the per-token concurrency lock. The lock is never extended
    /// and is left to expire naturally.
    #[serde(with = "humantime_serde")]
    pub refresh_lock_ttl: Duration,

    /// Window after token expiry during which rotation is still honored,
    /// absorbing clock skew and client retry races.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,

    /// Maximum number of members a token family may accumulate before
    /// rotation is refused as anomalous.
    pub max_family_size: usize,

    /// Lifetime of newly issued access identifiers.
    #[serde(with = "humantime_serde")]
    pub access_lifetime: Duration,

    /// TTL of the cached token family record, matching the longest
    /// plausible refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub family_ttl: Duration,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            refresh_lock_ttl: Duration::from_secs(1),
            grace_period: Duration::from_secs(5 * 60), // 5 minutes
            max_family_size: 10,
            access_lifetime: Duration::from_secs(3600), // 1 hour
            family_ttl: Duration::from_secs(90 * 24 * 3600), // 90 days
        }
    }
}

impl RotationConfig {
    /// Sets the family size cap.
    #[must_use]
    pub fn with_max_family_size(mut self, max: usize) -> Self {
        self.max_family_size = max;
        self
    }

    /// Sets the post-expiry grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }
}

/// Brute-force detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BruteForceConfig {
    /// Sliding window over which attempts are counted.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Attempts within the window that trigger a lockout.
    pub max_attempts: u32,

    /// Initial lockout duration. Doubles per violation cycle up to
    /// `2^max_backoff_exponent` times this value.
    #[serde(with = "humantime_serde")]
    pub base_lockout: Duration,

    /// Cap on the progressive backoff exponent (32x at 5).
    pub max_backoff_exponent: u32,

    /// How long the persisted violation counter survives between cycles.
    #[serde(with = "humantime_serde")]
    pub violation_ttl: Duration,
}

impl Default for BruteForceConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),        // 15 minutes
            max_attempts: 5,
            base_lockout: Duration::from_secs(15 * 60),  // 15 minutes
            max_backoff_exponent: 5,
            violation_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
        }
    }
}

/// Impossible-travel detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TravelConfig {
    /// Maximum plausible average travel speed.
    pub max_speed_kmh: f64,

    /// Minimum elapsed time between logins for the check to run.
    /// Shorter gaps are skipped as insufficient signal.
    #[serde(with = "humantime_serde")]
    pub min_elapsed: Duration,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            max_speed_kmh: 500.0,
            min_elapsed: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Account-takeover risk scorer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TakeoverConfig {
    /// Rolling window of login history considered per evaluation.
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Total score at or above which the evaluation flags a takeover.
    pub threshold: u8,

    /// Whether the scorer may take the automated response (revoke all
    /// sessions, suspend the account).
    pub automated_response: bool,

    /// Score at or above which the automated response fires. Deliberately
    /// far above `threshold`; suspension is the single destructive
    /// automated action in the system.
    pub suspend_threshold: u8,

    /// Number of logins within `rapid_login_window` counted as rapid
    /// successive logins.
    pub rapid_login_count: usize,

    /// Window for the rapid-successive-logins sub-check.
    #[serde(with = "humantime_serde")]
    pub rapid_login_window: Duration,
}

impl Default for TakeoverConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(24 * 3600), // 24 hours
            threshold: 3,
            automated_response: false,
            suspend_threshold: 8,
            rapid_login_count: 3,
            rapid_login_window: Duration::from_secs(5 * 60), // 5 minutes
        }
    }
}

/// Housekeeping task configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Interval between sweep passes.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60), // 15 minutes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_policy() {
        let config = SecurityConfig::default();
        assert_eq!(config.session.max_concurrent_sessions, 5);
        assert_eq!(config.rotation.max_family_size, 10);
        assert_eq!(config.rotation.refresh_lock_ttl, Duration::from_secs(1));
        assert_eq!(config.rotation.grace_period, Duration::from_secs(300));
        assert_eq!(config.brute_force.max_attempts, 5);
        assert_eq!(config.brute_force.max_backoff_exponent, 5);
        assert_eq!(config.travel.max_speed_kmh, 500.0);
        assert_eq!(config.takeover.threshold, 3);
        assert_eq!(config.takeover.suspend_threshold, 8);
        assert!(!config.takeover.automated_response);
    }

    #[test]
    fn test_deserialize_humantime_durations() {
        let json = r#"{
            "session": { "max_concurrent_sessions": 3, "sliding_extension": "10m" },
            "rotation": { "grace_period": "30s" },
            "brute_force": { "window": "5m" }
        }"#;
        let config: SecurityConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.session.max_concurrent_sessions, 3);
        assert_eq!(config.session.sliding_extension, Duration::from_secs(600));
        assert_eq!(config.rotation.grace_period, Duration::from_secs(30));
        assert_eq!(config.brute_force.window, Duration::from_secs(300));
        // Untouched sections keep their defaults.
        assert_eq!(
            config.revocation.retention_ttl,
            Duration::from_secs(30 * 24 * 3600)
        );
    }

    #[test]
    fn test_builder_setters() {
        let rotation = RotationConfig::default()
            .with_max_family_size(4)
            .with_grace_period(Duration::from_secs(60));
        assert_eq!(rotation.max_family_size, 4);
        assert_eq!(rotation.grace_period, Duration::from_secs(60));

        let session = SessionPolicyConfig::default().with_max_concurrent_sessions(2);
        assert_eq!(session.max_concurrent_sessions, 2);
    }
}
