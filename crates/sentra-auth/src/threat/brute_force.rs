//! Brute-force detection with progressive lockout.
//!
//! State machine per `(identifier, ip, attempt_type)` key: attempts
//! accumulate in a sliding window; reaching the threshold locks the key out
//! for `base x 2^min(violations, cap)`, with the violation counter
//! persisting between cycles to drive the progressive backoff.
//!
//! All state lives in the shared cache; requests for the same key may be
//! handled by different nodes, so nothing is kept in process memory.
//! Windows, counters and lockouts are overwrite-only per key; the store's
//! per-key atomicity is all the coordination they need.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::SecurityResult;
use crate::config::BruteForceConfig;
use crate::events::{EventSink, SecurityEvent};
use crate::storage::Cache;

/// An active lockout for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutRecord {
    /// When the lockout lapses.
    #[serde(with = "time::serde::rfc3339")]
    pub lockout_until: OffsetDateTime,

    /// How many violation cycles this key has accumulated.
    pub violation_count: u32,
}

impl LockoutRecord {
    /// Seconds until the lockout lapses (zero if already lapsed).
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let remaining = self.lockout_until - OffsetDateTime::now_utc();
        remaining.whole_seconds().max(0) as u64
    }
}

/// Result of recording one failed attempt.
#[derive(Debug, Clone)]
pub struct BruteForceOutcome {
    /// Whether this attempt crossed the threshold.
    pub is_brute_force: bool,

    /// Attempts observed inside the current window (including this one
    /// when it was recorded).
    pub attempts_in_window: u32,

    /// The lockout applied, when the threshold was crossed.
    pub lockout: Option<LockoutRecord>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AttemptWindow {
    /// Unix timestamps of recent attempts.
    attempts: Vec<i64>,
}

/// The brute-force detector.
pub struct BruteForceDetector {
    cache: Arc<dyn Cache>,
    events: Arc<dyn EventSink>,
    config: BruteForceConfig,
}

impl BruteForceDetector {
    /// Creates a new detector.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, events: Arc<dyn EventSink>, config: BruteForceConfig) -> Self {
        Self {
            cache,
            events,
            config,
        }
    }

    fn window_key(identifier: &str, ip: &str, attempt_type: &str) -> String {
        format!("bf:window:{identifier}:{ip}:{attempt_type}")
    }

    fn violations_key(identifier: &str, ip: &str, attempt_type: &str) -> String {
        format!("bf:violations:{identifier}:{ip}:{attempt_type}")
    }

    fn lockout_key(identifier: &str, ip: &str, attempt_type: &str) -> String {
        format!("bf:lockout:{identifier}:{ip}:{attempt_type}")
    }

    /// Checks whether a key is currently locked out.
    ///
    /// Callers must check this *before* attempting authentication. A lapsed
    /// lockout is lazily cleared here.
    pub async fn is_locked_out(
        &self,
        identifier: &str,
        ip: &str,
        attempt_type: &str,
    ) -> SecurityResult<Option<LockoutRecord>> {
        let key = Self::lockout_key(identifier, ip, attempt_type);
        let Some(payload) = self.cache.get(&key).await? else {
            return Ok(None);
        };

        let record: LockoutRecord = serde_json::from_str(&payload)
            .map_err(|e| crate::SecurityError::internal(format!("parse lockout: {e}")))?;

        if record.lockout_until <= OffsetDateTime::now_utc() {
            self.cache.delete(&key).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Records a failed attempt and evaluates the threshold.
    ///
    /// When the attempts already inside the window have reached
    /// `max_attempts`, the key is locked out for
    /// `base_lockout x 2^min(violations, max_backoff_exponent)` and the
    /// violation counter is incremented; otherwise the attempt is appended
    /// to the window.
    pub async fn record_failure(
        &self,
        identifier: &str,
        ip: &str,
        attempt_type: &str,
    ) -> SecurityResult<BruteForceOutcome> {
        let now = OffsetDateTime::now_utc();
        let window_key = Self::window_key(identifier, ip, attempt_type);

        let mut window = match self.cache.get(&window_key).await? {
            Some(payload) => serde_json::from_str(&payload).unwrap_or_default(),
            None => AttemptWindow::default(),
        };

        let window_start = (now - time::Duration::seconds(self.config.window.as_secs() as i64))
            .unix_timestamp();
        window.attempts.retain(|t| *t > window_start);

        let recent = window.attempts.len() as u32;
        if recent >= self.config.max_attempts {
            let lockout = self.lock_out(identifier, ip, attempt_type, now).await?;
            return Ok(BruteForceOutcome {
                is_brute_force: true,
                attempts_in_window: recent,
                lockout: Some(lockout),
            });
        }

        window.attempts.push(now.unix_timestamp());
        let payload = serde_json::to_string(&window)
            .map_err(|e| crate::SecurityError::internal(format!("serialize window: {e}")))?;
        self.cache
            .set(&window_key, &payload, Some(self.config.window))
            .await?;

        Ok(BruteForceOutcome {
            is_brute_force: false,
            attempts_in_window: recent + 1,
            lockout: None,
        })
    }

    async fn lock_out(
        &self,
        identifier: &str,
        ip: &str,
        attempt_type: &str,
        now: OffsetDateTime,
    ) -> SecurityResult<LockoutRecord> {
        let violations_key = Self::violations_key(identifier, ip, attempt_type);
        let violations: u32 = match self.cache.get(&violations_key).await? {
            Some(payload) => payload.parse().unwrap_or(0),
            None => 0,
        };

        let exponent = violations.min(self.config.max_backoff_exponent);
        let duration = Duration::from_secs(
            self.config
                .base_lockout
                .as_secs()
                .saturating_mul(2u64.saturating_pow(exponent)),
        );
        let record = LockoutRecord {
            lockout_until: now + time::Duration::seconds(duration.as_secs() as i64),
            violation_count: violations + 1,
        };

        let payload = serde_json::to_string(&record)
            .map_err(|e| crate::SecurityError::internal(format!("serialize lockout: {e}")))?;
        self.cache
            .set(
                &Self::lockout_key(identifier, ip, attempt_type),
                &payload,
                Some(duration),
            )
            .await?;
        self.cache
            .set(
                &violations_key,
                &(violations + 1).to_string(),
                Some(self.config.violation_ttl),
            )
            .await?;

        warn!(
            identifier,
            ip,
            attempt_type,
            lockout_secs = duration.as_secs(),
            violations = violations + 1,
            "brute force threshold crossed"
        );
        self.events
            .emit(SecurityEvent::BruteForceDetected {
                identifier: identifier.to_string(),
                ip: ip.to_string(),
                attempt_type: attempt_type.to_string(),
                lockout_secs: duration.as_secs(),
            })
            .await;

        Ok(record)
    }

    /// Removes window entries whose keys have gone completely stale.
    ///
    /// Housekeeping only; TTL expiry handles the common case. Errors are
    /// logged and absorbed.
    pub async fn sweep(&self) -> u64 {
        let keys = match self.cache.keys("bf:window:").await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "brute force sweep could not enumerate keys");
                return 0;
            }
        };

        let now = OffsetDateTime::now_utc();
        let window_start =
            (now - time::Duration::seconds(self.config.window.as_secs() as i64)).unix_timestamp();
        let mut removed = 0u64;

        for key in keys {
            let Ok(Some(payload)) = self.cache.get(&key).await else {
                continue;
            };
            let Ok(window) = serde_json::from_str::<AttemptWindow>(&payload) else {
                continue;
            };
            if window.attempts.iter().all(|t| *t <= window_start)
                && self.cache.delete(&key).await.is_ok()
            {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, "brute force sweep removed stale windows");
        }
        removed
    }
}
