//! Account-takeover risk scoring.
//!
//! Aggregates independent sub-checks over a rolling window of the user's
//! login history. Each sub-check yields a severity mapped to points; the
//! capped total is compared against the takeover threshold. Crossing the
//! (much higher) suspension threshold with automated response enabled
//! revokes all the user's sessions and suspends the account, the single
//! destructive automated action in the system.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::SecurityResult;
use crate::config::{TakeoverConfig, TravelConfig};
use crate::events::{EventSink, SecurityEvent};
use crate::session::SessionManager;
use crate::storage::{AccountControl, LoginHistoryStore, LoginRecord};
use crate::threat::travel;

/// Maximum total risk score.
const SCORE_CAP: u8 = 10;

/// Severity of one risk signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points this severity contributes to the total score.
    #[must_use]
    pub fn points(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 3,
            Self::High => 5,
            Self::Critical => 10,
        }
    }
}

/// One sub-check that fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSignal {
    /// Name of the sub-check.
    pub check: String,
    /// Severity of the finding.
    pub severity: Severity,
    /// Human-readable detail for the security event log.
    pub detail: String,
}

/// Outcome of one takeover evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Total score, capped at 10.
    pub score: u8,
    /// Whether the score crossed the takeover threshold.
    pub is_takeover: bool,
    /// Whether the automated response (bulk revocation + suspension) fired.
    pub suspended: bool,
    /// The sub-checks that fired.
    pub signals: Vec<RiskSignal>,
}

/// The account-takeover risk scorer.
pub struct TakeoverScorer {
    history: Arc<dyn LoginHistoryStore>,
    sessions: Arc<SessionManager>,
    accounts: Arc<dyn AccountControl>,
    events: Arc<dyn EventSink>,
    travel_config: TravelConfig,
    config: TakeoverConfig,
}

impl TakeoverScorer {
    /// Creates a new scorer.
    #[must_use]
    pub fn new(
        history: Arc<dyn LoginHistoryStore>,
        sessions: Arc<SessionManager>,
        accounts: Arc<dyn AccountControl>,
        events: Arc<dyn EventSink>,
        travel_config: TravelConfig,
        config: TakeoverConfig,
    ) -> Self {
        Self {
            history,
            sessions,
            accounts,
            events,
            travel_config,
            config,
        }
    }

    /// Scores a new login against the user's recent history.
    ///
    /// `login` is the event being evaluated; history rows with the same id
    /// or a later timestamp are ignored.
    pub async fn assess(&self, login: &LoginRecord) -> SecurityResult<RiskAssessment> {
        let since = login.at - time::Duration::seconds(self.config.window.as_secs() as i64);
        let mut history = self.history.recent_for_user(login.user_id, since).await?;
        history.retain(|r| r.id != login.id && r.at <= login.at);

        let mut signals = Vec::new();

        if let Some(previous) = history.first() {
            let check = travel::evaluate(
                previous.location,
                previous.at,
                login.location,
                login.at,
                &self.travel_config,
            );
            if check.impossible {
                self.events
                    .emit(SecurityEvent::ImpossibleTravelDetected {
                        user_id: login.user_id,
                        distance_km: check.distance_km,
                        elapsed_hours: check.elapsed_hours,
                        required_speed_kmh: check.required_speed_kmh,
                    })
                    .await;
                signals.push(RiskSignal {
                    check: "suspicious_location".to_string(),
                    severity: Severity::High,
                    detail: format!(
                        "{:.0} km in {:.1} h requires {:.0} km/h",
                        check.distance_km, check.elapsed_hours, check.required_speed_kmh
                    ),
                });
            }
        }

        if let Some(signal) = device_change_signal(&history, login) {
            signals.push(signal);
        }
        if let Some(signal) = unusual_hour_signal(&history, login) {
            signals.push(signal);
        }
        if let Some(signal) = rapid_login_signal(
            &history,
            login,
            self.config.rapid_login_window,
            self.config.rapid_login_count,
        ) {
            signals.push(signal);
        }

        let score = total_score(&signals);
        let is_takeover = score >= self.config.threshold;
        let mut suspended = false;

        if is_takeover {
            warn!(
                user_id = %login.user_id,
                score,
                signals = signals.len(),
                "account takeover risk threshold crossed"
            );

            if self.config.automated_response && score >= self.config.suspend_threshold {
                suspended = self.suspend(login.user_id).await;
            }

            self.events
                .emit(SecurityEvent::AccountTakeoverDetected {
                    user_id: login.user_id,
                    score,
                    signals: signals.iter().map(|s| s.check.clone()).collect(),
                    suspended,
                })
                .await;
        }

        Ok(RiskAssessment {
            score,
            is_takeover,
            suspended,
            signals,
        })
    }

    /// Revokes every session and flips the account status. Failures are
    /// logged; a half-applied response is reported as not suspended so
    /// operators re-run it.
    async fn suspend(&self, user_id: Uuid) -> bool {
        if let Err(e) = self
            .sessions
            .revoke_all(user_id, "account takeover suspected", None)
            .await
        {
            warn!(user_id = %user_id, error = %e, "takeover response: bulk revocation failed");
            return false;
        }
        if let Err(e) = self
            .accounts
            .suspend_user(user_id, "account takeover suspected")
            .await
        {
            warn!(user_id = %user_id, error = %e, "takeover response: account suspension failed");
            return false;
        }
        true
    }
}

/// Sums signal points, capped at [`SCORE_CAP`].
#[must_use]
fn total_score(signals: &[RiskSignal]) -> u8 {
    signals
        .iter()
        .map(|s| s.severity.points())
        .fold(0u8, |acc, p| acc.saturating_add(p))
        .min(SCORE_CAP)
}

/// Flags when the device family changed repeatedly inside the window.
fn device_change_signal(history: &[LoginRecord], login: &LoginRecord) -> Option<RiskSignal> {
    // Oldest to newest, ending at the login under evaluation.
    let mut hashes: Vec<&str> = history
        .iter()
        .rev()
        .map(|r| r.fingerprint.stable_hash.as_str())
        .collect();
    hashes.push(&login.fingerprint.stable_hash);

    let changes = hashes.windows(2).filter(|w| w[0] != w[1]).count();
    if changes >= 2 {
        Some(RiskSignal {
            check: "device_change".to_string(),
            severity: Severity::Medium,
            detail: format!("{changes} device changes inside the window"),
        })
    } else {
        None
    }
}

/// Flags logins far outside the user's recent login hours.
fn unusual_hour_signal(history: &[LoginRecord], login: &LoginRecord) -> Option<RiskSignal> {
    if history.is_empty() {
        return None;
    }

    let average_hour =
        history.iter().map(|r| f64::from(r.at.hour())).sum::<f64>() / history.len() as f64;
    let deviation = (f64::from(login.at.hour()) - average_hour).abs();

    let severity = if deviation > 12.0 {
        Severity::High
    } else if deviation > 6.0 {
        Severity::Medium
    } else {
        return None;
    };

    Some(RiskSignal {
        check: "unusual_hour".to_string(),
        severity,
        detail: format!("{deviation:.1} h from the recent average login hour"),
    })
}

/// Flags bursts of logins in quick succession.
fn rapid_login_signal(
    history: &[LoginRecord],
    login: &LoginRecord,
    window: std::time::Duration,
    count_threshold: usize,
) -> Option<RiskSignal> {
    let burst_start = login.at - time::Duration::seconds(window.as_secs() as i64);
    let burst = 1 + history.iter().filter(|r| r.at >= burst_start).count();

    if burst >= count_threshold {
        Some(RiskSignal {
            check: "rapid_logins".to_string(),
            severity: Severity::Medium,
            detail: format!("{burst} logins within {} s", window.as_secs()),
        })
    } else {
        None
    }
}
