//! Threat signal detectors.
//!
//! Three detectors whose outputs gate rotation and eviction decisions:
//!
//! - [`brute_force`] - sliding-window attempt counting with progressive
//!   lockout
//! - [`travel`] - impossible-travel evaluation via great-circle distance
//! - [`takeover`] - account-takeover risk scoring over login history

pub mod brute_force;
pub mod takeover;
pub mod travel;

pub use brute_force::{BruteForceDetector, BruteForceOutcome, LockoutRecord};
pub use takeover::{RiskAssessment, RiskSignal, Severity, TakeoverScorer};
pub use travel::{TravelCheck, evaluate as evaluate_travel, haversine_km};
