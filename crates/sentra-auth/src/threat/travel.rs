//! Impossible-travel evaluation.
//!
//! Compares the most recent prior login location/time with a new login's
//! location/time: if covering the great-circle distance between them would
//! have required an implausible average speed, the login is flagged.
//!
//! Evaluation is skipped when the elapsed time is under the configured
//! minimum (insufficient signal) or when either location is unknown.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::TravelConfig;
use crate::storage::GeoPoint;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Outcome of one impossible-travel evaluation.
///
/// Carries the full computation for audit: distance, elapsed time, required
/// speed, and both locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelCheck {
    /// Whether the check actually ran. `false` means skipped (short
    /// elapsed time or unknown location), not "possible".
    pub evaluated: bool,

    /// Whether the login requires implausible travel.
    pub impossible: bool,

    /// Great-circle distance between the two logins, km.
    pub distance_km: f64,

    /// Time between the two logins, hours.
    pub elapsed_hours: f64,

    /// Average speed required to cover the distance, km/h.
    pub required_speed_kmh: f64,

    /// Prior login location, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<GeoPoint>,

    /// New login location, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<GeoPoint>,
}

impl TravelCheck {
    fn skipped(from: Option<GeoPoint>, to: Option<GeoPoint>, elapsed_hours: f64) -> Self {
        Self {
            evaluated: false,
            impossible: false,
            distance_km: 0.0,
            elapsed_hours,
            required_speed_kmh: 0.0,
            from,
            to,
        }
    }
}

/// Great-circle distance between two points via the haversine formula.
#[must_use]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Evaluates travel between a prior and a new login.
#[must_use]
pub fn evaluate(
    from: Option<GeoPoint>,
    from_at: OffsetDateTime,
    to: Option<GeoPoint>,
    to_at: OffsetDateTime,
    config: &TravelConfig,
) -> TravelCheck {
    let elapsed_hours = ((to_at - from_at).whole_seconds().max(0) as f64) / 3600.0;
    let min_elapsed_hours = config.min_elapsed.as_secs() as f64 / 3600.0;

    if elapsed_hours < min_elapsed_hours {
        return TravelCheck::skipped(from, to, elapsed_hours);
    }
    let (Some(from_point), Some(to_point)) = (from, to) else {
        return TravelCheck::skipped(from, to, elapsed_hours);
    };

    let distance_km = haversine_km(from_point, to_point);
    let required_speed_kmh = distance_km / elapsed_hours;

    TravelCheck {
        evaluated: true,
        impossible: required_speed_kmh > config.max_speed_kmh,
        distance_km,
        elapsed_hours,
        required_speed_kmh,
        from,
        to,
    }
}
