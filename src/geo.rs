//! Geo Module
//!
//! Great-circle distance and trajectory metrics.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A position in degrees. Ranges are not validated here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance in meters on a spherical earth.
///
/// NaN or infinite coordinates produce NaN; callers must pass finite input.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Sum of segment distances along `points`, in meters
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|pair| distance(pair[0], pair[1])).sum()
}

/// One timestamped position report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub point: GeoPoint,
    pub time: NaiveDateTime,
    /// Speed reported by the terminal, km/h
    pub speed_kmh: f64,
}

/// Metrics derived from a sequence of fixes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackSummary {
    pub points: usize,
    pub distance_m: f64,
    pub elapsed_secs: i64,
    /// Path length over elapsed time; zero when no time elapsed
    pub average_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

impl TrackSummary {
    /// Summarize fixes in the order given (expected chronological)
    pub fn from_fixes(fixes: &[Fix]) -> Self {
        let points: Vec<GeoPoint> = fixes.iter().map(|f| f.point).collect();
        let distance_m = path_length(&points);

        let elapsed_secs = match (fixes.first(), fixes.last()) {
            (Some(first), Some(last)) => (last.time - first.time).num_seconds().max(0),
            _ => 0,
        };

        let average_speed_kmh = if elapsed_secs > 0 {
            distance_m / elapsed_secs as f64 * 3.6
        } else {
            0.0
        };

        let max_speed_kmh = fixes.iter().map(|f| f.speed_kmh).fold(0.0, f64::max);

        Self {
            points: fixes.len(),
            distance_m,
            elapsed_secs,
            average_speed_kmh,
            max_speed_kmh,
        }
    }
}
