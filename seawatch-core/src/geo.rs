//! WGS-84 Geometry Helpers
//!
//! ## Overview
//!
//! The Kalman filter runs in metres, sensors report degrees. This module
//! converts between the two:
//!
//! - **Haversine distance** on a spherical Earth, used for gating and for the
//!   integrity checks that compare raw observations directly.
//! - **Local tangent plane** (equirectangular around an origin), used as the
//!   filter's state space. Each track owns one frame and re-anchors it when
//!   the vessel moves far away from the origin.
//! - **Course/speed ↔ velocity** conversion between AIS kinematics (knots,
//!   degrees clockwise from north) and east/north velocity in m/s.
//!
//! ```text
//!        north (y)
//!          ▲
//!          │   • vessel (east, north) in metres
//!          │
//!   origin ┼────────▶ east (x)
//! ```
//!
//! Math goes through `libm` so results are identical across targets.

use serde::{Deserialize, Serialize};

use crate::constants::geodesy::{EARTH_RADIUS_M, MIN_LATITUDE_COSINE, MS_PER_KNOT};

/// A WGS-84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
}

impl GeoPoint {
    /// Point from latitude and longitude in degrees
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance to another point in metres
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_m(self, other)
    }
}

/// Great-circle distance between two points (metres)
///
/// ```text
/// a = sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)
/// d = 2R · atan2(√a, √(1−a))
/// ```
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = normalize_longitude(b.longitude - a.longitude).to_radians();

    let sin_lat = libm::sin(d_lat / 2.0);
    let sin_lon = libm::sin(d_lon / 2.0);
    let h = sin_lat * sin_lat + libm::cos(lat1) * libm::cos(lat2) * sin_lon * sin_lon;
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * libm::atan2(libm::sqrt(h), libm::sqrt(1.0 - h))
}

/// Wrap a longitude (or longitude difference) into [-180, 180)
pub fn normalize_longitude(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && degrees > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Wrap a bearing into [0, 360)
pub fn normalize_bearing(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Local east/north tangent plane anchored at an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: GeoPoint,
    cos_lat: f64,
}

impl LocalFrame {
    /// Create a frame anchored at `origin`
    pub fn new(origin: GeoPoint) -> Self {
        let cos_lat = libm::cos(origin.latitude.to_radians()).max(MIN_LATITUDE_COSINE);
        Self { origin, cos_lat }
    }

    /// The anchor point of this frame
    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Project a geographic point into (east, north) metres
    pub fn to_local(&self, point: &GeoPoint) -> [f64; 2] {
        let d_lat = (point.latitude - self.origin.latitude).to_radians();
        let d_lon = normalize_longitude(point.longitude - self.origin.longitude).to_radians();
        [EARTH_RADIUS_M * d_lon * self.cos_lat, EARTH_RADIUS_M * d_lat]
    }

    /// Convert (east, north) metres back into a geographic point
    pub fn to_geo(&self, east_north: [f64; 2]) -> GeoPoint {
        let latitude = self.origin.latitude + (east_north[1] / EARTH_RADIUS_M).to_degrees();
        let longitude = self.origin.longitude
            + (east_north[0] / (EARTH_RADIUS_M * self.cos_lat)).to_degrees();
        GeoPoint {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude: normalize_longitude(longitude),
        }
    }
}

/// Convert speed over ground (knots) and course (degrees) to east/north m/s
pub fn velocity_from_course(speed_knots: f64, course_deg: f64) -> [f64; 2] {
    let speed = speed_knots * MS_PER_KNOT;
    let course = course_deg.to_radians();
    [speed * libm::sin(course), speed * libm::cos(course)]
}

/// Convert east/north m/s to (speed knots, course degrees)
pub fn course_from_velocity(velocity: [f64; 2]) -> (f64, f64) {
    let speed = libm::sqrt(velocity[0] * velocity[0] + velocity[1] * velocity[1]);
    let course = normalize_bearing(libm::atan2(velocity[0], velocity[1]).to_degrees());
    (speed / MS_PER_KNOT, course)
}
