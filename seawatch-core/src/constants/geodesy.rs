//! Geodesy Constants
//!
//! Earth model and unit conversions for WGS-84 positions. Distances are
//! computed on a sphere of mean radius, which is accurate to ~0.5% and far
//! below sensor noise for the ranges tracked here.

/// Mean Earth radius in metres.
///
/// Source: IUGG mean radius R1 = (2a + b) / 3
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per second in one knot.
///
/// Source: International nautical mile = 1852 m exactly
pub const MS_PER_KNOT: f64 = 1852.0 / 3600.0;

/// Metres in one nautical mile.
pub const METRES_PER_NAUTICAL_MILE: f64 = 1852.0;

/// Valid latitude range in degrees.
pub const LATITUDE_MIN_DEG: f64 = -90.0;
/// Valid latitude range in degrees.
pub const LATITUDE_MAX_DEG: f64 = 90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_MIN_DEG: f64 = -180.0;
/// Valid longitude range in degrees.
pub const LONGITUDE_MAX_DEG: f64 = 180.0;

/// Smallest cosine of latitude used by the local tangent-plane projection.
///
/// Keeps the east axis finite for positions at the poles.
pub const MIN_LATITUDE_COSINE: f64 = 1e-6;

// ===== AIS "NOT AVAILABLE" SENTINELS =====

/// AIS speed over ground meaning "not available" (knots).
///
/// Source: ITU-R M.1371-5, message 1/2/3 SOG field (1023 / 10)
pub const AIS_SPEED_NOT_AVAILABLE_KN: f64 = 102.3;

/// AIS course over ground meaning "not available" (degrees).
///
/// Source: ITU-R M.1371-5, message 1/2/3 COG field (3600 / 10)
pub const AIS_COURSE_NOT_AVAILABLE_DEG: f64 = 360.0;

/// AIS true heading meaning "not available" (degrees).
///
/// Source: ITU-R M.1371-5, message 1/2/3 true heading field
pub const AIS_HEADING_NOT_AVAILABLE_DEG: f64 = 511.0;
