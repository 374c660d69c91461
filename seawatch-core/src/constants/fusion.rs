//! Fusion Algorithm Constants
//!
//! This module defines constants for the per-track Kalman filter: source
//! noise profiles, process noise, numerical safeguards, and confidence
//! scoring.

// ===== OBSERVATION NOISE (1-SIGMA) =====

/// AIS position error (metres, 1-sigma).
///
/// AIS positions come from the transmitting vessel's own GNSS receiver,
/// degraded by antenna offset and reporting latency.
///
/// Source: IEC 61993-2 accuracy flag "high" (< 10 m)
pub const AIS_POSITION_STD_M: f64 = 10.0;

/// AIS speed-over-ground error (m/s, 1-sigma).
///
/// Source: 0.1 kn resolution plus receiver filtering, ~1 kn worst case
pub const AIS_VELOCITY_STD_MS: f64 = 0.5;

/// Radar plot position error (metres, 1-sigma).
///
/// Range resolution is good; azimuth error grows with range. 50 m is
/// typical for a coastal VTS radar at 10 NM.
///
/// Source: IMO MSC.192(79) performance standard for radar equipment
pub const RADAR_POSITION_STD_M: f64 = 50.0;

/// Radar-derived velocity error (m/s, 1-sigma).
pub const RADAR_VELOCITY_STD_MS: f64 = 2.0;

/// GNSS position error (metres, 1-sigma).
///
/// Own-ship or shore-reference receivers with SBAS corrections.
///
/// Source: IMO A.1046(27) worldwide radionavigation system
pub const GNSS_POSITION_STD_M: f64 = 5.0;

/// GNSS velocity error (m/s, 1-sigma).
pub const GNSS_VELOCITY_STD_MS: f64 = 0.2;

// ===== PROCESS NOISE =====

/// Default white-acceleration standard deviation (m/s²).
///
/// Large merchant vessels rarely exceed 0.1 m/s² along or across track.
///
/// Source: Typical ship manoeuvring data (turning circle, crash stop)
pub const DEFAULT_ACCELERATION_STD_MS2: f64 = 0.1;

/// Initial velocity uncertainty when a track is born without kinematics
/// (m/s, 1-sigma).
///
/// Covers vessels up to ~40 kn within 2 sigma.
pub const INITIAL_VELOCITY_STD_MS: f64 = 10.0;

// ===== NUMERICAL SAFEGUARDS =====

/// Pivot magnitude below which a matrix is treated as singular.
pub const MATRIX_SINGULAR_THRESHOLD: f64 = 1e-12;

/// First diagonal regularization tried on a singular innovation
/// covariance, relative to its largest diagonal element.
pub const REGULARIZATION_EPSILON_START: f64 = 1e-9;

/// Largest relative regularization before giving up.
pub const REGULARIZATION_EPSILON_MAX: f64 = 1e-3;

/// Growth factor between regularization attempts.
pub const REGULARIZATION_GROWTH: f64 = 10.0;

/// Distance from the tangent-plane origin that triggers re-anchoring (m).
///
/// The equirectangular projection stays below 1 m of error inside this
/// radius at mid latitudes.
pub const RECENTER_DISTANCE_M: f64 = 20_000.0;

// ===== CONFIDENCE SCORING =====

/// Fixed-point scaling factor for u16 confidence values.
///
/// Maps floating point [0.0, 1.0] to integer [0, 65535].
pub const FIXED_POINT_SCALE: f32 = 65535.0;

/// Number of updates after which a track counts as converged.
pub const CONVERGENCE_UPDATE_COUNT: u32 = 10;

/// Position uncertainty (metres, 1-sigma) that maps to 50% confidence.
pub const CONFIDENCE_REFERENCE_STD_M: f64 = 50.0;

/// Chi-squared 95% critical value for a 2-D innovation.
///
/// Source: χ²(0.95, 2) = 5.99
pub const CHI2_95_2D: f64 = 5.99;
