//! Constants for SeaWatch Core
//!
//! This module provides centralized, documented constants used throughout
//! the fusion engine. Configuration defaults are taken from here, so the
//! numbers in `FusionConfig::default()` and the numbers in this module can
//! never drift apart.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Geodesy**: Earth model, unit conversions, AIS sentinels
//! - **Time**: Unit conversions and cycle intervals
//! - **Fusion**: Noise profiles and Kalman numerics
//! - **Tracking**: Gating, lifecycle, identifier pool
//! - **Anomaly**: Severity tiers per integrity check
//! - **Integrity**: Interference zone clustering
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Reference standards or data sources where applicable
//! 3. Use descriptive names that include units

/// Earth model and unit conversions.
pub mod geodesy;

/// Time-related constants for intervals and conversions.
pub mod time;

/// Kalman filter noise profiles and numerical safeguards.
pub mod fusion;

/// Association, lifecycle and history parameters.
pub mod tracking;

/// Default anomaly severity tiers.
pub mod anomaly;

/// Signal-loss clustering parameters.
pub mod integrity;

// Re-export commonly used constants for convenience
pub use geodesy::{EARTH_RADIUS_M, MS_PER_KNOT};

pub use time::{MS_PER_SECOND, DEFAULT_CYCLE_INTERVAL_MS};

pub use tracking::{HISTORY_CAPACITY, SOURCE_COUNT, DEFAULT_GATE_RADIUS_M};
