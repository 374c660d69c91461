//! Anomaly Detection Thresholds
//!
//! Default severity tiers for each integrity check. Every tier triple is
//! (LOW, MEDIUM, HIGH); a value below the LOW tier raises nothing.

// ===== POSITION JUMP =====

/// Normalized innovation distance (sigma) for LOW / MEDIUM / HIGH.
///
/// 4σ is already beyond χ²(0.999, 2); the upper tiers separate a glitch
/// from a spoofed or swapped identity.
pub const POSITION_JUMP_SIGMA: [f64; 3] = [4.0, 8.0, 16.0];

// ===== TIMING GAP =====

/// Silence between consecutive observations (seconds).
///
/// Source: Class A AIS reports every 2-10 s underway, 3 min at anchor
pub const TIMING_GAP_SECS: [f64; 3] = [60.0, 180.0, 600.0];

// ===== SPEED DISCONTINUITY =====

/// Ratio of implied speed to the vessel-class maximum.
pub const SPEED_RATIO_TIERS: [f64; 3] = [1.0, 1.5, 2.0];

/// Shortest interval over which implied speed is computed (seconds).
///
/// Below this, position noise dominates the implied speed.
pub const SPEED_MIN_INTERVAL_SECS: f64 = 1.0;

/// Plausible maximum speed per vessel class (knots).
pub mod max_speed {
    /// Unknown class: fast ferries and patrol craft included.
    pub const UNKNOWN_KN: f64 = 50.0;
    /// Container ships and bulkers.
    pub const CARGO_KN: f64 = 30.0;
    /// Tankers.
    pub const TANKER_KN: f64 = 25.0;
    /// Passenger ships and conventional ferries.
    pub const PASSENGER_KN: f64 = 40.0;
    /// Fishing vessels.
    pub const FISHING_KN: f64 = 20.0;
    /// Pleasure craft.
    pub const PLEASURE_KN: f64 = 45.0;
    /// High-speed craft (AIS ship type 40-49).
    pub const HIGH_SPEED_CRAFT_KN: f64 = 70.0;
    /// Tugs and service vessels.
    pub const TUG_KN: f64 = 20.0;
}

// ===== SOURCE DISAGREEMENT =====

/// Cross-source position difference (metres).
///
/// Source: Original discrepancy check (MEDIUM above 500 m, HIGH above 1 km)
pub const SOURCE_DISAGREEMENT_M: [f64; 3] = [300.0, 500.0, 1000.0];

/// Window within which two sources are compared directly (seconds).
pub const SOURCE_DISAGREEMENT_WINDOW_SECS: f64 = 10.0;
