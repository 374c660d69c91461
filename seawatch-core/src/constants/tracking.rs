//! Track Management Constants
//!
//! Association gating, lifecycle timeouts, identifier pool, and history
//! buffer sizes.

// ===== ASSOCIATION =====

/// Default association gate radius (metres).
///
/// An unidentified plot further than this from every predicted track
/// position starts a new track. 1 km covers radar error plus a few seconds
/// of unmodelled manoeuvre.
pub const DEFAULT_GATE_RADIUS_M: f64 = 1000.0;

/// Normalized innovation distance (sigma) under which an association
/// counts as consistent for track confirmation.
///
/// Source: sqrt(χ²(0.99, 2)) ≈ 3.03
pub const CONSISTENT_ASSOCIATION_SIGMA: f64 = 3.03;

// ===== LIFECYCLE =====

/// Consistent associations required to promote TENTATIVE → CONFIRMED.
pub const DEFAULT_CONFIRM_HITS: u32 = 3;

/// Silence after which a CONFIRMED track becomes STALE (seconds).
///
/// Class A AIS reports at anchor every 3 minutes; anything longer is a
/// loss of signal.
///
/// Source: ITU-R M.1371-5 reporting intervals
pub const DEFAULT_STALE_AFTER_SECS: f64 = 180.0;

/// Silence after which a STALE track is RETIRED (seconds).
pub const DEFAULT_RETIRE_AFTER_SECS: f64 = 900.0;

/// Cooldown before a retired track identifier may be handed out again
/// (seconds).
///
/// Prevents downstream consumers from stitching an unrelated vessel onto
/// the history of a recently retired one.
pub const DEFAULT_ID_REUSE_COOLDOWN_SECS: f64 = 3600.0;

/// Size of the track identifier pool.
///
/// Identifiers are allocated round-robin from 1..=N, so ids are only
/// recycled after the pool wraps.
pub const DEFAULT_MAX_TRACK_IDS: u32 = 9999;

// ===== HISTORY =====

/// Observations kept per source in each track's rolling history.
///
/// Power of two so the ring index is a mask.
pub const HISTORY_CAPACITY: usize = 16;

/// Number of sensor sources (AIS, RADAR, GNSS).
pub const SOURCE_COUNT: usize = 3;
