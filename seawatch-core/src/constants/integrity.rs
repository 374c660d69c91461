//! Signal Integrity Constants
//!
//! Parameters for clustering signal-loss events into interference zones.

/// How long a signal-loss event is remembered (seconds).
pub const SIGNAL_LOSS_TTL_SECS: f64 = 600.0;

/// Clustering radius around a signal-loss event (metres).
pub const INTERFERENCE_CLUSTER_RADIUS_M: f64 = 5000.0;

/// Minimum events in one cluster to declare an interference zone.
///
/// Three vessels going silent together is unlikely to be coincidence.
pub const INTERFERENCE_MIN_EVENTS: usize = 3;

/// Event count above which a zone is reported with HIGH severity.
pub const INTERFERENCE_HIGH_EVENTS: usize = 10;

/// Upper bound on remembered signal-loss events.
pub const SIGNAL_LOSS_CAPACITY: usize = 1024;
