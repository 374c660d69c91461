//! Error Types for Track Fusion Failures
//!
//! ## Design Philosophy
//!
//! Every error here is local to one observation. The fusion cycle catches it,
//! logs the skip, counts it, and moves on to the next observation:
//!
//! 1. **Small Size**: Variants carry only numbers and `&'static str` field
//!    names, so errors are `Copy` and cheap to return from the hot path.
//!
//! 2. **Non-destructive**: An error is always returned *before* any track is
//!    mutated. A rejected observation leaves the track set byte-for-byte as it
//!    was.
//!
//! 3. **Actionable Information**: Each error carries enough context for the
//!    skip log line to be useful without re-reading the input.
//!
//! ## Error Categories
//!
//! ### Input Violations
//! - `InvalidObservation`: Coordinates or kinematics outside physical ranges
//! - `InvalidTimestep`: Observation not strictly newer than the track state
//!
//! ### Association
//! - `AssociationAmbiguous`: Several tracks inside the gate. Never returned as
//!   a failure; the tie-break resolves it and the value is only logged.
//! - `TrackLimitReached`: The track id pool is exhausted
//!
//! ### Numerics
//! - `SingularCovariance`: Innovation covariance could not be inverted even
//!   after regularization
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use seawatch_core::{FusionError, TrackManager, FusionConfig, SensorObservation, SensorSource};
//!
//! let mut manager = TrackManager::new(FusionConfig::default());
//! let observation = SensorObservation::new(SensorSource::Ais, 1_000, 91.0, 20.0);
//!
//! match manager.ingest(observation) {
//!     Ok((_track_id, _result)) => {}
//!     Err(FusionError::InvalidObservation { .. }) => {
//!         // Drop the report, keep the cycle running
//!     }
//!     Err(FusionError::InvalidTimestep { .. }) => {
//!         // Stale or duplicate report; the track kept its prior state
//!     }
//!     Err(_) => {}
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for fusion operations
pub type FusionResult<T> = Result<T, FusionError>;

/// Fusion errors - one observation's worth of failure
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FusionError {
    /// Observation field outside its physical range (or not a number)
    #[error("Invalid observation: {field} = {value}")]
    InvalidObservation {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
    },

    /// Elapsed time since the track's last update is zero or negative
    #[error("Invalid timestep: {elapsed_ms} ms since last update")]
    InvalidTimestep {
        /// Signed elapsed time in milliseconds
        elapsed_ms: i64,
    },

    /// More than one track inside the association gate
    #[error("Ambiguous association: {candidates} tracks inside gate")]
    AssociationAmbiguous {
        /// Number of gated candidates
        candidates: usize,
    },

    /// No free track identifier in the pool
    #[error("Track limit reached: {capacity} identifiers in use or cooling down")]
    TrackLimitReached {
        /// Size of the identifier pool
        capacity: u32,
    },

    /// Innovation covariance stayed singular after regularization
    #[error("Innovation covariance is singular")]
    SingularCovariance,
}

impl FusionError {
    /// Short machine-friendly label, used in logs and cycle statistics
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InvalidObservation { .. } => "invalid_observation",
            Self::InvalidTimestep { .. } => "invalid_timestep",
            Self::AssociationAmbiguous { .. } => "association_ambiguous",
            Self::TrackLimitReached { .. } => "track_limit_reached",
            Self::SingularCovariance => "singular_covariance",
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Cannot read config file {path}: {message}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying I/O error
        message: String,
    },

    /// Configuration text is not valid TOML for the expected schema
    #[error("Cannot parse config: {0}")]
    Parse(String),

    /// A setting is outside its allowed range
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted name of the setting
        field: &'static str,
        /// What the value must satisfy
        reason: &'static str,
    },
}
