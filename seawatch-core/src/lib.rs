//! Core fusion engine for SeaWatch
//!
//! Fuses AIS, radar and GNSS position reports into one track per vessel and
//! flags reports that do not fit the track they belong to.
//!
//! Key constraints:
//! - One owner for the live track set (the `TrackManager`)
//! - A rejected observation never changes a track
//! - Bounded memory per track and per update
//!
//! ```no_run
//! use seawatch_core::{FusionConfig, SensorObservation, SensorSource, TrackManager};
//!
//! let mut manager = TrackManager::new(FusionConfig::default());
//! let report = SensorObservation::new(SensorSource::Ais, 1_714_564_800_000, 55.68, 12.60)
//!     .with_vessel_id("219000123")
//!     .with_kinematics(12.5, 87.0);
//!
//! match manager.ingest(report) {
//!     Ok((track_id, _result)) => println!("updated {}", track_id),
//!     Err(e) => eprintln!("dropped: {}", e),
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod anomaly;
pub mod buffer;
pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod fusion;
pub mod geo;
pub mod integrity;
pub mod manager;
pub mod observation;
pub mod orchestrator;
pub mod time;
pub mod track;

// Public API
pub use anomaly::{AnomalyConfig, AnomalyDetector, AnomalyEvent, AnomalyKind, Severity};
pub use config::FusionConfig;
pub use errors::{ConfigError, FusionError, FusionResult};
pub use events::{AlertMessage, CycleOutput, CycleStats, Heartbeat, SystemStatus};
pub use geo::GeoPoint;
pub use integrity::{InterferenceZone, IntegrityMonitor};
pub use manager::{Association, TrackManager, TrackUpdateResult};
pub use observation::{SensorObservation, SensorSource, VesselClass};
pub use orchestrator::{BatchFeed, ChannelFeed, FusionOrchestrator, ObservationFeed, Publisher};
pub use time::{FixedTime, SystemTime, TimeSource, Timestamp};
pub use track::{Track, TrackId, TrackSnapshot, TrackStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
