//! Published Records
//!
//! ## Overview
//!
//! Every fusion cycle produces one `CycleOutput`. Transports never publish it
//! directly; they publish the two views it offers:
//!
//! ```text
//! CycleOutput ──heartbeat()──▶ Heartbeat     (every cycle)
//!             └──alert()─────▶ AlertMessage  (only when there are anomalies)
//! ```
//!
//! Both views borrow from the output, so serializing them copies nothing.
//! Timestamps are published as RFC 3339 UTC strings.
//!
//! ## Wire Format
//!
//! ```json
//! {"timestamp":"2024-05-01T12:00:00Z","status":"ok",
//!  "fused_tracks":[...],"interference_zones":[...],"stats":{...}}
//!
//! {"timestamp":"2024-05-01T12:00:00Z","alerts":[...]}
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    anomaly::AnomalyEvent,
    integrity::InterferenceZone,
    time::{to_datetime, Timestamp},
    track::TrackSnapshot,
};

/// Overall health reported in the heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    /// Nominal
    Ok,
    /// Interference detected or observations dropped for capacity/numerics
    Degraded,
}

/// Counters for one cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleStats {
    /// Sequence number, starting at 1
    pub cycle: u64,
    /// Observations drained this cycle
    pub observations: usize,
    /// Observations that updated an existing track
    pub updated: usize,
    /// Observations that started a track
    pub created: usize,
    /// Observations dropped
    pub rejected: usize,
    /// Dropped observations by error label
    pub rejected_by_reason: BTreeMap<&'static str, usize>,
    /// Anomaly events raised
    pub anomalies: usize,
    /// Tracks retired by this cycle's sweep
    pub retired: usize,
    /// TENTATIVE tracks after the sweep
    pub tentative_tracks: usize,
    /// CONFIRMED tracks after the sweep
    pub confirmed_tracks: usize,
    /// STALE tracks after the sweep
    pub stale_tracks: usize,
}

/// Everything one cycle produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutput {
    /// Cycle time
    pub timestamp: Timestamp,
    /// Health at the end of the cycle
    pub status: SystemStatus,
    /// Live tracks after the sweep
    pub tracks: Vec<TrackSnapshot>,
    /// Events raised this cycle
    pub anomalies: Vec<AnomalyEvent>,
    /// Active interference zones
    pub interference_zones: Vec<InterferenceZone>,
    /// Cycle counters
    pub stats: CycleStats,
    /// Alerts are withheld (no live tracks and suppression enabled)
    pub suppress_alerts: bool,
}

impl CycleOutput {
    /// Heartbeat view, published every cycle
    pub fn heartbeat(&self) -> Heartbeat<'_> {
        Heartbeat {
            timestamp: to_datetime(self.timestamp),
            status: self.status,
            fused_tracks: &self.tracks,
            interference_zones: &self.interference_zones,
            stats: &self.stats,
        }
    }

    /// Alert view; `None` when there is nothing to alert on
    pub fn alert(&self) -> Option<AlertMessage<'_>> {
        if self.anomalies.is_empty() || self.suppress_alerts {
            return None;
        }
        Some(AlertMessage {
            timestamp: to_datetime(self.timestamp),
            alerts: &self.anomalies,
        })
    }
}

/// Periodic status message
#[derive(Debug, Clone, Serialize)]
pub struct Heartbeat<'a> {
    /// Cycle time (RFC 3339)
    pub timestamp: DateTime<Utc>,
    /// Health at the end of the cycle
    pub status: SystemStatus,
    /// Live tracks
    pub fused_tracks: &'a [TrackSnapshot],
    /// Active interference zones
    pub interference_zones: &'a [InterferenceZone],
    /// Cycle counters
    pub stats: &'a CycleStats,
}

/// Batch of anomaly events
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage<'a> {
    /// Cycle time (RFC 3339)
    pub timestamp: DateTime<Utc>,
    /// Events raised this cycle
    pub alerts: &'a [AnomalyEvent],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_output() -> CycleOutput {
        CycleOutput {
            timestamp: 1_714_564_800_000,
            status: SystemStatus::Ok,
            tracks: Vec::new(),
            anomalies: Vec::new(),
            interference_zones: Vec::new(),
            stats: CycleStats { cycle: 1, ..Default::default() },
            suppress_alerts: false,
        }
    }

    #[test]
    fn heartbeat_wire_format() {
        let output = empty_output();
        let json = serde_json::to_value(output.heartbeat()).unwrap();

        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(json["status"], "ok");
        assert!(json["fused_tracks"].as_array().unwrap().is_empty());
        assert_eq!(json["stats"]["cycle"], 1);
    }

    #[test]
    fn no_alert_without_anomalies() {
        assert!(empty_output().alert().is_none());
    }
}
