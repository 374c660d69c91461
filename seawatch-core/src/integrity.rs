//! Signal Integrity Monitor
//!
//! A confirmed track that falls silent (CONFIRMED → STALE) is a signal-loss
//! event at its last fused position. One vessel going quiet means little;
//! several going quiet close together in a short time suggests GNSS or AIS
//! interference. The monitor keeps recent events and clusters them:
//!
//! ```text
//!   ×  ×            ×  = signal-loss event
//!  × ⊙ ×     ×      ⊙  = zone centroid (mean of clustered events)
//!   ×               ── cluster_radius_m around the seed event
//! ```
//!
//! Clustering is greedy: each unassigned event seeds a cluster and absorbs
//! every unassigned event within the radius of the seed. Clusters with at
//! least `min_events` events become zones.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    anomaly::Severity,
    constants::integrity::{
        INTERFERENCE_CLUSTER_RADIUS_M, INTERFERENCE_HIGH_EVENTS, INTERFERENCE_MIN_EVENTS,
        SIGNAL_LOSS_CAPACITY, SIGNAL_LOSS_TTL_SECS,
    },
    geo::{haversine_m, GeoPoint, LocalFrame},
    time::{secs_to_ms, Timestamp},
    track::TrackId,
};

/// Clustering parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// How long an event is remembered (s)
    pub event_ttl_secs: f64,
    /// Seed radius within which events join a zone (m)
    pub cluster_radius_m: f64,
    /// Events needed for a zone
    pub min_events: usize,
    /// Zones with more events than this are HIGH
    pub high_events: usize,
    /// Remembered events; the oldest are dropped beyond this
    pub capacity: usize,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            event_ttl_secs: SIGNAL_LOSS_TTL_SECS,
            cluster_radius_m: INTERFERENCE_CLUSTER_RADIUS_M,
            min_events: INTERFERENCE_MIN_EVENTS,
            high_events: INTERFERENCE_HIGH_EVENTS,
            capacity: SIGNAL_LOSS_CAPACITY,
        }
    }
}

/// A confirmed track falling silent
#[derive(Debug, Clone, PartialEq)]
pub struct SignalLossEvent {
    /// Track that went silent
    pub track_id: TrackId,
    /// Last fused position of the track
    pub position: GeoPoint,
    /// Time of the CONFIRMED→STALE transition
    pub timestamp: Timestamp,
}

/// Area where several tracks lost signal together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterferenceZone {
    /// Centroid latitude (degrees)
    pub latitude: f64,
    /// Centroid longitude (degrees)
    pub longitude: f64,
    /// Clustering radius used (m)
    pub radius_m: f64,
    /// MEDIUM, or HIGH for large clusters
    pub severity: Severity,
    /// Signal-loss events in the zone
    pub event_count: usize,
}

/// Rolling store of signal-loss events
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    config: IntegrityConfig,
    events: VecDeque<SignalLossEvent>,
}

impl IntegrityMonitor {
    /// Empty monitor
    pub fn new(config: IntegrityConfig) -> Self {
        Self {
            config,
            events: VecDeque::with_capacity(config.capacity.min(SIGNAL_LOSS_CAPACITY)),
        }
    }

    /// Remember one signal-loss event
    pub fn record(&mut self, event: SignalLossEvent) {
        debug!(
            "signal loss on {} at {:.5},{:.5}",
            event.track_id, event.position.latitude, event.position.longitude
        );
        if self.config.capacity == 0 {
            return;
        }
        if self.events.len() >= self.config.capacity {
            warn!("signal-loss store full ({}), dropping oldest event", self.config.capacity);
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Forget events older than the TTL
    pub fn prune(&mut self, now: Timestamp) {
        let ttl_ms = secs_to_ms(self.config.event_ttl_secs);
        self.events.retain(|e| now.saturating_sub(e.timestamp) <= ttl_ms);
    }

    /// Number of remembered events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Current interference zones from events still inside the TTL
    pub fn zones(&self, now: Timestamp) -> Vec<InterferenceZone> {
        let ttl_ms = secs_to_ms(self.config.event_ttl_secs);
        let active: Vec<&SignalLossEvent> = self
            .events
            .iter()
            .filter(|e| now.saturating_sub(e.timestamp) <= ttl_ms)
            .collect();

        let mut assigned = vec![false; active.len()];
        let mut zones = Vec::new();

        for (seed_idx, seed) in active.iter().enumerate() {
            if assigned[seed_idx] {
                continue;
            }
            assigned[seed_idx] = true;

            // Averaged in the seed's tangent plane so clusters across ±180° stay put
            let frame = LocalFrame::new(seed.position);
            let mut offset_sum = [0.0, 0.0];
            let mut count = 1usize;

            for (idx, other) in active.iter().enumerate() {
                if assigned[idx] {
                    continue;
                }
                if haversine_m(&seed.position, &other.position) <= self.config.cluster_radius_m {
                    assigned[idx] = true;
                    let [east, north] = frame.to_local(&other.position);
                    offset_sum[0] += east;
                    offset_sum[1] += north;
                    count += 1;
                }
            }

            if count >= self.config.min_events {
                let centroid =
                    frame.to_geo([offset_sum[0] / count as f64, offset_sum[1] / count as f64]);
                zones.push(InterferenceZone {
                    latitude: centroid.latitude,
                    longitude: centroid.longitude,
                    radius_m: self.config.cluster_radius_m,
                    severity: if count > self.config.high_events {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    event_count: count,
                });
            }
        }

        zones
    }
}

impl Default for IntegrityMonitor {
    fn default() -> Self {
        Self::new(IntegrityConfig::default())
    }
}
