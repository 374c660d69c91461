//! Fusion Cycle Orchestrator
//!
//! ## Overview
//!
//! One cycle turns a batch of observations into one `CycleOutput`:
//!
//! ```text
//! ObservationFeed ──batch──▶ sort ──▶ TrackManager::ingest ──▶ AnomalyDetector
//!                                              │
//!                            sweep ◀───────────┘
//!                              │ CONFIRMED → STALE
//!                              ▼
//!                      IntegrityMonitor ──▶ CycleOutput ──▶ Publisher
//! ```
//!
//! `run_cycle` does no I/O, so it can be driven directly from tests or a
//! replay tool. `step` and `run` add the feed and publisher around it.
//!
//! ## Cycle Time
//!
//! With a wall clock, each cycle is stamped with the clock. With a simulated
//! clock, the cycle time never falls behind the newest observation seen, so
//! recorded traffic replays with its own timing.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    },
    time::Duration,
};

use log::{debug, info, warn};

use crate::{
    anomaly::AnomalyDetector,
    config::FusionConfig,
    errors::FusionError,
    events::{CycleOutput, CycleStats, SystemStatus},
    integrity::{IntegrityMonitor, SignalLossEvent},
    manager::{Association, TrackManager},
    observation::SensorObservation,
    time::{SystemTime, TimeSource, Timestamp},
    track::TrackStatus,
};

/// Source of observation batches
pub trait ObservationFeed {
    /// Wait up to `max_wait` for observations and return everything available
    ///
    /// Returns `None` once the feed is closed and drained. An empty batch
    /// means the wait timed out.
    fn next_batch(&mut self, max_wait: Duration) -> Option<Vec<SensorObservation>>;
}

/// Sink for cycle outputs
pub trait Publisher {
    type Error: core::fmt::Display;

    /// Publish the heartbeat (and alerts, if any) for one cycle
    fn publish(&mut self, output: &CycleOutput) -> Result<(), Self::Error>;

    /// Release the transport after the final publish
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Feed backed by a std channel
///
/// Observations sent after a batch is drained wait for the next batch.
#[derive(Debug)]
pub struct ChannelFeed {
    receiver: Receiver<SensorObservation>,
    closed: bool,
}

impl ChannelFeed {
    /// Feed draining `receiver`
    pub fn new(receiver: Receiver<SensorObservation>) -> Self {
        Self { receiver, closed: false }
    }
}

impl ObservationFeed for ChannelFeed {
    fn next_batch(&mut self, max_wait: Duration) -> Option<Vec<SensorObservation>> {
        if self.closed {
            return None;
        }

        let first = match self.receiver.recv_timeout(max_wait) {
            Ok(observation) => observation,
            Err(RecvTimeoutError::Timeout) => return Some(Vec::new()),
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                return None;
            }
        };

        let mut batch = vec![first];
        loop {
            match self.receiver.try_recv() {
                Ok(observation) => batch.push(observation),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Deliver what we have; the next call reports closure
                    self.closed = true;
                    break;
                }
            }
        }
        Some(batch)
    }
}

/// Feed over a fixed list of batches, for replays and tests
#[derive(Debug, Clone, Default)]
pub struct BatchFeed {
    batches: std::collections::VecDeque<Vec<SensorObservation>>,
}

impl BatchFeed {
    /// Feed yielding `batches` in order, then closing
    pub fn new(batches: impl IntoIterator<Item = Vec<SensorObservation>>) -> Self {
        Self { batches: batches.into_iter().collect() }
    }
}

impl ObservationFeed for BatchFeed {
    fn next_batch(&mut self, _max_wait: Duration) -> Option<Vec<SensorObservation>> {
        self.batches.pop_front()
    }
}

/// Drives the fusion cycle
#[derive(Debug)]
pub struct FusionOrchestrator<T: TimeSource = SystemTime> {
    manager: TrackManager,
    detector: AnomalyDetector,
    integrity: IntegrityMonitor,
    clock: T,
    cycle: u64,
    /// Newest observation time seen, for simulated clocks
    high_water: Timestamp,
}

impl FusionOrchestrator<SystemTime> {
    /// Orchestrator stamped by the system clock
    pub fn new(config: FusionConfig) -> Self {
        Self::with_clock(config, SystemTime)
    }
}

impl<T: TimeSource> FusionOrchestrator<T> {
    /// Orchestrator stamped by `clock`
    pub fn with_clock(config: FusionConfig, clock: T) -> Self {
        let detector = AnomalyDetector::new(config.anomaly, config.noise);
        let integrity = IntegrityMonitor::new(config.integrity);
        Self {
            manager: TrackManager::new(config),
            detector,
            integrity,
            clock,
            cycle: 0,
            high_water: 0,
        }
    }

    /// Live track set
    pub fn manager(&self) -> &TrackManager {
        &self.manager
    }

    /// Active configuration
    pub fn config(&self) -> &FusionConfig {
        self.manager.config()
    }

    /// Clock, for advancing simulated time
    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }

    /// Cycles completed so far
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    fn cycle_time(&self, batch: &[SensorObservation]) -> Timestamp {
        let now = self.clock.now();
        if self.clock.is_wall_clock() {
            return now;
        }
        let newest = batch.iter().map(|o| o.timestamp).max().unwrap_or(0);
        now.max(self.high_water).max(newest)
    }

    /// Run one cycle over `batch`, stamped by the orchestrator's clock
    pub fn tick(&mut self, batch: Vec<SensorObservation>) -> CycleOutput {
        let now = self.cycle_time(&batch);
        self.run_cycle(batch, now)
    }

    /// Run one cycle over `batch` at time `now`
    pub fn run_cycle(&mut self, mut batch: Vec<SensorObservation>, now: Timestamp) -> CycleOutput {
        self.cycle += 1;
        batch.sort_by_key(|o| o.timestamp);

        let mut stats = CycleStats {
            cycle: self.cycle,
            observations: batch.len(),
            ..Default::default()
        };
        let mut anomalies = Vec::new();
        let mut degraded = false;

        for observation in batch {
            self.high_water = self.high_water.max(observation.timestamp);
            let source = observation.source;
            let timestamp = observation.timestamp;

            match self.manager.ingest(observation) {
                Ok((_, result)) if result.association == Association::Created => {
                    stats.created += 1;
                }
                Ok((id, result)) => {
                    stats.updated += 1;
                    let (Some(track), Some(innovation)) = (self.manager.track(id), result.innovation)
                    else {
                        continue;
                    };
                    for event in self.detector.evaluate(track, track.last_observation(), &innovation) {
                        info!("{}", event);
                        anomalies.push(event);
                    }
                }
                Err(err) => {
                    stats.rejected += 1;
                    *stats.rejected_by_reason.entry(err.label()).or_insert(0) += 1;
                    match err {
                        FusionError::TrackLimitReached { .. } | FusionError::SingularCovariance => {
                            degraded = true;
                            warn!("dropped {} observation at {}: {}", source, timestamp, err);
                        }
                        _ => debug!("skipped {} observation at {}: {}", source, timestamp, err),
                    }
                }
            }
        }
        stats.anomalies = anomalies.len();

        for transition in self.manager.sweep(now) {
            let change = transition.change;
            if change.from == TrackStatus::Confirmed && change.to == TrackStatus::Stale {
                self.integrity.record(SignalLossEvent {
                    track_id: change.track_id,
                    position: transition.position,
                    timestamp: now,
                });
            }
            if change.to == TrackStatus::Retired {
                stats.retired += 1;
            }
        }

        self.integrity.prune(now);
        let interference_zones = self.integrity.zones(now);
        for zone in &interference_zones {
            warn!(
                "{:?} interference zone at {:.4},{:.4} ({} signal losses)",
                zone.severity, zone.latitude, zone.longitude, zone.event_count
            );
        }

        for track in self.manager.tracks() {
            match track.status() {
                TrackStatus::Tentative => stats.tentative_tracks += 1,
                TrackStatus::Confirmed => stats.confirmed_tracks += 1,
                TrackStatus::Stale => stats.stale_tracks += 1,
                TrackStatus::Retired => {}
            }
        }

        let status = if degraded || !interference_zones.is_empty() {
            SystemStatus::Degraded
        } else {
            SystemStatus::Ok
        };

        debug!(
            "cycle {}: {} observations, {} created, {} updated, {} rejected, {} anomalies, {} tracks",
            stats.cycle,
            stats.observations,
            stats.created,
            stats.updated,
            stats.rejected,
            stats.anomalies,
            self.manager.len()
        );

        CycleOutput {
            timestamp: now,
            status,
            tracks: self.manager.snapshots(now),
            anomalies,
            interference_zones,
            stats,
            suppress_alerts: self.manager.config().suppress_alerts_without_tracks
                && self.manager.is_empty(),
        }
    }

    /// Wait for one batch, run a cycle, and publish it
    ///
    /// Returns `Ok(false)` once the feed is closed. Only publish failures are
    /// surfaced; track state is already committed when they occur.
    pub fn step<F, P>(&mut self, feed: &mut F, publisher: &mut P) -> Result<bool, P::Error>
    where
        F: ObservationFeed + ?Sized,
        P: Publisher + ?Sized,
    {
        let Some(batch) = feed.next_batch(self.config().cycle_interval()) else {
            return Ok(false);
        };
        let output = self.tick(batch);
        publisher.publish(&output)?;
        Ok(true)
    }

    /// Loop until `shutdown` is set or the feed closes
    ///
    /// A failed publish is logged and the loop carries on; the next cycle
    /// publishes a fresh snapshot. On exit, a final snapshot is published and
    /// the publisher is closed.
    pub fn run<F, P>(&mut self, feed: &mut F, publisher: &mut P, shutdown: &AtomicBool)
    where
        F: ObservationFeed + ?Sized,
        P: Publisher + ?Sized,
    {
        info!("fusion loop started (cycle interval {:?})", self.config().cycle_interval());

        while !shutdown.load(Ordering::Relaxed) {
            match self.step(feed, publisher) {
                Ok(true) => {}
                Ok(false) => {
                    info!("observation feed closed");
                    break;
                }
                Err(e) => warn!("publish failed in cycle {}: {}", self.cycle, e),
            }
        }

        let output = self.tick(Vec::new());
        if let Err(e) = publisher.publish(&output) {
            warn!("final publish failed: {}", e);
        }
        if let Err(e) = publisher.close() {
            warn!("publisher close failed: {}", e);
        }
        info!("fusion loop stopped after {} cycles", self.cycle);
    }
}
