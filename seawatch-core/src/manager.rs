//! Track Manager
//!
//! ## Overview
//!
//! The manager owns the live track set and decides, for every observation,
//! which track it belongs to:
//!
//! ```text
//! observation ──validate──┬── vessel id known ──────────▶ update that track
//!                         ├── vessel id unknown ────────▶ new TENTATIVE track
//!                         └── no vessel id ──gate──┬───▶ update nearest track
//!                                                  └───▶ new TENTATIVE track
//! ```
//!
//! ## Gating
//!
//! Only tracks whose last update is strictly older than the observation can
//! accept it. For each, the position is predicted to the observation time;
//! tracks within `gate_radius_m` (haversine) are candidates, and the one with
//! the smallest distance ÷ predicted 1-sigma wins. Remaining ties go to the
//! lowest `TrackId`, so association is deterministic.
//!
//! ## Identifier Pool
//!
//! Ids come from `1..=max_track_ids`, handed out round-robin. A retired id
//! cools down for `id_reuse_cooldown_secs` before it can be handed out again,
//! so consumers never see one id jump between two vessels.

use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};
use serde::Serialize;

use crate::{
    config::FusionConfig,
    errors::{FusionError, FusionResult},
    fusion::{ConstantVelocityModel, Innovation},
    geo::{haversine_m, GeoPoint},
    observation::SensorObservation,
    time::Timestamp,
    track::{StatusChange, Track, TrackId, TrackSnapshot, TrackStatus},
};

/// How an observation found its track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Association {
    /// Started a new track
    Created,
    /// Matched by vessel identifier
    VesselId,
    /// Matched by gating
    Gated {
        /// Haversine distance to the predicted position (m)
        distance_m: f64,
        /// Distance ÷ predicted 1-sigma position uncertainty
        normalized_distance: f64,
        /// Tracks inside the gate
        candidates: usize,
    },
}

/// Outcome of one successful ingest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdateResult {
    /// How the observation found its track
    pub association: Association,
    /// `None` for a newly created track
    pub innovation: Option<Innovation>,
    /// Lifecycle change caused by the update, if any
    pub status_change: Option<StatusChange>,
    /// Status before the update; `None` for a newly created track
    pub previous_status: Option<TrackStatus>,
}

/// Lifecycle transition found by a sweep, with the track's last position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// The transition
    pub change: StatusChange,
    /// Last fused position of the track
    pub position: GeoPoint,
}

/// Round-robin id allocator with reuse cooldown
#[derive(Debug, Clone)]
struct TrackIdPool {
    capacity: u32,
    next: u32,
    cooldown_ms: u64,
    /// Retired ids and the time they become available again
    cooling: HashMap<u32, Timestamp>,
}

impl TrackIdPool {
    fn new(capacity: u32, cooldown_ms: u64) -> Self {
        Self {
            capacity,
            next: 1,
            cooldown_ms,
            cooling: HashMap::new(),
        }
    }

    fn allocate(&mut self, now: Timestamp, live: &BTreeMap<TrackId, Track>) -> FusionResult<TrackId> {
        for _ in 0..self.capacity {
            let candidate = self.next;
            self.next = candidate % self.capacity + 1;

            if live.contains_key(&TrackId::new(candidate)) {
                continue;
            }
            match self.cooling.get(&candidate) {
                Some(available_at) if now < *available_at => continue,
                Some(_) => {
                    self.cooling.remove(&candidate);
                }
                None => {}
            }
            return Ok(TrackId::new(candidate));
        }

        Err(FusionError::TrackLimitReached { capacity: self.capacity })
    }

    fn release(&mut self, id: TrackId, now: Timestamp) {
        self.cooling.insert(id.value(), now.saturating_add(self.cooldown_ms));
    }
}

/// Owner of the live track set
#[derive(Debug, Clone)]
pub struct TrackManager {
    config: FusionConfig,
    model: ConstantVelocityModel,
    tracks: BTreeMap<TrackId, Track>,
    by_vessel: HashMap<String, TrackId>,
    ids: TrackIdPool,
}

impl TrackManager {
    /// Empty manager
    pub fn new(config: FusionConfig) -> Self {
        let ids = TrackIdPool::new(config.max_track_ids, config.id_reuse_cooldown_ms());
        Self {
            model: config.motion_model(),
            config,
            tracks: BTreeMap::new(),
            by_vessel: HashMap::new(),
            ids,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Associate one observation and update (or create) its track
    ///
    /// Invalid observations are rejected before any track is touched, and a
    /// failed update leaves its track unchanged.
    pub fn ingest(
        &mut self,
        observation: SensorObservation,
    ) -> FusionResult<(TrackId, TrackUpdateResult)> {
        observation.validate()?;

        if let Some(vessel_id) = &observation.vessel_id {
            return match self.by_vessel.get(vessel_id).copied() {
                Some(id) => self.update_track(id, &observation, Association::VesselId),
                None => self.create_track(observation),
            };
        }

        match self.gate(&observation) {
            Some((id, association)) => self.update_track(id, &observation, association),
            None => self.create_track(observation),
        }
    }

    /// Pick the best gated track for an anonymous observation
    fn gate(&self, observation: &SensorObservation) -> Option<(TrackId, Association)> {
        let position = observation.position();
        let mut best: Option<(TrackId, f64, f64)> = None;
        let mut candidates = 0usize;

        for (id, track) in &self.tracks {
            if !track.status().is_live() || track.last_update() >= observation.timestamp {
                continue;
            }

            let (predicted, sigma) = track.filter().predict_position(observation.timestamp);
            let distance = haversine_m(&predicted, &position);
            if distance > self.config.gate_radius_m {
                continue;
            }

            candidates += 1;
            let normalized = distance / sigma.max(f64::EPSILON);
            // Strict comparison keeps the lowest id on ties
            if best.map_or(true, |(_, _, n)| normalized < n) {
                best = Some((*id, distance, normalized));
            }
        }

        if candidates > 1 {
            debug!(
                "{} for {} observation at {}",
                FusionError::AssociationAmbiguous { candidates },
                observation.source,
                observation.timestamp
            );
        }

        best.map(|(id, distance_m, normalized_distance)| {
            (id, Association::Gated { distance_m, normalized_distance, candidates })
        })
    }

    fn update_track(
        &mut self,
        id: TrackId,
        observation: &SensorObservation,
        association: Association,
    ) -> FusionResult<(TrackId, TrackUpdateResult)> {
        let Some(track) = self.tracks.get_mut(&id) else {
            return self.create_track(observation.clone());
        };

        let previous_status = track.status();
        let (innovation, status_change) =
            track.absorb(observation, &self.config.noise, self.config.confirm_hits)?;

        if let Some(change) = status_change {
            debug!("{} {:?} -> {:?}", id, change.from, change.to);
        }
        trace!("{} updated by {} ({:?})", id, observation.source, association);

        Ok((
            id,
            TrackUpdateResult {
                association,
                innovation: Some(innovation),
                status_change,
                previous_status: Some(previous_status),
            },
        ))
    }

    fn create_track(
        &mut self,
        observation: SensorObservation,
    ) -> FusionResult<(TrackId, TrackUpdateResult)> {
        let id = self.ids.allocate(observation.timestamp, &self.tracks)?;

        if let Some(vessel_id) = &observation.vessel_id {
            self.by_vessel.insert(vessel_id.clone(), id);
        }
        debug!(
            "{} created from {} ({})",
            id,
            observation.source,
            observation.vessel_id.as_deref().unwrap_or("no vessel id")
        );

        let track = Track::new(id, observation, &self.config.noise, self.model);
        self.tracks.insert(id, track);

        Ok((
            id,
            TrackUpdateResult {
                association: Association::Created,
                innovation: None,
                status_change: None,
                previous_status: None,
            },
        ))
    }

    /// Advance every track's lifecycle to `now` and drop retired tracks
    ///
    /// Transitions are returned in track id order.
    pub fn sweep(&mut self, now: Timestamp) -> Vec<Transition> {
        let stale_after = self.config.stale_after_ms();
        let retire_after = self.config.retire_after_ms();
        let mut transitions = Vec::new();

        for track in self.tracks.values_mut() {
            while let Some(change) = track.sweep(now, stale_after, retire_after) {
                debug!("{} {:?} -> {:?}", change.track_id, change.from, change.to);
                transitions.push(Transition { change, position: track.position() });
            }
        }

        let retired: Vec<TrackId> = self
            .tracks
            .iter()
            .filter(|(_, t)| t.status() == TrackStatus::Retired)
            .map(|(id, _)| *id)
            .collect();

        for id in retired {
            if let Some(track) = self.tracks.remove(&id) {
                if let Some(vessel_id) = track.vessel_id() {
                    if self.by_vessel.get(vessel_id) == Some(&id) {
                        self.by_vessel.remove(vessel_id);
                    }
                }
            }
            self.ids.release(id, now);
        }

        transitions
    }

    /// Live track by id
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Live track carrying this vessel identifier
    pub fn track_for_vessel(&self, vessel_id: &str) -> Option<&Track> {
        self.by_vessel.get(vessel_id).and_then(|id| self.tracks.get(id))
    }

    /// Live tracks in id order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Snapshots of all live tracks, in id order
    pub fn snapshots(&self, now: Timestamp) -> Vec<TrackSnapshot> {
        let half_life = self.config.stale_after_ms();
        self.tracks.values().map(|t| t.snapshot(now, half_life)).collect()
    }

    /// Number of live tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
