//! Vessel Tracks
//!
//! ## Overview
//!
//! A `Track` is the persistent estimate for one vessel: a Kalman filter plus
//! the bookkeeping the rest of the engine needs (lifecycle status, the
//! previous report, a short per-source history).
//!
//! ## Lifecycle
//!
//! ```text
//!              consistent hits ≥ confirm_hits
//!  TENTATIVE ───────────────────────────────▶ CONFIRMED ◀──┐
//!      │                                          │        │ new report
//!      │ silent > stale_after                     │ silent > stale_after
//!      ▼                                          ▼        │
//!   RETIRED ◀──────────── silent > retire_after ─ STALE ───┘
//! ```
//!
//! Tracks are owned by the `TrackManager`; everything else reads `&Track`
//! or a serializable `TrackSnapshot`.

use core::fmt;

use serde::{Serialize, Serializer};

use crate::{
    buffer::CircularBuffer,
    constants::tracking::{CONSISTENT_ASSOCIATION_SIGMA, HISTORY_CAPACITY, SOURCE_COUNT},
    errors::FusionResult,
    fusion::{ConfidenceScore, ConstantVelocityModel, Innovation, SourceNoise, TrackFilter},
    geo::GeoPoint,
    observation::{SensorObservation, SensorSource, VesselClass},
    time::Timestamp,
};

/// Track identifier from the bounded id pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u32);

impl TrackId {
    /// Id from its raw number
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Raw numeric id
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{:04}", self.0)
    }
}

impl Serialize for TrackId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackStatus {
    /// Fewer consistent hits than needed to confirm
    Tentative,
    /// Established and reporting
    Confirmed,
    /// Silent past the stale threshold
    Stale,
    /// Silent past the retire threshold; removed
    Retired,
}

impl TrackStatus {
    /// Live tracks take part in association and are published
    pub const fn is_live(&self) -> bool {
        !matches!(self, TrackStatus::Retired)
    }
}

/// One lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    /// Track that changed
    pub track_id: TrackId,
    /// Status before
    pub from: TrackStatus,
    /// Status after
    pub to: TrackStatus,
}

/// Persistent estimate for one vessel
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: TrackId,
    vessel_id: Option<String>,
    vessel_name: Option<String>,
    vessel_class: VesselClass,
    filter: TrackFilter,
    status: TrackStatus,
    created_at: Timestamp,
    /// Updates whose innovation fell inside the consistency gate
    consistent_hits: u32,
    last_observation: SensorObservation,
    previous_observation: Option<SensorObservation>,
    history: [CircularBuffer<SensorObservation, HISTORY_CAPACITY>; SOURCE_COUNT],
}

impl Track {
    /// Start a TENTATIVE track from its first observation
    pub(crate) fn new(
        id: TrackId,
        observation: SensorObservation,
        noise: &SourceNoise,
        model: ConstantVelocityModel,
    ) -> Self {
        let filter = TrackFilter::initialize(&observation, noise, model);
        let mut history: [CircularBuffer<SensorObservation, HISTORY_CAPACITY>; SOURCE_COUNT] =
            Default::default();
        history[observation.source.index()].push(observation.clone());

        Self {
            id,
            vessel_id: observation.vessel_id.clone(),
            vessel_name: observation.vessel_name.clone(),
            vessel_class: observation.vessel_class.unwrap_or_default(),
            filter,
            status: TrackStatus::Tentative,
            created_at: observation.timestamp,
            consistent_hits: 0,
            last_observation: observation,
            previous_observation: None,
            history,
        }
    }

    /// Fold an associated observation into the track
    ///
    /// On error nothing about the track changes.
    pub(crate) fn absorb(
        &mut self,
        observation: &SensorObservation,
        noise: &SourceNoise,
        confirm_hits: u32,
    ) -> FusionResult<(Innovation, Option<StatusChange>)> {
        let innovation = self.filter.update(observation, noise)?;

        if innovation.normalized_distance() <= CONSISTENT_ASSOCIATION_SIGMA {
            self.consistent_hits = self.consistent_hits.saturating_add(1);
        }

        if let Some(name) = &observation.vessel_name {
            self.vessel_name = Some(name.clone());
        }
        if let Some(class) = observation.vessel_class {
            self.vessel_class = class;
        }

        self.previous_observation =
            Some(core::mem::replace(&mut self.last_observation, observation.clone()));
        self.history[observation.source.index()].push(observation.clone());

        let next = match self.status {
            TrackStatus::Tentative if self.consistent_hits >= confirm_hits => {
                Some(TrackStatus::Confirmed)
            }
            TrackStatus::Stale => Some(TrackStatus::Confirmed),
            _ => None,
        };

        Ok((innovation, next.map(|to| self.transition(to))))
    }

    /// Advance the lifecycle by silence; one transition per call
    pub(crate) fn sweep(
        &mut self,
        now: Timestamp,
        stale_after_ms: u64,
        retire_after_ms: u64,
    ) -> Option<StatusChange> {
        let silence = now.saturating_sub(self.last_update());

        let next = match self.status {
            TrackStatus::Tentative if silence > stale_after_ms => TrackStatus::Retired,
            TrackStatus::Confirmed if silence > stale_after_ms => TrackStatus::Stale,
            TrackStatus::Stale if silence > retire_after_ms => TrackStatus::Retired,
            _ => return None,
        };

        Some(self.transition(next))
    }

    fn transition(&mut self, to: TrackStatus) -> StatusChange {
        let change = StatusChange { track_id: self.id, from: self.status, to };
        self.status = to;
        change
    }

    /// Track id
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// Vessel identifier (MMSI), if any source carried one
    pub fn vessel_id(&self) -> Option<&str> {
        self.vessel_id.as_deref()
    }

    /// Vessel name, if reported
    pub fn vessel_name(&self) -> Option<&str> {
        self.vessel_name.as_deref()
    }

    /// Vessel class, `Unknown` until reported
    pub fn vessel_class(&self) -> VesselClass {
        self.vessel_class
    }

    /// Lifecycle status
    pub fn status(&self) -> TrackStatus {
        self.status
    }

    /// Per-track Kalman filter
    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }

    /// Time of the first observation
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Timestamp of the newest absorbed observation
    pub fn last_update(&self) -> Timestamp {
        self.filter.last_timestamp()
    }

    /// Updates within the consistency gate
    pub fn consistent_hits(&self) -> u32 {
        self.consistent_hits
    }

    /// Observations absorbed after the first
    pub fn update_count(&self) -> u32 {
        self.filter.update_count()
    }

    /// Newest absorbed observation
    pub fn last_observation(&self) -> &SensorObservation {
        &self.last_observation
    }

    /// Observation absorbed before the newest one
    pub fn previous_observation(&self) -> Option<&SensorObservation> {
        self.previous_observation.as_ref()
    }

    /// Rolling history for one source, oldest first
    pub fn history(&self, source: SensorSource) -> &CircularBuffer<SensorObservation, HISTORY_CAPACITY> {
        &self.history[source.index()]
    }

    /// Latest observation from one source
    pub fn latest_from(&self, source: SensorSource) -> Option<&SensorObservation> {
        self.history[source.index()].last()
    }

    /// Sources that contributed to this track
    pub fn sources(&self) -> Vec<SensorSource> {
        SensorSource::ALL
            .into_iter()
            .filter(|s| !self.history[s.index()].is_empty())
            .collect()
    }

    /// Current fused position
    pub fn position(&self) -> GeoPoint {
        self.filter.position()
    }

    /// Estimate quality, decaying with silence
    pub fn confidence(&self, now: Timestamp, half_life_ms: u64) -> ConfidenceScore {
        let base = ConfidenceScore::for_track(
            self.filter.position_std(),
            self.filter.last_innovation().map(Innovation::mahalanobis_squared),
            self.filter.update_count(),
        );
        base.decay(now.saturating_sub(self.last_update()), half_life_ms)
    }

    /// Serializable view of the track
    pub fn snapshot(&self, now: Timestamp, half_life_ms: u64) -> TrackSnapshot {
        let position = self.position();
        let (speed_knots, course_deg) = self.filter.speed_course();

        TrackSnapshot {
            track_id: self.id,
            vessel_id: self.vessel_id.clone(),
            vessel_name: self.vessel_name.clone(),
            vessel_class: self.vessel_class,
            status: self.status,
            latitude: position.latitude,
            longitude: position.longitude,
            speed_knots,
            course_deg,
            position_std_m: self.filter.position_std(),
            confidence: self.confidence(now, half_life_ms),
            sources: self.sources(),
            update_count: self.filter.update_count(),
            created_at: self.created_at,
            last_update: self.last_update(),
        }
    }
}

/// Published view of one track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    /// Track id, displayed `T0042`
    pub track_id: TrackId,
    /// Vessel identifier, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_id: Option<String>,
    /// Vessel name, if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
    /// Reported vessel class
    pub vessel_class: VesselClass,
    /// Lifecycle status
    pub status: TrackStatus,
    /// Fused latitude (degrees)
    pub latitude: f64,
    /// Fused longitude (degrees)
    pub longitude: f64,
    /// Speed over ground (kn)
    pub speed_knots: f64,
    /// Course over ground (degrees)
    pub course_deg: f64,
    /// 1-sigma position uncertainty (m)
    pub position_std_m: f64,
    /// Confidence, decayed by silence
    pub confidence: ConfidenceScore,
    /// Sources heard from, in history order
    pub sources: Vec<SensorSource>,
    /// Observations absorbed after the first
    pub update_count: u32,
    /// Time of the first observation
    pub created_at: Timestamp,
    /// Time of the newest absorbed observation
    pub last_update: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ais(ts: Timestamp, lat: f64) -> SensorObservation {
        SensorObservation::new(SensorSource::Ais, ts, lat, 20.0).with_vessel_id("V1")
    }

    fn track() -> Track {
        Track::new(
            TrackId::new(7),
            ais(0, 10.0),
            &SourceNoise::default(),
            ConstantVelocityModel::default(),
        )
    }

    #[test]
    fn id_display() {
        assert_eq!(TrackId::new(42).to_string(), "T0042");
        assert_eq!(serde_json::to_string(&TrackId::new(7)).unwrap(), "\"T0007\"");
    }

    #[test]
    fn confirms_after_consistent_hits() {
        let noise = SourceNoise::default();
        let mut t = track();
        assert_eq!(t.status(), TrackStatus::Tentative);

        let (_, change) = t.absorb(&ais(10_000, 10.00001), &noise, 2).unwrap();
        assert!(change.is_none());
        let (_, change) = t.absorb(&ais(20_000, 10.00002), &noise, 2).unwrap();
        assert_eq!(
            change,
            Some(StatusChange {
                track_id: TrackId::new(7),
                from: TrackStatus::Tentative,
                to: TrackStatus::Confirmed
            })
        );
        assert_eq!(t.previous_observation().map(|o| o.timestamp), Some(10_000));
        assert_eq!(t.history(SensorSource::Ais).len(), 3);
    }

    #[test]
    fn lifecycle_by_silence() {
        let noise = SourceNoise::default();
        let mut t = track();
        for i in 1..=3 {
            t.absorb(&ais(i * 10_000, 10.0), &noise, 3).unwrap();
        }
        assert_eq!(t.status(), TrackStatus::Confirmed);

        assert!(t.sweep(100_000, 180_000, 900_000).is_none());
        let stale = t.sweep(300_000, 180_000, 900_000).unwrap();
        assert_eq!(stale.to, TrackStatus::Stale);

        // A new report revives the track
        let (_, revived) = t.absorb(&ais(310_000, 10.0), &noise, 3).unwrap();
        assert_eq!(revived.map(|c| c.to), Some(TrackStatus::Confirmed));

        assert_eq!(t.sweep(600_000, 180_000, 900_000).map(|c| c.to), Some(TrackStatus::Stale));
        assert_eq!(t.sweep(1_300_000, 180_000, 900_000).map(|c| c.to), Some(TrackStatus::Retired));
        assert!(!t.status().is_live());
    }

    #[test]
    fn silent_tentative_track_retires() {
        let mut t = track();
        let change = t.sweep(200_000, 180_000, 900_000).unwrap();
        assert_eq!(change.from, TrackStatus::Tentative);
        assert_eq!(change.to, TrackStatus::Retired);
    }

    #[test]
    fn snapshot_reports_sources() {
        let noise = SourceNoise::default();
        let mut t = track();
        let radar = SensorObservation::new(SensorSource::Radar, 5_000, 10.0, 20.0);
        t.absorb(&radar, &noise, 3).unwrap();

        let snap = t.snapshot(5_000, 180_000);
        assert_eq!(snap.sources, vec![SensorSource::Ais, SensorSource::Radar]);
        assert_eq!(snap.vessel_id.as_deref(), Some("V1"));
        assert_eq!(snap.update_count, 1);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["track_id"], "T0007");
        assert_eq!(json["status"], "TENTATIVE");
    }
}
