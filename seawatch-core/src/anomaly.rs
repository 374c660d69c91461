//! Integrity Anomaly Detection
//!
//! ## Overview
//!
//! After every successful track update the detector runs four independent
//! checks against the new observation. Each check produces at most one event,
//! and events always come out in the same order:
//!
//! | Order | Kind                  | Measured quantity                           |
//! |-------|-----------------------|---------------------------------------------|
//! | 1     | `POSITION_JUMP`       | Mahalanobis distance of the innovation (σ)  |
//! | 2     | `TIMING_GAP`          | seconds since the previous observation      |
//! | 3     | `SPEED_DISCONTINUITY` | implied speed ÷ vessel-class maximum        |
//! | 4     | `SOURCE_DISAGREEMENT` | metres to another source's recent report    |
//!
//! Each quantity is graded against a `SeverityTiers` triple (LOW, MEDIUM,
//! HIGH); values below the LOW tier produce nothing.
//!
//! ## Speed Plausibility
//!
//! The implied speed between two reports is computed on raw positions, after
//! removing both reports' 1-sigma position error from the distance, so that
//! two noisy radar plots a second apart do not look like a speedboat:
//!
//! ```text
//! implied = max(0, haversine(prev, new) - σ_prev - σ_new) / Δt
//! ```
//!
//! Pairs closer than `speed_min_interval_secs` in time are skipped.
//!
//! The detector is stateless apart from its configuration; everything it
//! needs comes from the track and the update's innovation.

use core::fmt;

use heapless::Vec as BoundedVec;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        anomaly::{
            max_speed, POSITION_JUMP_SIGMA, SOURCE_DISAGREEMENT_M,
            SOURCE_DISAGREEMENT_WINDOW_SECS, SPEED_MIN_INTERVAL_SECS, SPEED_RATIO_TIERS,
            TIMING_GAP_SECS,
        },
        geodesy::MS_PER_KNOT,
    },
    fusion::{Innovation, SourceNoise},
    geo::haversine_m,
    observation::{SensorObservation, SensorSource, VesselClass},
    time::{elapsed_secs, Timestamp},
    track::{Track, TrackId},
};

/// Maximum number of events one update can produce
pub const MAX_EVENTS_PER_UPDATE: usize = 4;

/// Events produced by one update, in check order
pub type AnomalyEvents = BoundedVec<AnomalyEvent, MAX_EVENTS_PER_UPDATE>;

/// Kind of integrity anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Innovation far outside its covariance
    PositionJump,
    /// Too long since the previous report
    TimingGap,
    /// Implied speed above the vessel class maximum
    SpeedDiscontinuity,
    /// Two sources place the vessel apart
    SourceDisagreement,
}

impl AnomalyKind {
    /// Wire name, as published in alerts
    pub const fn label(&self) -> &'static str {
        match self {
            AnomalyKind::PositionJump => "POSITION_JUMP",
            AnomalyKind::TimingGap => "TIMING_GAP",
            AnomalyKind::SpeedDiscontinuity => "SPEED_DISCONTINUITY",
            AnomalyKind::SourceDisagreement => "SOURCE_DISAGREEMENT",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Worth logging
    Low,
    /// Worth a look
    Medium,
    /// Act on it
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        })
    }
}

/// LOW / MEDIUM / HIGH thresholds for one measured quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityTiers {
    /// Reached for `Severity::Low`
    pub low: f64,
    /// Reached for `Severity::Medium`
    pub medium: f64,
    /// Reached for `Severity::High`
    pub high: f64,
}

impl SeverityTiers {
    /// Tiers in ascending order
    pub const fn new(low: f64, medium: f64, high: f64) -> Self {
        Self { low, medium, high }
    }

    const fn from_array(tiers: [f64; 3]) -> Self {
        Self::new(tiers[0], tiers[1], tiers[2])
    }

    /// Highest tier strictly exceeded by `value`, if any
    pub fn classify(&self, value: f64) -> Option<Severity> {
        if !value.is_finite() && value != f64::INFINITY {
            return None;
        }
        if value > self.high {
            Some(Severity::High)
        } else if value > self.medium {
            Some(Severity::Medium)
        } else if value > self.low {
            Some(Severity::Low)
        } else {
            None
        }
    }

    /// Threshold that a severity corresponds to
    pub fn threshold(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    /// Finite, positive and non-decreasing
    pub fn is_valid(&self) -> bool {
        [self.low, self.medium, self.high].iter().all(|v| v.is_finite() && *v > 0.0)
            && self.low <= self.medium
            && self.medium <= self.high
    }
}

/// Plausible maximum speed per vessel class (knots)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxSpeedTable {
    /// Class not reported
    pub unknown: f64,
    /// Cargo ships
    pub cargo: f64,
    /// Tankers
    pub tanker: f64,
    /// Passenger ships
    pub passenger: f64,
    /// Fishing vessels
    pub fishing: f64,
    /// Pleasure craft
    pub pleasure: f64,
    /// High-speed craft
    pub high_speed_craft: f64,
    /// Tugs and towing vessels
    pub tug: f64,
}

impl MaxSpeedTable {
    /// Maximum for `class`
    pub fn for_class(&self, class: VesselClass) -> f64 {
        match class {
            VesselClass::Unknown => self.unknown,
            VesselClass::Cargo => self.cargo,
            VesselClass::Tanker => self.tanker,
            VesselClass::Passenger => self.passenger,
            VesselClass::Fishing => self.fishing,
            VesselClass::Pleasure => self.pleasure,
            VesselClass::HighSpeedCraft => self.high_speed_craft,
            VesselClass::Tug => self.tug,
        }
    }

    fn values(&self) -> [f64; 8] {
        [
            self.unknown,
            self.cargo,
            self.tanker,
            self.passenger,
            self.fishing,
            self.pleasure,
            self.high_speed_craft,
            self.tug,
        ]
    }

    /// All limits finite and positive
    pub fn is_valid(&self) -> bool {
        self.values().iter().all(|v| v.is_finite() && *v > 0.0)
    }
}

impl Default for MaxSpeedTable {
    fn default() -> Self {
        Self {
            unknown: max_speed::UNKNOWN_KN,
            cargo: max_speed::CARGO_KN,
            tanker: max_speed::TANKER_KN,
            passenger: max_speed::PASSENGER_KN,
            fishing: max_speed::FISHING_KN,
            pleasure: max_speed::PLEASURE_KN,
            high_speed_craft: max_speed::HIGH_SPEED_CRAFT_KN,
            tug: max_speed::TUG_KN,
        }
    }
}

/// Detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Innovation Mahalanobis distance tiers (σ)
    pub position_jump_sigma: SeverityTiers,
    /// Reporting gap tiers (s)
    pub timing_gap_secs: SeverityTiers,
    /// Implied speed ÷ class maximum tiers
    pub speed_ratio: SeverityTiers,
    /// Shortest interval the speed check considers (s)
    pub speed_min_interval_secs: f64,
    /// Speed limits per vessel class (kn)
    pub max_speed_knots: MaxSpeedTable,
    /// Cross-source distance tiers (m)
    pub source_disagreement_m: SeverityTiers,
    /// How close in time two sources must be to be compared (s)
    pub source_window_secs: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            position_jump_sigma: SeverityTiers::from_array(POSITION_JUMP_SIGMA),
            timing_gap_secs: SeverityTiers::from_array(TIMING_GAP_SECS),
            speed_ratio: SeverityTiers::from_array(SPEED_RATIO_TIERS),
            speed_min_interval_secs: SPEED_MIN_INTERVAL_SECS,
            max_speed_knots: MaxSpeedTable::default(),
            source_disagreement_m: SeverityTiers::from_array(SOURCE_DISAGREEMENT_M),
            source_window_secs: SOURCE_DISAGREEMENT_WINDOW_SECS,
        }
    }
}

/// Measured values behind an event
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AnomalyDetails {
    /// Innovation distance in σ (position jump)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_distance: Option<f64>,
    /// Separation between sources (m)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    /// Time between the two reports (s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_s: Option<f64>,
    /// Implied speed (kn)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_speed_knots: Option<f64>,
    /// Source the new report disagreed with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_source: Option<SensorSource>,
    /// Threshold of the reported severity tier
    pub threshold: f64,
}

/// One integrity finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyEvent {
    /// Kind of finding
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// Severity tier reached
    pub severity: Severity,
    /// Track the event belongs to
    pub track_id: TrackId,
    /// Vessel identifier of the track, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_id: Option<String>,
    /// Triggering observations, older first
    pub observations: BoundedVec<SensorObservation, 2>,
    /// Measured values
    pub details: AnomalyDetails,
    /// Time of the observation that raised the event
    pub timestamp: Timestamp,
}

impl AnomalyEvent {
    fn new(
        kind: AnomalyKind,
        severity: Severity,
        track: &Track,
        observations: &[&SensorObservation],
        details: AnomalyDetails,
        timestamp: Timestamp,
    ) -> Self {
        let mut triggering = BoundedVec::new();
        for obs in observations.iter().take(2) {
            let _ = triggering.push((*obs).clone());
        }

        Self {
            kind,
            severity,
            track_id: track.id(),
            vessel_id: track.vessel_id().map(str::to_owned),
            observations: triggering,
            details,
            timestamp,
        }
    }
}

impl fmt::Display for AnomalyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.severity, self.kind, self.track_id)?;
        if let Some(vessel) = &self.vessel_id {
            write!(f, " ({vessel})")?;
        }
        Ok(())
    }
}

/// Stateless integrity checker
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    noise: SourceNoise,
}

impl AnomalyDetector {
    /// Detector with explicit thresholds and source noise
    pub fn new(config: AnomalyConfig, noise: SourceNoise) -> Self {
        Self { config, noise }
    }

    /// Active thresholds
    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Run all checks for one successful update
    ///
    /// `track` must already contain `observation`; `innovation` is the one
    /// that update produced.
    pub fn evaluate(
        &self,
        track: &Track,
        observation: &SensorObservation,
        innovation: &Innovation,
    ) -> AnomalyEvents {
        let mut events = AnomalyEvents::new();
        let checks = [
            self.position_jump(track, observation, innovation),
            self.timing_gap(track, observation),
            self.speed_discontinuity(track, observation),
            self.source_disagreement(track, observation),
        ];
        for event in checks.into_iter().flatten() {
            let _ = events.push(event);
        }
        events
    }

    fn position_jump(
        &self,
        track: &Track,
        observation: &SensorObservation,
        innovation: &Innovation,
    ) -> Option<AnomalyEvent> {
        let tiers = &self.config.position_jump_sigma;
        let sigma = innovation.normalized_distance();
        let severity = tiers.classify(sigma)?;

        Some(AnomalyEvent::new(
            AnomalyKind::PositionJump,
            severity,
            track,
            &[observation],
            AnomalyDetails {
                normalized_distance: Some(sigma),
                distance_m: Some(innovation.distance_m()),
                threshold: tiers.threshold(severity),
                ..Default::default()
            },
            observation.timestamp,
        ))
    }

    fn timing_gap(&self, track: &Track, observation: &SensorObservation) -> Option<AnomalyEvent> {
        let prior = track.previous_observation()?;
        let tiers = &self.config.timing_gap_secs;
        let gap = elapsed_secs(prior.timestamp, observation.timestamp);
        let severity = tiers.classify(gap)?;

        Some(AnomalyEvent::new(
            AnomalyKind::TimingGap,
            severity,
            track,
            &[prior, observation],
            AnomalyDetails {
                elapsed_s: Some(gap),
                threshold: tiers.threshold(severity),
                ..Default::default()
            },
            observation.timestamp,
        ))
    }

    fn speed_discontinuity(
        &self,
        track: &Track,
        observation: &SensorObservation,
    ) -> Option<AnomalyEvent> {
        let prior = track.previous_observation()?;
        let elapsed = elapsed_secs(prior.timestamp, observation.timestamp);
        if elapsed < self.config.speed_min_interval_secs {
            return None;
        }

        let raw = haversine_m(&prior.position(), &observation.position());
        let distance =
            (raw - self.noise.position_std(prior) - self.noise.position_std(observation)).max(0.0);
        let implied_knots = distance / elapsed / MS_PER_KNOT;

        let max_knots = self.config.max_speed_knots.for_class(track.vessel_class());
        if implied_knots <= max_knots {
            return None;
        }

        let tiers = &self.config.speed_ratio;
        let severity = tiers.classify(implied_knots / max_knots)?;

        Some(AnomalyEvent::new(
            AnomalyKind::SpeedDiscontinuity,
            severity,
            track,
            &[prior, observation],
            AnomalyDetails {
                distance_m: Some(raw),
                elapsed_s: Some(elapsed),
                implied_speed_knots: Some(implied_knots),
                threshold: tiers.threshold(severity) * max_knots,
                ..Default::default()
            },
            observation.timestamp,
        ))
    }

    fn source_disagreement(
        &self,
        track: &Track,
        observation: &SensorObservation,
    ) -> Option<AnomalyEvent> {
        let window = self.config.source_window_secs;

        let (other, distance) = SensorSource::ALL
            .into_iter()
            .filter(|source| *source != observation.source)
            .filter_map(|source| track.latest_from(source))
            .filter(|other| elapsed_secs(other.timestamp, observation.timestamp).abs() <= window)
            .map(|other| (other, haversine_m(&other.position(), &observation.position())))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;

        let tiers = &self.config.source_disagreement_m;
        let severity = tiers.classify(distance)?;

        Some(AnomalyEvent::new(
            AnomalyKind::SourceDisagreement,
            severity,
            track,
            &[other, observation],
            AnomalyDetails {
                distance_m: Some(distance),
                elapsed_s: Some(elapsed_secs(other.timestamp, observation.timestamp)),
                other_source: Some(other.source),
                threshold: tiers.threshold(severity),
                ..Default::default()
            },
            observation.timestamp,
        ))
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default(), SourceNoise::default())
    }
}
