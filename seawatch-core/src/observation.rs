//! Sensor Observations
//!
//! ## Overview
//!
//! A `SensorObservation` is one timestamped position report from one sensor.
//! It is created by ingestion, consumed once by the track manager, and never
//! mutated afterwards. Three source families are fused:
//!
//! | Source | Identity            | Kinematics        | Typical 1σ |
//! |--------|---------------------|-------------------|------------|
//! | AIS    | MMSI, always        | SOG / COG usually | 10 m       |
//! | RADAR  | none (plot) or ARPA | rarely            | 50 m       |
//! | GNSS   | own ship / beacons  | SOG / COG         | 5 m        |
//!
//! ## Validation
//!
//! `validate()` rejects physically impossible values before any track is
//! touched. AIS "not available" sentinels are not errors: they are valid
//! protocol values meaning "no kinematics", and `course_over_ground()` hides
//! them from the filter.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        geodesy::{
            AIS_COURSE_NOT_AVAILABLE_DEG, AIS_HEADING_NOT_AVAILABLE_DEG,
            AIS_SPEED_NOT_AVAILABLE_KN, LATITUDE_MAX_DEG, LATITUDE_MIN_DEG, LONGITUDE_MAX_DEG,
            LONGITUDE_MIN_DEG,
        },
        time::MAX_TIMESTAMP_MS,
    },
    errors::{FusionError, FusionResult},
    geo::GeoPoint,
    time::Timestamp,
};

/// Sensor family that produced an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorSource {
    /// Automatic Identification System transponder report
    Ais,
    /// Radar plot or ARPA target
    Radar,
    /// Satellite navigation fix
    Gnss,
}

impl SensorSource {
    /// All sources, in history slot order
    pub const ALL: [SensorSource; 3] = [SensorSource::Ais, SensorSource::Radar, SensorSource::Gnss];

    /// Slot index used by per-source storage
    pub const fn index(&self) -> usize {
        match self {
            SensorSource::Ais => 0,
            SensorSource::Radar => 1,
            SensorSource::Gnss => 2,
        }
    }

    /// Get human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            SensorSource::Ais => "AIS",
            SensorSource::Radar => "RADAR",
            SensorSource::Gnss => "GNSS",
        }
    }
}

impl core::fmt::Display for SensorSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Broad vessel category, used for speed plausibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselClass {
    /// Class not reported
    #[default]
    Unknown,
    /// Cargo ship
    Cargo,
    /// Tanker
    Tanker,
    /// Passenger ship or ferry
    Passenger,
    /// Fishing vessel
    Fishing,
    /// Pleasure craft or sailing vessel
    Pleasure,
    /// High-speed craft
    HighSpeedCraft,
    /// Tug or towing vessel
    Tug,
}

impl VesselClass {
    /// Map an AIS "type of ship and cargo" code (message 5/24) to a class
    pub fn from_ais_ship_type(code: u8) -> Self {
        match code {
            30 => VesselClass::Fishing,
            31 | 32 | 52 => VesselClass::Tug,
            36 | 37 => VesselClass::Pleasure,
            40..=49 => VesselClass::HighSpeedCraft,
            60..=69 => VesselClass::Passenger,
            70..=79 => VesselClass::Cargo,
            80..=89 => VesselClass::Tanker,
            _ => VesselClass::Unknown,
        }
    }
}

/// One timestamped position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorObservation {
    /// Vessel identifier (MMSI); absent for raw radar plots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_id: Option<String>,
    /// UTC milliseconds since the Unix epoch
    pub timestamp: Timestamp,
    /// WGS-84 latitude in degrees
    pub latitude: f64,
    /// WGS-84 longitude in degrees
    pub longitude: f64,
    /// Speed over ground in knots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_knots: Option<f64>,
    /// Course over ground in degrees clockwise from north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
    /// Producing sensor family
    pub source: SensorSource,
    /// 1-sigma horizontal position error in metres, if the sensor knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_m: Option<f64>,
    /// Vessel name from AIS static data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
    /// Vessel class from AIS static data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_class: Option<VesselClass>,
}

impl SensorObservation {
    /// Create a bare position report
    pub fn new(source: SensorSource, timestamp: Timestamp, latitude: f64, longitude: f64) -> Self {
        Self {
            vessel_id: None,
            timestamp,
            latitude,
            longitude,
            speed_knots: None,
            heading_deg: None,
            source,
            uncertainty_m: None,
            vessel_name: None,
            vessel_class: None,
        }
    }

    /// Attach a vessel identifier
    pub fn with_vessel_id(mut self, vessel_id: impl Into<String>) -> Self {
        self.vessel_id = Some(vessel_id.into());
        self
    }

    /// Attach speed over ground (knots) and course over ground (degrees)
    pub fn with_kinematics(mut self, speed_knots: f64, heading_deg: f64) -> Self {
        self.speed_knots = Some(speed_knots);
        self.heading_deg = Some(heading_deg);
        self
    }

    /// Attach a 1-sigma position error estimate (metres)
    pub fn with_uncertainty(mut self, uncertainty_m: f64) -> Self {
        self.uncertainty_m = Some(uncertainty_m);
        self
    }

    /// Attach AIS static data
    pub fn with_vessel_info(mut self, name: impl Into<String>, class: VesselClass) -> Self {
        self.vessel_name = Some(name.into());
        self.vessel_class = Some(class);
        self
    }

    /// Reported position
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Usable (speed knots, course degrees), with AIS sentinels filtered out
    pub fn course_over_ground(&self) -> Option<(f64, f64)> {
        let speed = self.speed_knots.filter(|s| *s < AIS_SPEED_NOT_AVAILABLE_KN)?;
        let course = self.heading_deg.filter(|c| *c < AIS_COURSE_NOT_AVAILABLE_DEG)?;
        Some((speed, course))
    }

    /// Check ranges; rejects before any track state is touched
    pub fn validate(&self) -> FusionResult<()> {
        if self.timestamp > MAX_TIMESTAMP_MS {
            return Err(FusionError::InvalidObservation {
                field: "timestamp",
                value: self.timestamp as f64,
            });
        }

        if !self.latitude.is_finite()
            || !(LATITUDE_MIN_DEG..=LATITUDE_MAX_DEG).contains(&self.latitude)
        {
            return Err(FusionError::InvalidObservation { field: "latitude", value: self.latitude });
        }

        if !self.longitude.is_finite()
            || !(LONGITUDE_MIN_DEG..=LONGITUDE_MAX_DEG).contains(&self.longitude)
        {
            return Err(FusionError::InvalidObservation {
                field: "longitude",
                value: self.longitude,
            });
        }

        if let Some(speed) = self.speed_knots {
            if !speed.is_finite() || speed < 0.0 {
                return Err(FusionError::InvalidObservation { field: "speed_knots", value: speed });
            }
        }

        if let Some(heading) = self.heading_deg {
            let sentinel = heading == AIS_COURSE_NOT_AVAILABLE_DEG
                || heading == AIS_HEADING_NOT_AVAILABLE_DEG;
            if !heading.is_finite() || (!sentinel && !(0.0..360.0).contains(&heading)) {
                return Err(FusionError::InvalidObservation { field: "heading_deg", value: heading });
            }
        }

        if let Some(uncertainty) = self.uncertainty_m {
            if !uncertainty.is_finite() || uncertainty <= 0.0 {
                return Err(FusionError::InvalidObservation {
                    field: "uncertainty_m",
                    value: uncertainty,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ais(lat: f64, lon: f64) -> SensorObservation {
        SensorObservation::new(SensorSource::Ais, 1_000, lat, lon).with_vessel_id("V1")
    }

    #[test]
    fn valid_observation_passes() {
        let obs = ais(48.3, -123.5).with_kinematics(12.0, 90.0).with_uncertainty(8.0);
        assert!(obs.validate().is_ok());
        assert_eq!(obs.course_over_ground(), Some((12.0, 90.0)));
    }

    #[test]
    fn out_of_range_coordinates_rejected() {
        assert_eq!(
            ais(90.5, 0.0).validate(),
            Err(FusionError::InvalidObservation { field: "latitude", value: 90.5 })
        );
        assert!(matches!(
            ais(0.0, -181.0).validate(),
            Err(FusionError::InvalidObservation { field: "longitude", .. })
        ));
        assert!(ais(f64::NAN, 0.0).validate().is_err());
        assert!(ais(0.0, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn timestamp_beyond_signed_range_rejected() {
        let mut obs = ais(10.0, 20.0);
        obs.timestamp = 1 << 63;
        assert!(matches!(
            obs.validate(),
            Err(FusionError::InvalidObservation { field: "timestamp", .. })
        ));

        obs.timestamp = i64::MAX as u64;
        assert!(obs.validate().is_ok());
    }

    #[test]
    fn bad_kinematics_rejected() {
        assert!(ais(0.0, 0.0).with_kinematics(-1.0, 10.0).validate().is_err());
        assert!(ais(0.0, 0.0).with_kinematics(5.0, 400.0).validate().is_err());
        assert!(ais(0.0, 0.0).with_uncertainty(0.0).validate().is_err());
    }

    #[test]
    fn ais_sentinels_mean_no_kinematics() {
        let obs = ais(10.0, 20.0).with_kinematics(102.3, 360.0);
        assert!(obs.validate().is_ok());
        assert_eq!(obs.course_over_ground(), None);

        let obs = ais(10.0, 20.0).with_kinematics(8.0, 511.0);
        assert!(obs.validate().is_ok());
        assert_eq!(obs.course_over_ground(), None);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "vessel_id": "257123450",
            "timestamp": 1700000000000,
            "latitude": 59.91,
            "longitude": 10.74,
            "speed_knots": 11.5,
            "heading_deg": 181.0,
            "source": "AIS",
            "vessel_class": "cargo"
        }"#;
        let obs: SensorObservation = serde_json::from_str(json).unwrap();
        assert_eq!(obs.source, SensorSource::Ais);
        assert_eq!(obs.vessel_id.as_deref(), Some("257123450"));
        assert_eq!(obs.vessel_class, Some(VesselClass::Cargo));
        assert!(obs.uncertainty_m.is_none());
    }

    #[test]
    fn ship_type_mapping() {
        assert_eq!(VesselClass::from_ais_ship_type(70), VesselClass::Cargo);
        assert_eq!(VesselClass::from_ais_ship_type(84), VesselClass::Tanker);
        assert_eq!(VesselClass::from_ais_ship_type(42), VesselClass::HighSpeedCraft);
        assert_eq!(VesselClass::from_ais_ship_type(0), VesselClass::Unknown);
    }
}
