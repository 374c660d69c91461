//! Motion and Measurement Models
//!
//! ## Overview
//!
//! The track filter needs three models:
//!
//! 1. **State Transition**: how a vessel moves between reports
//! 2. **Measurement Model**: which states a report observes
//! 3. **Noise Characteristics**: how much each sensor family is trusted
//!
//! ## Constant-Velocity Motion
//!
//! State `x = [east, north, v_east, v_north]`. Between reports the vessel is
//! assumed to keep its velocity, with unknown accelerations absorbed as white
//! noise of standard deviation `σa`:
//!
//! ```text
//!        ┌ 1 0 dt 0 ┐              per axis:
//! F(dt) = │ 0 1 0 dt │     Q(dt) = σa² · ┌ dt⁴/4  dt³/2 ┐
//!        │ 0 0 1  0 │                   └ dt³/2  dt²   ┘
//!        └ 0 0 0  1 ┘
//! ```
//!
//! Longer gaps therefore produce larger uncertainty.
//!
//! ## Measurements
//!
//! A report always observes position. When it also carries usable speed and
//! course, it observes velocity too and the update becomes four dimensional.
//!
//! ## Source Noise
//!
//! | Source | Position 1σ | Velocity 1σ |
//! |--------|-------------|-------------|
//! | GNSS   | 5 m         | 0.2 m/s     |
//! | AIS    | 10 m        | 0.5 m/s     |
//! | RADAR  | 50 m        | 2.0 m/s     |
//!
//! A report's own `uncertainty_m` overrides the position term.

use serde::{Deserialize, Serialize};

use crate::{
    constants::fusion::{
        AIS_POSITION_STD_M, AIS_VELOCITY_STD_MS, DEFAULT_ACCELERATION_STD_MS2,
        GNSS_POSITION_STD_M, GNSS_VELOCITY_STD_MS, RADAR_POSITION_STD_M, RADAR_VELOCITY_STD_MS,
    },
    fusion::matrix::{identity, Matrix, SquareMatrix, Vector},
    geo::{velocity_from_course, LocalFrame},
    observation::{SensorObservation, SensorSource},
};

/// Constant-velocity motion model with white acceleration noise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantVelocityModel {
    /// Acceleration standard deviation σa (m/s²)
    pub acceleration_std: f64,
}

impl ConstantVelocityModel {
    /// Model with acceleration std σa (m/s²)
    pub fn new(acceleration_std: f64) -> Self {
        Self { acceleration_std }
    }

    /// State transition matrix F(dt)
    pub fn transition(&self, dt: f64) -> SquareMatrix<4> {
        let mut f = identity::<4>();
        f[0][2] = dt;
        f[1][3] = dt;
        f
    }

    /// Process noise Q(dt), block-diagonal per axis
    pub fn process_noise(&self, dt: f64) -> SquareMatrix<4> {
        let q = self.acceleration_std * self.acceleration_std;
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let pp = q * dt4 / 4.0;
        let pv = q * dt3 / 2.0;
        let vv = q * dt2;

        [
            [pp, 0.0, pv, 0.0],
            [0.0, pp, 0.0, pv],
            [pv, 0.0, vv, 0.0],
            [0.0, pv, 0.0, vv],
        ]
    }
}

impl Default for ConstantVelocityModel {
    fn default() -> Self {
        Self::new(DEFAULT_ACCELERATION_STD_MS2)
    }
}

/// Observation noise of one sensor family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// 1-sigma horizontal position error (m)
    pub position_std_m: f64,
    /// 1-sigma velocity error per axis (m/s)
    pub velocity_std_ms: f64,
}

impl NoiseProfile {
    /// AIS transponder defaults
    pub const AIS: Self = Self {
        position_std_m: AIS_POSITION_STD_M,
        velocity_std_ms: AIS_VELOCITY_STD_MS,
    };

    /// Shore or ship radar defaults
    pub const RADAR: Self = Self {
        position_std_m: RADAR_POSITION_STD_M,
        velocity_std_ms: RADAR_VELOCITY_STD_MS,
    };

    /// Own-ship GNSS defaults
    pub const GNSS: Self = Self {
        position_std_m: GNSS_POSITION_STD_M,
        velocity_std_ms: GNSS_VELOCITY_STD_MS,
    };

    /// Check that both terms are usable variances
    pub fn is_valid(&self) -> bool {
        self.position_std_m.is_finite()
            && self.position_std_m >= 0.0
            && self.velocity_std_ms.is_finite()
            && self.velocity_std_ms >= 0.0
    }
}

/// Noise profile per sensor source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceNoise {
    /// AIS noise
    pub ais: NoiseProfile,
    /// Radar noise
    pub radar: NoiseProfile,
    /// GNSS noise
    pub gnss: NoiseProfile,
}

impl SourceNoise {
    /// Profile for a source
    pub fn profile(&self, source: SensorSource) -> &NoiseProfile {
        match source {
            SensorSource::Ais => &self.ais,
            SensorSource::Radar => &self.radar,
            SensorSource::Gnss => &self.gnss,
        }
    }

    /// Same profile for every source
    pub fn uniform(profile: NoiseProfile) -> Self {
        Self { ais: profile, radar: profile, gnss: profile }
    }

    /// Effective 1-sigma position error of one observation (m)
    pub fn position_std(&self, observation: &SensorObservation) -> f64 {
        observation
            .uncertainty_m
            .unwrap_or(self.profile(observation.source).position_std_m)
    }
}

impl Default for SourceNoise {
    fn default() -> Self {
        Self {
            ais: NoiseProfile::AIS,
            radar: NoiseProfile::RADAR,
            gnss: NoiseProfile::GNSS,
        }
    }
}

/// Measurement matrix selecting position
pub const POSITION_H: Matrix<2, 4> = [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];

/// A report projected into a track's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    /// Position only
    Position {
        z: Vector<2>,
        r: SquareMatrix<2>,
    },
    /// Position plus velocity from speed and course
    PositionVelocity {
        z: Vector<4>,
        r: SquareMatrix<4>,
    },
}

impl Measurement {
    /// Build a measurement from an observation
    pub fn from_observation(
        observation: &SensorObservation,
        frame: &LocalFrame,
        noise: &SourceNoise,
    ) -> Self {
        let [east, north] = frame.to_local(&observation.position());
        let pos_var = {
            let std = noise.position_std(observation);
            std * std
        };

        match observation.course_over_ground() {
            Some((speed_knots, course_deg)) => {
                let [v_east, v_north] = velocity_from_course(speed_knots, course_deg);
                let vel_std = noise.profile(observation.source).velocity_std_ms;
                let vel_var = vel_std * vel_std;
                Measurement::PositionVelocity {
                    z: [east, north, v_east, v_north],
                    r: [
                        [pos_var, 0.0, 0.0, 0.0],
                        [0.0, pos_var, 0.0, 0.0],
                        [0.0, 0.0, vel_var, 0.0],
                        [0.0, 0.0, 0.0, vel_var],
                    ],
                }
            }
            None => Measurement::Position {
                z: [east, north],
                r: [[pos_var, 0.0], [0.0, pos_var]],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    #[test]
    fn process_noise_grows_with_gap() {
        let model = ConstantVelocityModel::new(0.5);
        let short = model.process_noise(1.0);
        let long = model.process_noise(10.0);

        assert!((short[0][0] - 0.25 * 0.25).abs() < 1e-12); // σa² · 1/4
        assert!((short[2][2] - 0.25).abs() < 1e-12);
        assert!(long[0][0] > short[0][0] * 1000.0);
        assert_eq!(long[0][2], long[2][0]);
        assert_eq!(long[0][1], 0.0);
    }

    #[test]
    fn transition_moves_position_by_velocity() {
        let f = ConstantVelocityModel::default().transition(3.0);
        assert_eq!(f[0][2], 3.0);
        assert_eq!(f[1][3], 3.0);
        assert_eq!(f[2][2], 1.0);
        assert_eq!(f[2][0], 0.0);
    }

    #[test]
    fn measurement_dimension_follows_kinematics() {
        let frame = LocalFrame::new(GeoPoint::new(10.0, 20.0));
        let noise = SourceNoise::default();

        let plot = SensorObservation::new(SensorSource::Radar, 0, 10.0, 20.0);
        match Measurement::from_observation(&plot, &frame, &noise) {
            Measurement::Position { z, r } => {
                assert!(z[0].abs() < 1e-9 && z[1].abs() < 1e-9);
                assert_eq!(r[0][0], 2500.0);
            }
            other => panic!("expected position-only measurement, got {:?}", other),
        }

        let report = SensorObservation::new(SensorSource::Ais, 0, 10.0, 20.0)
            .with_kinematics(10.0, 0.0)
            .with_uncertainty(4.0);
        match Measurement::from_observation(&report, &frame, &noise) {
            Measurement::PositionVelocity { z, r } => {
                assert_eq!(r[1][1], 16.0);
                assert!(z[2].abs() < 1e-9);
                assert!((z[3] - 10.0 * 1852.0 / 3600.0).abs() < 1e-9);
            }
            other => panic!("expected position and velocity, got {:?}", other),
        }
    }

    #[test]
    fn default_noise_orders_sources() {
        let noise = SourceNoise::default();
        assert!(noise.gnss.position_std_m < noise.ais.position_std_m);
        assert!(noise.ais.position_std_m < noise.radar.position_std_m);
        assert!(noise.ais.is_valid());
    }
}
