//! Kalman Filter for Vessel Tracks
//!
//! ## Overview
//!
//! `TrackFilter` estimates one vessel's position and velocity from every
//! report associated with it, whatever the source. It owns a local tangent
//! plane anchored near the vessel; all filter arithmetic happens there in
//! metres, and positions are converted back to WGS-84 on the way out.
//!
//! ## Kalman Filter Theory
//!
//! ### 1. Prediction Step
//! ```text
//! State prediction:      x̂ₖ|ₖ₋₁ = F(dt)·xₖ₋₁
//! Covariance prediction: Pₖ|ₖ₋₁ = F·Pₖ₋₁·Fᵀ + Q(dt)
//! ```
//!
//! ### 2. Update Step
//! ```text
//! Innovation:      yₖ = zₖ - H·x̂ₖ|ₖ₋₁
//! Innovation cov:  Sₖ = H·Pₖ|ₖ₋₁·Hᵀ + R
//! Kalman gain:     Kₖ = Pₖ|ₖ₋₁·Hᵀ·Sₖ⁻¹
//! State update:    x̂ₖ = x̂ₖ|ₖ₋₁ + Kₖ·yₖ
//! Covariance:      Pₖ = (I - KH)·Pₖ|ₖ₋₁·(I - KH)ᵀ + K·R·Kᵀ
//! ```
//!
//! ## Failure Semantics
//!
//! An update is computed on copies and committed only when it succeeds, so a
//! rejected report (non-positive elapsed time, exhausted regularization)
//! leaves the filter exactly as it was.
//!
//! ## Usage Example
//!
//! ```rust
//! use seawatch_core::fusion::{SourceNoise, TrackFilter, ConstantVelocityModel};
//! use seawatch_core::{SensorObservation, SensorSource};
//!
//! let noise = SourceNoise::default();
//! let first = SensorObservation::new(SensorSource::Ais, 0, 59.90, 10.70);
//! let mut filter = TrackFilter::initialize(&first, &noise, ConstantVelocityModel::default());
//!
//! let next = SensorObservation::new(SensorSource::Ais, 10_000, 59.9001, 10.70);
//! let innovation = filter.update(&next, &noise).unwrap();
//! assert!(innovation.normalized_distance() < 3.0);
//! ```

use log::debug;

use crate::{
    constants::fusion::{INITIAL_VELOCITY_STD_MS, RECENTER_DISTANCE_M},
    errors::{FusionError, FusionResult},
    fusion::{
        matrix::{
            add, identity, invert_regularized, make_symmetric, matvec, multiply, transpose,
            Matrix, SquareMatrix, Vector,
        },
        models::{ConstantVelocityModel, Measurement, SourceNoise, POSITION_H},
    },
    geo::{course_from_velocity, velocity_from_course, GeoPoint, LocalFrame},
    observation::SensorObservation,
    time::{elapsed_ms, elapsed_secs, Timestamp},
};

/// Position innovation of one update
///
/// Carries everything the anomaly detector needs, so it never touches
/// filter internals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Innovation {
    /// Observed minus predicted position, (east, north) metres
    pub residual: Vector<2>,
    /// Position block of the innovation covariance S (m²)
    pub covariance: SquareMatrix<2>,
}

impl Innovation {
    /// Squared Mahalanobis distance yᵀ·S⁻¹·y
    pub fn mahalanobis_squared(&self) -> f64 {
        let Some((s_inv, _)) = invert_regularized(&self.covariance) else {
            return f64::INFINITY;
        };
        let mut s_inv_y = [0.0; 2];
        matvec(&s_inv, &self.residual, &mut s_inv_y);
        let d2 = self.residual[0] * s_inv_y[0] + self.residual[1] * s_inv_y[1];
        d2.max(0.0)
    }

    /// Mahalanobis distance in sigma units
    pub fn normalized_distance(&self) -> f64 {
        libm::sqrt(self.mahalanobis_squared())
    }

    /// Residual length in metres
    pub fn distance_m(&self) -> f64 {
        libm::hypot(self.residual[0], self.residual[1])
    }
}

/// Result of one measurement correction, not yet committed
struct Correction<const M: usize> {
    state: Vector<4>,
    covariance: SquareMatrix<4>,
    residual: Vector<M>,
    innovation_covariance: SquareMatrix<M>,
    regularization: f64,
}

/// Constant-velocity Kalman filter for one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFilter {
    /// Tangent plane the state is expressed in
    frame: LocalFrame,
    /// [east, north, v_east, v_north]
    state: Vector<4>,
    /// Estimation error covariance
    covariance: SquareMatrix<4>,
    model: ConstantVelocityModel,
    /// Time of the state estimate
    last_timestamp: Timestamp,
    /// Successful updates since initialization
    update_count: u32,
    last_innovation: Option<Innovation>,
}

impl TrackFilter {
    /// Start a filter at the first observation of a track
    pub fn initialize(
        observation: &SensorObservation,
        noise: &SourceNoise,
        model: ConstantVelocityModel,
    ) -> Self {
        let frame = LocalFrame::new(observation.position());
        let pos_std = noise.position_std(observation);
        let pos_var = pos_std * pos_std;

        let (velocity, vel_var) = match observation.course_over_ground() {
            Some((speed, course)) => {
                let std = noise.profile(observation.source).velocity_std_ms;
                (velocity_from_course(speed, course), std * std)
            }
            None => ([0.0, 0.0], INITIAL_VELOCITY_STD_MS * INITIAL_VELOCITY_STD_MS),
        };

        Self {
            frame,
            state: [0.0, 0.0, velocity[0], velocity[1]],
            covariance: [
                [pos_var, 0.0, 0.0, 0.0],
                [0.0, pos_var, 0.0, 0.0],
                [0.0, 0.0, vel_var, 0.0],
                [0.0, 0.0, 0.0, vel_var],
            ],
            model,
            last_timestamp: observation.timestamp,
            update_count: 0,
            last_innovation: None,
        }
    }

    /// Predict state and covariance at `timestamp` without mutating
    ///
    /// Times at or before the current estimate return the estimate itself.
    pub fn predicted(&self, timestamp: Timestamp) -> (Vector<4>, SquareMatrix<4>) {
        let dt = elapsed_secs(self.last_timestamp, timestamp);
        if dt <= 0.0 {
            return (self.state, self.covariance);
        }
        self.propagate(dt)
    }

    /// Predicted position and its 1-sigma uncertainty (m) at `timestamp`
    pub fn predict_position(&self, timestamp: Timestamp) -> (GeoPoint, f64) {
        let (state, covariance) = self.predicted(timestamp);
        let sigma = libm::sqrt(((covariance[0][0] + covariance[1][1]) * 0.5).max(0.0));
        (self.frame.to_geo([state[0], state[1]]), sigma)
    }

    /// Fold one observation into the estimate
    ///
    /// Fails with `InvalidTimestep` when the observation is not strictly
    /// newer than the current estimate; the filter is left untouched.
    pub fn update(
        &mut self,
        observation: &SensorObservation,
        noise: &SourceNoise,
    ) -> FusionResult<Innovation> {
        let elapsed = elapsed_ms(self.last_timestamp, observation.timestamp);
        if elapsed <= 0 {
            return Err(FusionError::InvalidTimestep { elapsed_ms: elapsed });
        }

        let (x_pred, p_pred) = self.propagate(elapsed as f64 / 1000.0);
        let measurement = Measurement::from_observation(observation, &self.frame, noise);

        let (state, covariance, innovation, regularization) = match measurement {
            Measurement::Position { z, r } => {
                let c = Self::correct(&x_pred, &p_pred, &z, &POSITION_H, &r)?;
                let innovation = Innovation {
                    residual: c.residual,
                    covariance: c.innovation_covariance,
                };
                (c.state, c.covariance, innovation, c.regularization)
            }
            Measurement::PositionVelocity { z, r } => {
                let c = Self::correct(&x_pred, &p_pred, &z, &identity::<4>(), &r)?;
                let s = c.innovation_covariance;
                let innovation = Innovation {
                    residual: [c.residual[0], c.residual[1]],
                    covariance: [[s[0][0], s[0][1]], [s[1][0], s[1][1]]],
                };
                (c.state, c.covariance, innovation, c.regularization)
            }
        };

        if regularization > 0.0 {
            debug!("innovation covariance regularized with epsilon {regularization:e}");
        }

        self.state = state;
        self.covariance = covariance;
        self.last_timestamp = observation.timestamp;
        self.update_count += 1;
        self.last_innovation = Some(innovation);
        self.recenter_if_needed();

        Ok(innovation)
    }

    /// x̂ = F·x, P = F·P·Fᵀ + Q
    fn propagate(&self, dt: f64) -> (Vector<4>, SquareMatrix<4>) {
        let f = self.model.transition(dt);
        let q = self.model.process_noise(dt);

        let mut state = [0.0; 4];
        matvec(&f, &self.state, &mut state);

        let mut fp = [[0.0; 4]; 4];
        multiply(&f, &self.covariance, &mut fp);
        let mut f_t = [[0.0; 4]; 4];
        transpose(&f, &mut f_t);
        let mut fpf_t = [[0.0; 4]; 4];
        multiply(&fp, &f_t, &mut fpf_t);

        let mut covariance = [[0.0; 4]; 4];
        add(&fpf_t, &q, &mut covariance);
        make_symmetric(&mut covariance);

        (state, covariance)
    }

    fn correct<const M: usize>(
        x: &Vector<4>,
        p: &SquareMatrix<4>,
        z: &Vector<M>,
        h: &Matrix<M, 4>,
        r: &SquareMatrix<M>,
    ) -> FusionResult<Correction<M>> {
        // y = z - H·x̂
        let mut hx = [0.0; M];
        matvec(h, x, &mut hx);
        let mut residual = [0.0; M];
        for i in 0..M {
            residual[i] = z[i] - hx[i];
        }

        // S = H·P·Hᵀ + R
        let mut hp = [[0.0; 4]; M];
        multiply(h, p, &mut hp);
        let mut h_t = [[0.0; M]; 4];
        transpose(h, &mut h_t);
        let mut hph_t = [[0.0; M]; M];
        multiply(&hp, &h_t, &mut hph_t);
        let mut s = [[0.0; M]; M];
        add(&hph_t, r, &mut s);
        make_symmetric(&mut s);

        let (s_inv, regularization) =
            invert_regularized(&s).ok_or(FusionError::SingularCovariance)?;

        // K = P·Hᵀ·S⁻¹
        let mut ph_t = [[0.0; M]; 4];
        multiply(p, &h_t, &mut ph_t);
        let mut gain = [[0.0; M]; 4];
        multiply(&ph_t, &s_inv, &mut gain);

        // x = x̂ + K·y
        let mut k_y = [0.0; 4];
        matvec(&gain, &residual, &mut k_y);
        let mut state = *x;
        for i in 0..4 {
            state[i] += k_y[i];
        }

        // Joseph form: (I - KH)·P·(I - KH)ᵀ + K·R·Kᵀ
        let mut kh = [[0.0; 4]; 4];
        multiply(&gain, h, &mut kh);
        let mut i_kh = identity::<4>();
        for i in 0..4 {
            for j in 0..4 {
                i_kh[i][j] -= kh[i][j];
            }
        }
        let mut i_kh_p = [[0.0; 4]; 4];
        multiply(&i_kh, p, &mut i_kh_p);
        let mut i_kh_t = [[0.0; 4]; 4];
        transpose(&i_kh, &mut i_kh_t);
        let mut joseph = [[0.0; 4]; 4];
        multiply(&i_kh_p, &i_kh_t, &mut joseph);

        let mut kr = [[0.0; M]; 4];
        multiply(&gain, r, &mut kr);
        let mut k_t = [[0.0; 4]; M];
        transpose(&gain, &mut k_t);
        let mut krk_t = [[0.0; 4]; 4];
        multiply(&kr, &k_t, &mut krk_t);

        let mut covariance = [[0.0; 4]; 4];
        add(&joseph, &krk_t, &mut covariance);
        make_symmetric(&mut covariance);

        let finite = state.iter().chain(covariance.iter().flatten()).all(|v| v.is_finite());
        if !finite {
            return Err(FusionError::SingularCovariance);
        }

        Ok(Correction {
            state,
            covariance,
            residual,
            innovation_covariance: s,
            regularization,
        })
    }

    /// Move the origin under the estimate once it drifts too far
    fn recenter_if_needed(&mut self) {
        let offset = libm::hypot(self.state[0], self.state[1]);
        if offset <= RECENTER_DISTANCE_M {
            return;
        }
        let origin = self.frame.to_geo([self.state[0], self.state[1]]);
        debug!(
            "re-anchoring track frame at {:.5},{:.5} after {:.0} m drift",
            origin.latitude, origin.longitude, offset
        );
        self.frame = LocalFrame::new(origin);
        self.state[0] = 0.0;
        self.state[1] = 0.0;
    }

    /// Current fused position
    pub fn position(&self) -> GeoPoint {
        self.frame.to_geo([self.state[0], self.state[1]])
    }

    /// Current velocity (east, north) in m/s
    pub fn velocity(&self) -> Vector<2> {
        [self.state[2], self.state[3]]
    }

    /// Current speed (knots) and course (degrees)
    pub fn speed_course(&self) -> (f64, f64) {
        course_from_velocity(self.velocity())
    }

    /// Mean per-axis position variance of the current estimate (m²)
    pub fn position_variance(&self) -> f64 {
        ((self.covariance[0][0] + self.covariance[1][1]) * 0.5).max(0.0)
    }

    /// 1-sigma position uncertainty of the current estimate (m)
    pub fn position_std(&self) -> f64 {
        libm::sqrt(self.position_variance())
    }

    /// State `[east, north, v_east, v_north]` in the local frame
    pub fn state(&self) -> &Vector<4> {
        &self.state
    }

    /// State covariance
    pub fn covariance(&self) -> &SquareMatrix<4> {
        &self.covariance
    }

    /// Tangent plane the state is expressed in
    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// Time of the newest absorbed observation
    pub fn last_timestamp(&self) -> Timestamp {
        self.last_timestamp
    }

    /// Observations absorbed after the first
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Innovation of the most recent update
    pub fn last_innovation(&self) -> Option<&Innovation> {
        self.last_innovation.as_ref()
    }
}
