//! Common test utilities for integration tests
//!
//! This module provides:
//! - Observation builders for each sensor source
//! - A straight-line vessel simulator with optional noise
//! - A deterministic random number generator
//! - Tolerance assertions

#![allow(dead_code)]

use seawatch_core::{
    geo::{velocity_from_course, GeoPoint, LocalFrame},
    SensorObservation, SensorSource, Timestamp,
};

/// 2024-05-01T12:00:00Z
pub const T0: Timestamp = 1_714_564_800_000;

pub fn ais(vessel: &str, ts: Timestamp, lat: f64, lon: f64) -> SensorObservation {
    SensorObservation::new(SensorSource::Ais, ts, lat, lon).with_vessel_id(vessel)
}

pub fn radar(ts: Timestamp, lat: f64, lon: f64) -> SensorObservation {
    SensorObservation::new(SensorSource::Radar, ts, lat, lon)
}

pub fn gnss(vessel: &str, ts: Timestamp, lat: f64, lon: f64) -> SensorObservation {
    SensorObservation::new(SensorSource::Gnss, ts, lat, lon).with_vessel_id(vessel)
}

#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let diff = ($actual - $expected).abs();
        if diff > $tolerance {
            panic!(
                "Value {} not within tolerance {} of expected {} (diff: {})",
                $actual, $tolerance, $expected, diff
            );
        }
    };
}

/// Deterministic random number generator for tests
pub struct TestRng {
    state: u64,
}

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Approximately normal sample (sum of twelve uniforms)
    pub fn gaussian(&mut self, std: f64) -> f64 {
        let sum: f64 = (0..12).map(|_| self.next_f64()).sum();
        (sum - 6.0) * std
    }
}

/// Vessel moving at constant speed and course
#[derive(Debug, Clone, Copy)]
pub struct VesselPath {
    pub start: GeoPoint,
    pub start_time: Timestamp,
    pub speed_knots: f64,
    pub course_deg: f64,
}

impl VesselPath {
    pub fn new(start: GeoPoint, start_time: Timestamp, speed_knots: f64, course_deg: f64) -> Self {
        Self { start, start_time, speed_knots, course_deg }
    }

    /// True position at `ts`
    pub fn position_at(&self, ts: Timestamp) -> GeoPoint {
        let dt = (ts - self.start_time) as f64 / 1000.0;
        let velocity = velocity_from_course(self.speed_knots, self.course_deg);
        LocalFrame::new(self.start).to_geo([velocity[0] * dt, velocity[1] * dt])
    }

    /// Report from `source` at `ts`, displaced by Gaussian noise (metres)
    pub fn observe(
        &self,
        source: SensorSource,
        ts: Timestamp,
        noise_m: f64,
        rng: &mut TestRng,
    ) -> SensorObservation {
        let truth = self.position_at(ts);
        let offset = [rng.gaussian(noise_m), rng.gaussian(noise_m)];
        let point = LocalFrame::new(truth).to_geo(offset);
        SensorObservation::new(source, ts, point.latitude, point.longitude)
    }
}
