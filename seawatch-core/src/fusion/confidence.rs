//! Track confidence
//!
//! A published track says how much to trust it with one number in [0, 1].
//! It is the product of three terms:
//!
//! ```text
//! uncertainty  = 1 / (1 + (σ_pos / 50 m)²)
//! consistency  = exp(-d² / (2 · 5.99))      0.5 before the first update
//! convergence  = min(1, (updates + 1) / 11)
//! ```
//!
//! where `d²` is the squared Mahalanobis distance of the last innovation and
//! 5.99 the 95% chi-squared point for two degrees of freedom. The product is
//! then halved for every `half_life` of silence since the last update.
//!
//! Scores are kept as 16-bit fixed point so equal snapshots compare equal,
//! and serialize as a decimal rounded to three places.

use serde::{Serialize, Serializer};

use crate::constants::fusion::{
    CHI2_95_2D, CONFIDENCE_REFERENCE_STD_M, CONVERGENCE_UPDATE_COUNT, FIXED_POINT_SCALE,
};

/// Track confidence, 0 (none) to 1 (full)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ConfidenceScore {
    raw: u16,
}

impl ConfidenceScore {
    /// No confidence
    pub const ZERO: Self = Self { raw: 0 };

    /// Clamps to [0, 1]; NaN becomes zero
    pub fn from_float(confidence: f32) -> Self {
        let clamped = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { raw: (clamped * FIXED_POINT_SCALE) as u16 }
    }

    /// Score as a float in [0, 1]
    pub fn as_float(&self) -> f32 {
        f32::from(self.raw) / FIXED_POINT_SCALE
    }

    /// Halve once per whole half-life elapsed
    pub fn decay(&self, silent_ms: u64, half_life_ms: u64) -> Self {
        if silent_ms == 0 || half_life_ms == 0 {
            return *self;
        }

        let halvings = (silent_ms / half_life_ms).min(16) as u32;
        Self { raw: self.raw.checked_shr(halvings).unwrap_or(0) }
    }

    /// Score a filter estimate
    ///
    /// `mahalanobis_squared` is `None` until the filter has absorbed a
    /// second report.
    pub fn for_track(
        position_std_m: f64,
        mahalanobis_squared: Option<f64>,
        update_count: u32,
    ) -> Self {
        let ratio = position_std_m / CONFIDENCE_REFERENCE_STD_M;
        let uncertainty = 1.0 / (1.0 + ratio * ratio);

        let consistency = match mahalanobis_squared {
            Some(d2) if d2.is_finite() => libm::exp(-0.5 * d2 / CHI2_95_2D),
            Some(_) => 0.0,
            None => 0.5,
        };

        let convergence = (f64::from(update_count + 1)
            / f64::from(CONVERGENCE_UPDATE_COUNT + 1))
            .min(1.0);

        Self::from_float((uncertainty * consistency * convergence) as f32)
    }
}

impl Serialize for ConfidenceScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rounded = (f64::from(self.as_float()) * 1000.0).round() / 1000.0;
        serializer.serialize_f64(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_input_is_clamped() {
        assert!((ConfidenceScore::from_float(0.75).as_float() - 0.75).abs() < 0.001);
        assert_eq!(ConfidenceScore::from_float(1.5).as_float(), 1.0);
        assert_eq!(ConfidenceScore::from_float(-0.5), ConfidenceScore::ZERO);
        assert_eq!(ConfidenceScore::from_float(f32::NAN), ConfidenceScore::ZERO);
    }

    #[test]
    fn silence_halves_per_half_life() {
        let score = ConfidenceScore::from_float(0.8);

        // Partial half-lives do not count
        assert_eq!(score.decay(59_999, 60_000), score);
        assert!((score.decay(60_000, 60_000).as_float() - 0.4).abs() < 0.01);
        assert!((score.decay(150_000, 60_000).as_float() - 0.2).abs() < 0.01);

        assert_eq!(score.decay(10_000, 0), score);
        assert_eq!(score.decay(u64::MAX, 1), ConfidenceScore::ZERO);
    }

    #[test]
    fn converged_consistent_track_scores_high() {
        let good = ConfidenceScore::for_track(5.0, Some(0.5), 20);
        let fresh = ConfidenceScore::for_track(5.0, None, 0);
        let inconsistent = ConfidenceScore::for_track(5.0, Some(100.0), 20);
        let vague = ConfidenceScore::for_track(500.0, Some(0.5), 20);

        assert!(good.as_float() > 0.9);
        assert!(fresh < good);
        assert!(inconsistent < good);
        assert!(vague < good);
        assert_eq!(ConfidenceScore::for_track(5.0, Some(f64::NAN), 20), ConfidenceScore::ZERO);
    }

    #[test]
    fn serializes_as_decimal() {
        let json = serde_json::to_string(&ConfidenceScore::from_float(0.5)).unwrap();
        assert_eq!(json, "0.5");
    }
}
