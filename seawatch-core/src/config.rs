//! Fusion Engine Configuration
//!
//! All tunables in one serde structure. Every field has a default taken from
//! `constants`, so a config file only needs the settings it changes:
//!
//! ```toml
//! cycle_interval_ms = 1000
//! gate_radius_m = 1500.0
//!
//! [noise.radar]
//! position_std_m = 75.0
//! velocity_std_ms = 3.0
//!
//! [anomaly.position_jump_sigma]
//! low = 5.0
//! medium = 10.0
//! high = 20.0
//! ```
//!
//! `FusionConfig::load` reads a TOML file and validates it; `validate` can
//! also be called on programmatically built configs.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    anomaly::{AnomalyConfig, SeverityTiers},
    constants::{
        fusion::DEFAULT_ACCELERATION_STD_MS2,
        time::{DEFAULT_CYCLE_INTERVAL_MS, MIN_CYCLE_INTERVAL_MS},
        tracking::{
            DEFAULT_CONFIRM_HITS, DEFAULT_GATE_RADIUS_M, DEFAULT_ID_REUSE_COOLDOWN_SECS,
            DEFAULT_MAX_TRACK_IDS, DEFAULT_RETIRE_AFTER_SECS, DEFAULT_STALE_AFTER_SECS,
        },
    },
    errors::ConfigError,
    fusion::{ConstantVelocityModel, SourceNoise},
    integrity::IntegrityConfig,
    time::secs_to_ms,
};

/// Fusion engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Longest wait for observations before a cycle runs anyway (ms)
    pub cycle_interval_ms: u64,
    /// Association gate around a track's predicted position (m)
    pub gate_radius_m: f64,
    /// Process noise: acceleration standard deviation (m/s²)
    pub acceleration_std_ms2: f64,
    /// Observation noise per source
    pub noise: SourceNoise,
    /// Consistent updates needed to confirm a tentative track
    pub confirm_hits: u32,
    /// Silence before a confirmed track goes stale (s)
    pub stale_after_secs: f64,
    /// Silence before a stale track is retired (s)
    pub retire_after_secs: f64,
    /// Size of the track id pool
    pub max_track_ids: u32,
    /// Time a retired id waits before reuse (s)
    pub id_reuse_cooldown_secs: f64,
    /// Anomaly thresholds
    pub anomaly: AnomalyConfig,
    /// Interference clustering
    pub integrity: IntegrityConfig,
    /// Drop alert messages while no track is live
    pub suppress_alerts_without_tracks: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
            gate_radius_m: DEFAULT_GATE_RADIUS_M,
            acceleration_std_ms2: DEFAULT_ACCELERATION_STD_MS2,
            noise: SourceNoise::default(),
            confirm_hits: DEFAULT_CONFIRM_HITS,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            retire_after_secs: DEFAULT_RETIRE_AFTER_SECS,
            max_track_ids: DEFAULT_MAX_TRACK_IDS,
            id_reuse_cooldown_secs: DEFAULT_ID_REUSE_COOLDOWN_SECS,
            anomaly: AnomalyConfig::default(),
            integrity: IntegrityConfig::default(),
            suppress_alerts_without_tracks: false,
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be zero or a positive number"))
    }
}

fn tiers(field: &'static str, tiers: &SeverityTiers) -> Result<(), ConfigError> {
    if tiers.is_valid() {
        Ok(())
    } else {
        Err(invalid(field, "tiers must be positive and non-decreasing"))
    }
}

impl FusionConfig {
    /// Read and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_ms < MIN_CYCLE_INTERVAL_MS {
            return Err(invalid("cycle_interval_ms", "below the minimum cycle interval"));
        }
        positive("gate_radius_m", self.gate_radius_m)?;
        non_negative("acceleration_std_ms2", self.acceleration_std_ms2)?;
        if !(self.noise.ais.is_valid() && self.noise.radar.is_valid() && self.noise.gnss.is_valid())
        {
            return Err(invalid("noise", "standard deviations must be non-negative"));
        }
        if self.confirm_hits == 0 {
            return Err(invalid("confirm_hits", "must be at least 1"));
        }
        positive("stale_after_secs", self.stale_after_secs)?;
        positive("retire_after_secs", self.retire_after_secs)?;
        if self.retire_after_secs < self.stale_after_secs {
            return Err(invalid("retire_after_secs", "must not be shorter than stale_after_secs"));
        }
        if self.max_track_ids == 0 {
            return Err(invalid("max_track_ids", "must be at least 1"));
        }
        non_negative("id_reuse_cooldown_secs", self.id_reuse_cooldown_secs)?;

        let anomaly = &self.anomaly;
        tiers("anomaly.position_jump_sigma", &anomaly.position_jump_sigma)?;
        tiers("anomaly.timing_gap_secs", &anomaly.timing_gap_secs)?;
        tiers("anomaly.speed_ratio", &anomaly.speed_ratio)?;
        tiers("anomaly.source_disagreement_m", &anomaly.source_disagreement_m)?;
        non_negative("anomaly.speed_min_interval_secs", anomaly.speed_min_interval_secs)?;
        non_negative("anomaly.source_window_secs", anomaly.source_window_secs)?;
        if !anomaly.max_speed_knots.is_valid() {
            return Err(invalid("anomaly.max_speed_knots", "must be positive numbers"));
        }

        let integrity = &self.integrity;
        positive("integrity.event_ttl_secs", integrity.event_ttl_secs)?;
        positive("integrity.cluster_radius_m", integrity.cluster_radius_m)?;
        if integrity.min_events == 0 {
            return Err(invalid("integrity.min_events", "must be at least 1"));
        }

        Ok(())
    }

    /// Cycle interval as a `Duration`
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    /// CONFIRMED→STALE silence (ms)
    pub fn stale_after_ms(&self) -> u64 {
        secs_to_ms(self.stale_after_secs)
    }

    /// STALE→RETIRED silence (ms)
    pub fn retire_after_ms(&self) -> u64 {
        secs_to_ms(self.retire_after_secs)
    }

    /// Id reuse cooldown (ms)
    pub fn id_reuse_cooldown_ms(&self) -> u64 {
        secs_to_ms(self.id_reuse_cooldown_secs)
    }

    /// Motion model built from the process noise setting
    pub fn motion_model(&self) -> ConstantVelocityModel {
        ConstantVelocityModel::new(self.acceleration_std_ms2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = FusionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cycle_interval(), Duration::from_secs(2));
        assert_eq!(config.stale_after_ms(), 180_000);
        assert!(!config.suppress_alerts_without_tracks);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = FusionConfig::from_toml_str(
            r#"
            gate_radius_m = 1500.0

            [noise.radar]
            position_std_m = 75.0
            velocity_std_ms = 3.0

            [anomaly.position_jump_sigma]
            low = 5.0
            medium = 10.0
            high = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.gate_radius_m, 1500.0);
        assert_eq!(config.noise.radar.position_std_m, 75.0);
        assert_eq!(config.noise.ais, SourceNoise::default().ais);
        assert_eq!(config.anomaly.position_jump_sigma.high, 20.0);
        assert_eq!(config.anomaly.timing_gap_secs.low, 60.0);
        assert_eq!(config.confirm_hits, 3);
    }

    #[test]
    fn invalid_values_rejected() {
        let err = FusionConfig::from_toml_str("gate_radius_m = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "gate_radius_m", .. }));

        let err = FusionConfig::from_toml_str("stale_after_secs = 1000.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retire_after_secs", .. }));

        let err = FusionConfig::from_toml_str(
            "[anomaly.timing_gap_secs]\nlow = 600.0\nmedium = 180.0\nhigh = 60.0",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "anomaly.timing_gap_secs", .. }));

        assert!(matches!(
            FusionConfig::from_toml_str("gate_radius_m = \"wide\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cycle_interval_ms = 500\nsuppress_alerts_without_tracks = true").unwrap();

        let config = FusionConfig::load(file.path()).unwrap();
        assert_eq!(config.cycle_interval_ms, 500);
        assert!(config.suppress_alerts_without_tracks);

        let missing = FusionConfig::load("/nonexistent/seawatch.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
