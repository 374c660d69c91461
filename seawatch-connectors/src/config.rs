//! Service configuration file
//!
//! One TOML file configures the whole service. The `[fusion]` table is the
//! core `FusionConfig`; the rest is transport settings:
//!
//! ```toml
//! channel_capacity = 4096
//!
//! [fusion]
//! cycle_interval_ms = 1000
//!
//! [mqtt]
//! host = "broker.local"
//! port = 1883
//! client_id = "seawatch-fusion"
//!
//! [mqtt.topics]
//! heartbeat = "fusion/heartbeat"
//! alerts = "alerts"
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use seawatch_core::{ConfigError, FusionConfig};

use crate::Topics;

/// Default observation channel size
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// MQTT broker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,
    /// Broker port
    pub port: u16,
    /// MQTT client identifier
    pub client_id: String,
    /// Keep-alive interval (s)
    pub keep_alive_secs: u64,
    /// 0 = at most once, 1 = at least once, 2 = exactly once
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Client request queue size
    pub request_capacity: usize,
    /// Give up on a publish after this long (ms)
    pub publish_timeout_ms: u64,
    /// Output topics
    pub topics: Topics,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "seawatch-fusion".to_string(),
            keep_alive_secs: 30,
            qos: 1,
            username: None,
            password: None,
            request_capacity: 64,
            publish_timeout_ms: 5_000,
            topics: Topics::default(),
        }
    }
}

/// Whole-service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Fusion engine settings
    pub fusion: FusionConfig,
    /// Broker settings
    pub mqtt: MqttConfig,
    /// Observations buffered between ingestion and the fusion loop
    pub channel_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            mqtt: MqttConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ServiceConfig {
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

    /// Check fusion and broker settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fusion.validate()?;
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "channel_capacity",
                reason: "must be at least 1",
            });
        }
        if self.mqtt.qos > 2 {
            return Err(ConfigError::Invalid { field: "mqtt.qos", reason: "must be 0, 1 or 2" });
        }
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Invalid { field: "mqtt.host", reason: "must not be empty" });
        }
        if self.mqtt.topics.heartbeat.is_empty() || self.mqtt.topics.alerts.is_empty() {
            return Err(ConfigError::Invalid {
                field: "mqtt.topics",
                reason: "topic names must not be empty",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_published_topics() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mqtt.topics.heartbeat, "fusion/heartbeat");
        assert_eq!(config.mqtt.topics.alerts, "alerts");
    }

    #[test]
    fn file_with_nested_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            channel_capacity = 128

            [fusion]
            cycle_interval_ms = 1000

            [mqtt]
            host = "broker.local"
            qos = 0

            [mqtt.topics]
            alerts = "seawatch/alerts"
            "#
        )
        .unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.channel_capacity, 128);
        assert_eq!(config.fusion.cycle_interval_ms, 1000);
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topics.alerts, "seawatch/alerts");
        assert_eq!(config.mqtt.topics.heartbeat, "fusion/heartbeat");
    }

    #[test]
    fn invalid_settings_rejected() {
        assert!(matches!(
            ServiceConfig::from_toml_str("[mqtt]\nqos = 3"),
            Err(ConfigError::Invalid { field: "mqtt.qos", .. })
        ));
        assert!(matches!(
            ServiceConfig::from_toml_str("[fusion]\nconfirm_hits = 0"),
            Err(ConfigError::Invalid { field: "confirm_hits", .. })
        ));
    }
}
