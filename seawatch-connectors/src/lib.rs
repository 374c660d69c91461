//! Publishing fusion output
//!
//! The fusion core produces one `CycleOutput` per cycle and knows nothing
//! about transports. This crate moves those outputs onto the wire:
//!
//! ```text
//! CycleOutput ──Topics::encode──▶ [(topic, JSON bytes)] ──▶ Connector
//!                                  heartbeat every cycle
//!                                  alerts when anomalies exist
//! ```
//!
//! ## Connectors
//!
//! ### MQTT
//!
//! Default transport for deployments. Heartbeats and alerts go to two topics
//! (`fusion/heartbeat` and `alerts` by default) so consumers can subscribe to
//! alerts alone.
//!
//! ### Stdout
//!
//! Writes `topic payload` lines. Useful for replays and piping into other
//! tools.
//!
//! ### Memory
//!
//! Records messages in memory, for tests.
//!
//! ## Sync and Async
//!
//! `Connector` is the blocking interface; `ConnectorPublisher` adapts it to
//! the core's `Publisher` so `FusionOrchestrator::run` can drive it from a
//! plain thread. `AsyncConnector` is used by the tokio `FusionService`.
//!
//! ## Example
//!
//! ```rust
//! use seawatch_connectors::{memory::MemoryConnector, ConnectorPublisher, Topics};
//! use seawatch_core::{FusionConfig, FusionOrchestrator, Publisher};
//!
//! let mut orchestrator = FusionOrchestrator::new(FusionConfig::default());
//! let connector = MemoryConnector::new();
//! let mut publisher = ConnectorPublisher::new(connector.clone(), Topics::default());
//!
//! let output = orchestrator.tick(Vec::new());
//! publisher.publish(&output)?;
//! assert_eq!(connector.messages_on("fusion/heartbeat").len(), 1);
//! # Ok::<(), seawatch_connectors::ConnectorError>(())
//! ```

pub mod config;
pub mod console;
pub mod memory;
pub mod service;

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConnector, MqttError, QoS};

pub use config::{MqttConfig, ServiceConfig};
pub use service::{FusionService, ServiceReport};

use serde::{Deserialize, Serialize};
use seawatch_core::{CycleOutput, Publisher};
use thiserror::Error;

/// Default topic for heartbeats
pub const DEFAULT_HEARTBEAT_TOPIC: &str = "fusion/heartbeat";

/// Default topic for alert batches
pub const DEFAULT_ALERTS_TOPIC: &str = "alerts";

/// Failures of the built-in connectors and the publisher adapter
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No live transport (broker down or connector closed)
    #[error("Transport is not connected")]
    NotConnected,

    /// The transport refused the message
    #[error("Transport rejected message: {0}")]
    ProtocolError(String),

    /// Message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing to the transport failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking transport
pub trait Connector {
    type Error: std::fmt::Display;

    /// Send one message
    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Whether a send could currently succeed
    fn is_connected(&self) -> bool;
}

/// Transport driven from the tokio service
#[async_trait::async_trait]
pub trait AsyncConnector: Send {
    type Error: std::fmt::Display + Send;

    /// Send one message
    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error>;

    /// Whether a send could currently succeed
    fn is_connected(&self) -> bool;

    /// Counters since the connector was created
    fn stats(&self) -> ConnectionStats;

    /// Flush and close the transport
    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Publish counters kept by every connector
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Successful sends
    pub messages_sent: u64,
    /// Failed sends
    pub messages_failed: u64,
    /// Payload bytes of successful sends
    pub bytes_sent: u64,
    /// Broker reconnects (MQTT only)
    pub reconnections: u32,
    /// Most recent send error
    pub last_error: Option<String>,
}

impl ConnectionStats {
    /// Count one successful send of `bytes` payload bytes
    pub fn record_sent(&mut self, bytes: usize) {
        self.messages_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Count one failed send and remember its error
    pub fn record_failure(&mut self, error: impl std::fmt::Display) {
        self.messages_failed += 1;
        self.last_error = Some(error.to_string());
    }
}

/// Topic names for published messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    /// Topic for the per-cycle heartbeat
    pub heartbeat: String,
    /// Topic for alert batches
    pub alerts: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            heartbeat: DEFAULT_HEARTBEAT_TOPIC.to_string(),
            alerts: DEFAULT_ALERTS_TOPIC.to_string(),
        }
    }
}

impl Topics {
    /// Serialize one cycle into `(topic, payload)` pairs, heartbeat first
    pub fn encode(&self, output: &CycleOutput) -> Result<Vec<(&str, Vec<u8>)>, ConnectorError> {
        let mut messages = vec![(self.heartbeat.as_str(), serde_json::to_vec(&output.heartbeat())?)];
        if let Some(alert) = output.alert() {
            messages.push((self.alerts.as_str(), serde_json::to_vec(&alert)?));
        }
        Ok(messages)
    }
}

/// Adapts a blocking `Connector` to the core `Publisher` seam
#[derive(Debug)]
pub struct ConnectorPublisher<C> {
    connector: C,
    topics: Topics,
}

impl<C: Connector> ConnectorPublisher<C> {
    /// Publisher sending through `connector`
    pub fn new(connector: C, topics: Topics) -> Self {
        Self { connector, topics }
    }

    /// Underlying connector
    pub fn connector(&self) -> &C {
        &self.connector
    }
}

impl<C: Connector> Publisher for ConnectorPublisher<C> {
    type Error = ConnectorError;

    fn publish(&mut self, output: &CycleOutput) -> Result<(), Self::Error> {
        if !self.connector.is_connected() {
            return Err(ConnectorError::NotConnected);
        }
        for (topic, payload) in self.topics.encode(output)? {
            self.connector
                .send(topic, &payload)
                .map_err(|e| ConnectorError::ProtocolError(e.to_string()))?;
        }
        Ok(())
    }
}
