//! MQTT connector for SeaWatch
//!
//! Wraps a rumqttc `AsyncClient`. The client's event loop runs in its own
//! tokio task and keeps the connection alive (rumqttc reconnects on the next
//! poll after an error); the connector only tracks whether a CONNACK has been
//! seen since the last failure.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, info, warn};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet};
use thiserror::Error;
use tokio::task::JoinHandle;

pub use rumqttc::QoS;

use crate::{config::MqttConfig, AsyncConnector, ConnectionStats};

/// Pause between event loop polls after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// MQTT-specific errors
#[derive(Debug, Error)]
pub enum MqttError {
    /// rumqttc rejected the request
    #[error("Client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// QoS outside 0..=2
    #[error("Invalid QoS level {0}")]
    InvalidQos(u8),

    /// Publish not accepted in time
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),

    /// No CONNACK received yet
    #[error("Not connected to broker")]
    NotConnected,
}

/// Map a numeric QoS level onto rumqttc's enum
pub fn qos_from_level(level: u8) -> Result<QoS, MqttError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(MqttError::InvalidQos(other)),
    }
}

/// Broker connection settings for rumqttc
pub fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        options.set_credentials(username, password);
    }
    options
}

/// Publishing MQTT client
pub struct MqttConnector {
    client: AsyncClient,
    qos: QoS,
    publish_timeout: Duration,
    connected: Arc<AtomicBool>,
    reconnections: Arc<AtomicU32>,
    event_task: JoinHandle<()>,
    stats: ConnectionStats,
}

impl MqttConnector {
    /// Create the client and start its event loop
    ///
    /// Must be called inside a tokio runtime. The connection itself is made
    /// asynchronously; `is_connected` turns true once the broker answers.
    pub fn connect(config: &MqttConfig) -> Result<Self, MqttError> {
        let qos = qos_from_level(config.qos)?;
        let (client, eventloop) =
            AsyncClient::new(mqtt_options(config), config.request_capacity.max(1));

        let connected = Arc::new(AtomicBool::new(false));
        let reconnections = Arc::new(AtomicU32::new(0));
        let event_task = tokio::spawn(drive_event_loop(
            eventloop,
            connected.clone(),
            reconnections.clone(),
        ));

        info!("MQTT client {} connecting to {}:{}", config.client_id, config.host, config.port);

        Ok(Self {
            client,
            qos,
            publish_timeout: Duration::from_millis(config.publish_timeout_ms.max(1)),
            connected,
            reconnections,
            event_task,
            stats: ConnectionStats::default(),
        })
    }
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    reconnections: Arc<AtomicU32>,
) {
    let mut seen_connack = false;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if seen_connack {
                    reconnections.fetch_add(1, Ordering::Relaxed);
                }
                seen_connack = true;
                connected.store(true, Ordering::Relaxed);
                info!("MQTT broker connected");
            }
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                connected.store(false, Ordering::Relaxed);
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                connected.store(false, Ordering::Relaxed);
                break;
            }
            Err(e) => {
                if connected.swap(false, Ordering::Relaxed) {
                    warn!("MQTT connection lost: {}", e);
                } else {
                    debug!("MQTT connection attempt failed: {}", e);
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MqttConnector {
    type Error = MqttError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        if !self.is_connected() {
            self.stats.record_failure(MqttError::NotConnected);
            return Err(MqttError::NotConnected);
        }

        let publish = self.client.publish(topic, self.qos, false, data.to_vec());
        let result = match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(result) => result.map_err(MqttError::from),
            Err(_) => Err(MqttError::Timeout(self.publish_timeout)),
        };

        match result {
            Ok(()) => {
                self.stats.record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            reconnections: self.reconnections.load(Ordering::Relaxed),
            ..self.stats.clone()
        }
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        let result = self.client.disconnect().await;
        if tokio::time::timeout(self.publish_timeout, &mut self.event_task).await.is_err() {
            self.event_task.abort();
        }
        self.connected.store(false, Ordering::Relaxed);
        result.map_err(MqttError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_levels() {
        assert_eq!(qos_from_level(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_level(2).unwrap(), QoS::ExactlyOnce);
        assert!(matches!(qos_from_level(3), Err(MqttError::InvalidQos(3))));
    }

    #[test]
    fn options_from_config() {
        let config = MqttConfig {
            host: "broker.local".into(),
            port: 8883,
            keep_alive_secs: 60,
            ..Default::default()
        };
        let options = mqtt_options(&config);
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 8883));
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(options.client_id(), "seawatch-fusion");
    }

    #[tokio::test]
    async fn unreachable_broker_refuses_sends() {
        let config = MqttConfig { host: "127.0.0.1".into(), port: 1, ..Default::default() };
        let mut connector = MqttConnector::connect(&config).unwrap();

        let result = connector.send("alerts", b"{}").await;
        assert!(matches!(result, Err(MqttError::NotConnected)));
        assert_eq!(connector.stats().messages_failed, 1);
        connector.event_task.abort();
    }
}
