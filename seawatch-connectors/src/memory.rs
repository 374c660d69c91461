//! In-memory connector for tests and dry runs
//!
//! Clones share one message log, so a test can hand a clone to the service
//! and inspect what was published afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{AsyncConnector, ConnectionStats, Connector, ConnectorError};

#[derive(Debug)]
struct Inner {
    messages: Vec<(String, Vec<u8>)>,
    connected: bool,
    failing: bool,
    disconnects: u32,
    stats: ConnectionStats,
}

/// Connector that records every message
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                messages: Vec::new(),
                connected: true,
                failing: false,
                disconnects: 0,
                stats: ConnectionStats::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Make every send fail until cleared
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// All recorded `(topic, payload)` pairs, oldest first
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().messages.clone()
    }

    /// Payloads published on `topic`, parsed as JSON
    pub fn messages_on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.lock()
            .messages
            .iter()
            .filter(|(t, _)| t == topic)
            .filter_map(|(_, payload)| serde_json::from_slice(payload).ok())
            .collect()
    }

    /// Number of times `disconnect` was called
    pub fn disconnects(&self) -> u32 {
        self.lock().disconnects
    }

    fn record(&self, topic: &str, data: &[u8]) -> Result<(), ConnectorError> {
        let mut inner = self.lock();
        if !inner.connected {
            inner.stats.record_failure(ConnectorError::NotConnected);
            return Err(ConnectorError::NotConnected);
        }
        if inner.failing {
            let err = ConnectorError::ProtocolError("send rejected".into());
            inner.stats.record_failure(&err);
            return Err(err);
        }
        inner.messages.push((topic.to_string(), data.to_vec()));
        inner.stats.record_sent(data.len());
        Ok(())
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MemoryConnector {
    type Error = ConnectorError;

    fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.record(topic, data)
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

#[async_trait::async_trait]
impl AsyncConnector for MemoryConnector {
    type Error = ConnectorError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.record(topic, data)
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn stats(&self) -> ConnectionStats {
        self.lock().stats.clone()
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        let mut inner = self.lock();
        inner.connected = false;
        inner.disconnects += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_log() {
        let connector = MemoryConnector::new();
        let mut handle = connector.clone();

        Connector::send(&mut handle, "alerts", br#"{"alerts":[]}"#).unwrap();

        assert_eq!(connector.messages().len(), 1);
        assert_eq!(connector.messages_on("alerts")[0]["alerts"], serde_json::json!([]));
        assert_eq!(AsyncConnector::stats(&connector).messages_sent, 1);
    }

    #[test]
    fn failing_sends_are_counted() {
        let mut connector = MemoryConnector::new();
        connector.set_failing(true);

        assert!(Connector::send(&mut connector, "alerts", b"{}").is_err());
        let stats = AsyncConnector::stats(&connector);
        assert_eq!(stats.messages_failed, 1);
        assert!(stats.last_error.is_some());
        assert!(connector.messages().is_empty());
    }
}
