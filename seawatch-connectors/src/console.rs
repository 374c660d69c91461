//! Stdout connector
//!
//! Writes one `topic payload` line per message. Pair with `--replay` to turn a
//! recorded observation log into a log of fusion output.

use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

use crate::{AsyncConnector, ConnectionStats, ConnectorError};

/// Line-oriented connector over any async writer
pub struct ConsoleConnector<W = Stdout> {
    writer: W,
    stats: ConnectionStats,
}

impl ConsoleConnector<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleConnector<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, stats: ConnectionStats::default() }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send> AsyncConnector for ConsoleConnector<W> {
    type Error = ConnectorError;

    async fn send(&mut self, topic: &str, data: &[u8]) -> Result<(), Self::Error> {
        let mut line = Vec::with_capacity(topic.len() + data.len() + 2);
        line.extend_from_slice(topic.as_bytes());
        line.push(b' ');
        line.extend_from_slice(data);
        line.push(b'\n');

        match self.writer.write_all(&line).await {
            Ok(()) => {
                self.stats.record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.clone()
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.writer.flush().await?;
        Ok(())
    }
}
