//! Tokio fusion service
//!
//! Runs the fusion cycle on an interval timer and publishes through an
//! `AsyncConnector`:
//!
//! ```text
//!  mpsc::Receiver<SensorObservation> ──▶ pending ─┐
//!  interval tick ─────────────────────────────────┼─▶ orchestrator.tick ─▶ connector
//!  shutdown future ───────────────────────────────┘        (final snapshot, disconnect)
//! ```
//!
//! Observations that arrive between ticks wait in `pending` and go into the
//! next cycle together. The service stops when the shutdown future resolves
//! or every sender is dropped; either way it publishes one last snapshot
//! and disconnects.

use std::future::Future;

use log::{debug, info, warn};
use seawatch_core::{
    CycleOutput, FusionConfig, FusionOrchestrator, SensorObservation, SystemTime, TimeSource,
};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};

use crate::{AsyncConnector, Topics};

/// Counters kept across the service's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
    /// Fusion cycles completed
    pub cycles: u64,
    /// Observations received from the channel
    pub observations: u64,
    /// Messages the transport accepted
    pub messages_published: u64,
    /// Messages the transport rejected
    pub publish_failures: u64,
}

/// Fusion loop bound to one transport
pub struct FusionService<C, T: TimeSource = SystemTime> {
    orchestrator: FusionOrchestrator<T>,
    connector: C,
    topics: Topics,
    report: ServiceReport,
}

impl<C: AsyncConnector> FusionService<C, SystemTime> {
    /// Service on the system clock
    pub fn new(config: FusionConfig, connector: C, topics: Topics) -> Self {
        Self::with_orchestrator(FusionOrchestrator::new(config), connector, topics)
    }
}

impl<C: AsyncConnector, T: TimeSource + Send> FusionService<C, T> {
    /// Service around a prepared orchestrator, e.g. with a simulated clock
    pub fn with_orchestrator(orchestrator: FusionOrchestrator<T>, connector: C, topics: Topics) -> Self {
        Self { orchestrator, connector, topics, report: ServiceReport::default() }
    }

    /// Orchestrator, for inspecting the live track set
    pub fn orchestrator(&self) -> &FusionOrchestrator<T> {
        &self.orchestrator
    }

    /// Underlying transport
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run until `shutdown` resolves or the observation channel closes
    pub async fn run<S>(
        mut self,
        mut observations: mpsc::Receiver<SensorObservation>,
        shutdown: S,
    ) -> ServiceReport
    where
        S: Future<Output = ()>,
    {
        let mut ticker = interval(self.orchestrator.config().cycle_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately
        ticker.tick().await;

        tokio::pin!(shutdown);
        let mut pending = Vec::new();

        info!(
            "fusion service started, publishing to {} and {}",
            self.topics.heartbeat, self.topics.alerts
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                received = observations.recv() => match received {
                    Some(observation) => pending.push(observation),
                    None => {
                        info!("observation channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let batch = std::mem::take(&mut pending);
                    self.cycle(batch).await;
                }
            }
        }

        // Anything already queued belongs to the in-flight cycle
        while let Ok(observation) = observations.try_recv() {
            pending.push(observation);
        }
        self.cycle(pending).await;

        if let Err(e) = self.connector.disconnect().await {
            warn!("disconnect failed: {}", e);
        }
        info!(
            "fusion service stopped after {} cycles ({} observations)",
            self.report.cycles, self.report.observations
        );
        self.report
    }

    async fn cycle(&mut self, batch: Vec<SensorObservation>) {
        self.report.observations += batch.len() as u64;
        let output = self.orchestrator.tick(batch);
        self.report.cycles += 1;
        self.publish(&output).await;
    }

    async fn publish(&mut self, output: &CycleOutput) {
        let messages = match self.topics.encode(output) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("cannot encode cycle {}: {}", output.stats.cycle, e);
                self.report.publish_failures += 1;
                return;
            }
        };

        for (topic, payload) in messages {
            match self.connector.send(topic, &payload).await {
                Ok(()) => {
                    self.report.messages_published += 1;
                    debug!("published {} bytes to {}", payload.len(), topic);
                }
                Err(e) => {
                    // Dropped; the next cycle publishes a fresh snapshot
                    self.report.publish_failures += 1;
                    warn!("publish to {} failed in cycle {}: {}", topic, output.stats.cycle, e);
                }
            }
        }
    }
}
