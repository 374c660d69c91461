//! Fusion cycle integration tests
//!
//! Drives the orchestrator through its feed and publisher seams and checks
//! what would go out on the wire.

mod common;

use std::{
    sync::{atomic::AtomicBool, mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

use seawatch_core::{
    geo::GeoPoint, BatchFeed, ChannelFeed, CycleOutput, FixedTime, FusionConfig,
    FusionOrchestrator, Publisher, Severity, SystemStatus,
};

use common::{ais, VesselPath, T0};

/// Publisher that keeps the serialized messages
#[derive(Clone, Default)]
struct WireRecorder {
    heartbeats: Arc<Mutex<Vec<serde_json::Value>>>,
    alerts: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl Publisher for WireRecorder {
    type Error = serde_json::Error;

    fn publish(&mut self, output: &CycleOutput) -> Result<(), Self::Error> {
        let heartbeat = serde_json::to_value(output.heartbeat())?;
        self.heartbeats.lock().unwrap().push(heartbeat);
        if let Some(alert) = output.alert() {
            self.alerts.lock().unwrap().push(serde_json::to_value(alert)?);
        }
        Ok(())
    }
}

fn confirmed_batch(vessel: &str, start: GeoPoint) -> Vec<seawatch_core::SensorObservation> {
    let path = VesselPath::new(start, T0, 10.0, 90.0);
    (0..4)
        .map(|i| {
            let ts = T0 + i * 10_000;
            let p = path.position_at(ts);
            ais(vessel, ts, p.latitude, p.longitude)
        })
        .collect()
}

#[test]
fn vessels_going_quiet_together_raise_interference_zone() {
    let config = FusionConfig::default();
    let stale_ms = config.stale_after_ms();
    let mut orchestrator = FusionOrchestrator::with_clock(config, FixedTime::new(0));

    let mut batch = Vec::new();
    batch.extend(confirmed_batch("V1", GeoPoint::new(55.00, 12.00)));
    batch.extend(confirmed_batch("V2", GeoPoint::new(55.01, 12.00)));
    batch.extend(confirmed_batch("V3", GeoPoint::new(55.00, 12.02)));
    batch.extend(confirmed_batch("V4", GeoPoint::new(57.00, 12.00)));

    let output = orchestrator.run_cycle(batch, T0 + 30_000);
    assert_eq!(output.stats.confirmed_tracks, 4);
    assert_eq!(output.status, SystemStatus::Ok);

    let output = orchestrator.run_cycle(Vec::new(), T0 + 30_000 + stale_ms + 1);
    assert_eq!(output.stats.stale_tracks, 4);
    assert_eq!(output.interference_zones.len(), 1);

    let zone = &output.interference_zones[0];
    assert_eq!(zone.event_count, 3);
    assert_eq!(zone.severity, Severity::Medium);
    assert!((zone.latitude - 55.0).abs() < 0.02);
    assert_eq!(output.status, SystemStatus::Degraded);

    let heartbeat = serde_json::to_value(output.heartbeat()).unwrap();
    assert_eq!(heartbeat["status"], "degraded");
    assert_eq!(heartbeat["interference_zones"][0]["severity"], "MEDIUM");
}

#[test]
fn heartbeat_every_cycle_alert_only_with_anomalies() {
    let mut orchestrator =
        FusionOrchestrator::with_clock(FusionConfig::default(), FixedTime::new(0));
    let mut feed = BatchFeed::new(vec![
        vec![ais("V1", T0, 10.0, 20.0)],
        Vec::new(),
        vec![ais("V1", T0 + 1_000, 10.5, 20.0)],
    ]);
    let mut publisher = WireRecorder::default();

    orchestrator.run(&mut feed, &mut publisher, &AtomicBool::new(false));

    // Three fed cycles plus the final flush
    let heartbeats = publisher.heartbeats.lock().unwrap();
    assert_eq!(heartbeats.len(), 4);
    assert_eq!(heartbeats[0]["fused_tracks"][0]["track_id"], "T0001");
    assert_eq!(heartbeats[0]["fused_tracks"][0]["status"], "TENTATIVE");
    assert_eq!(heartbeats[0]["timestamp"], "2024-05-01T12:00:00Z");

    let alerts = publisher.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["alerts"][0]["type"], "POSITION_JUMP");
    assert_eq!(alerts[0]["alerts"][0]["severity"], "HIGH");
    assert_eq!(alerts[0]["alerts"][0]["vessel_id"], "V1");
}

#[test]
fn channel_fed_loop_stops_when_senders_hang_up() {
    let (tx, rx) = mpsc::channel();
    let publisher = WireRecorder::default();
    let heartbeats = publisher.heartbeats.clone();

    let config = FusionConfig { cycle_interval_ms: 100, ..Default::default() };
    let worker = thread::spawn(move || {
        let mut orchestrator = FusionOrchestrator::with_clock(config, FixedTime::new(0));
        let mut feed = ChannelFeed::new(rx);
        let mut publisher = publisher;
        orchestrator.run(&mut feed, &mut publisher, &AtomicBool::new(false));
        orchestrator.manager().len()
    });

    for i in 0..5 {
        tx.send(ais("V1", T0 + i * 1_000, 10.0 + i as f64 * 1e-4, 20.0)).unwrap();
        thread::sleep(Duration::from_millis(5));
    }
    drop(tx);

    let tracks = worker.join().unwrap();
    assert_eq!(tracks, 1);

    let heartbeats = heartbeats.lock().unwrap();
    assert!(!heartbeats.is_empty());
    let last = heartbeats.last().unwrap();
    assert_eq!(last["fused_tracks"][0]["update_count"], 4);
}
