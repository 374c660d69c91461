// Benchmark for ingest and full fusion cycles
// Run with: cargo bench --bench fusion_cycle

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seawatch_core::{
    FixedTime, FusionConfig, FusionOrchestrator, SensorObservation, SensorSource, TrackManager,
};

const T0: u64 = 1_714_564_800_000;

/// One report per vessel per second, vessels spread on a 0.1° grid
fn traffic(vessels: usize, seconds: u64) -> Vec<SensorObservation> {
    let mut reports = Vec::with_capacity(vessels * seconds as usize);
    for s in 0..seconds {
        for v in 0..vessels {
            let lat = 55.0 + (v / 32) as f64 * 0.1 + s as f64 * 2e-5;
            let lon = 12.0 + (v % 32) as f64 * 0.1;
            reports.push(
                SensorObservation::new(SensorSource::Ais, T0 + s * 1_000, lat, lon)
                    .with_vessel_id(format!("V{}", v))
                    .with_kinematics(8.0, 0.0),
            );
        }
    }
    reports
}

fn benchmark_ingest(c: &mut Criterion) {
    let reports = traffic(1, 100);
    c.bench_function("ingest_single_vessel_100", |b| {
        b.iter(|| {
            let mut manager = TrackManager::new(FusionConfig::default());
            for report in &reports {
                let _ = black_box(manager.ingest(report.clone()));
            }
        });
    });
}

fn benchmark_anonymous_gating(c: &mut Criterion) {
    let mut group = c.benchmark_group("gating_track_count");

    for vessels in [10usize, 100, 500].iter() {
        let mut manager = TrackManager::new(FusionConfig::default());
        for report in traffic(*vessels, 1) {
            let _ = manager.ingest(report);
        }
        let plot = SensorObservation::new(SensorSource::Radar, T0 + 1_000, 55.0001, 12.0);

        group.bench_with_input(BenchmarkId::from_parameter(vessels), vessels, |b, _| {
            b.iter_batched(
                || (manager.clone(), plot.clone()),
                |(mut manager, plot)| black_box(manager.ingest(plot)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_vessel_count");

    for vessels in [10usize, 100].iter() {
        let reports = traffic(*vessels, 10);
        group.bench_with_input(BenchmarkId::from_parameter(vessels), vessels, |b, _| {
            b.iter(|| {
                let mut orchestrator =
                    FusionOrchestrator::with_clock(FusionConfig::default(), FixedTime::new(0));
                black_box(orchestrator.run_cycle(reports.clone(), T0 + 10_000))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_ingest, benchmark_anonymous_gating, benchmark_cycle);
criterion_main!(benches);
