//! Property tests for the track filter
//!
//! Random report sequences (sources, gaps, positions, kinematics) must keep
//! the covariance symmetric and positive semi-definite, and rejected
//! reports must never change the filter.

use proptest::prelude::*;
use seawatch_core::{
    fusion::{
        matrix::{is_positive_semidefinite, is_symmetric},
        ConstantVelocityModel, SourceNoise, TrackFilter,
    },
    FusionError, SensorObservation, SensorSource,
};

const T0: u64 = 1_714_564_800_000;

#[derive(Debug, Clone)]
struct Report {
    source: SensorSource,
    gap_ms: u64,
    north_m: f64,
    east_m: f64,
    kinematics: Option<(f64, f64)>,
    uncertainty_m: Option<f64>,
}

fn source() -> impl Strategy<Value = SensorSource> {
    prop_oneof![
        Just(SensorSource::Ais),
        Just(SensorSource::Radar),
        Just(SensorSource::Gnss),
    ]
}

fn report() -> impl Strategy<Value = Report> {
    (
        source(),
        1u64..600_000,
        -5_000.0f64..5_000.0,
        -5_000.0f64..5_000.0,
        proptest::option::of((0.0f64..40.0, 0.0f64..360.0)),
        proptest::option::of(0.5f64..500.0),
    )
        .prop_map(|(source, gap_ms, north_m, east_m, kinematics, uncertainty_m)| Report {
            source,
            gap_ms,
            north_m,
            east_m,
            kinematics,
            uncertainty_m,
        })
}

fn to_observation(report: &Report, ts: u64) -> SensorObservation {
    // About 111 km per degree of latitude; good enough for test offsets
    let lat = 55.0 + report.north_m / 111_000.0;
    let lon = 12.0 + report.east_m / 64_000.0;
    let mut obs = SensorObservation::new(report.source, ts, lat, lon);
    if let Some((speed, course)) = report.kinematics {
        obs = obs.with_kinematics(speed, course);
    }
    if let Some(sigma) = report.uncertainty_m {
        obs = obs.with_uncertainty(sigma);
    }
    obs
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn covariance_stays_symmetric_psd(
        first in report(),
        rest in proptest::collection::vec(report(), 1..40),
        accel in 0.0f64..2.0,
    ) {
        let noise = SourceNoise::default();
        let mut ts = T0;
        let mut filter = TrackFilter::initialize(
            &to_observation(&first, ts),
            &noise,
            ConstantVelocityModel::new(accel),
        );

        for report in &rest {
            ts += report.gap_ms;
            let innovation = filter.update(&to_observation(report, ts), &noise);
            prop_assert!(innovation.is_ok());

            let p = filter.covariance();
            prop_assert!(is_symmetric(p, 1e-9), "asymmetric covariance: {:?}", p);
            prop_assert!(is_positive_semidefinite(p), "covariance not PSD: {:?}", p);
            prop_assert!(filter.position_std().is_finite());
        }
    }

    #[test]
    fn rejected_update_changes_nothing(
        first in report(),
        second in report(),
        back_ms in 0u64..10_000,
    ) {
        let noise = SourceNoise::default();
        let mut filter = TrackFilter::initialize(
            &to_observation(&first, T0),
            &noise,
            ConstantVelocityModel::default(),
        );
        filter.update(&to_observation(&second, T0 + second.gap_ms), &noise).unwrap();
        let before = filter.clone();

        let stale_ts = T0 + second.gap_ms - back_ms.min(second.gap_ms);
        let result = filter.update(&to_observation(&first, stale_ts), &noise);

        prop_assert!(
            matches!(result, Err(FusionError::InvalidTimestep { .. })),
            "expected InvalidTimestep, got {:?}",
            result
        );
        prop_assert_eq!(filter, before);
    }

    #[test]
    fn mahalanobis_is_non_negative(
        first in report(),
        second in report(),
    ) {
        let noise = SourceNoise::default();
        let mut filter = TrackFilter::initialize(
            &to_observation(&first, T0),
            &noise,
            ConstantVelocityModel::default(),
        );
        let innovation = filter
            .update(&to_observation(&second, T0 + second.gap_ms), &noise)
            .unwrap();

        prop_assert!(innovation.mahalanobis_squared() >= 0.0);
        prop_assert!(innovation.distance_m() >= 0.0);
    }
}
