//! Offline aggregation over session files on disk

use imu_core::analysis::{bin_events, detect_events, SessionAggregator, Stage};
use imu_core::config::AggregationSettings;
use imu_core::hal::{Payload, Sample, SensorKind};
use imu_core::session::SessionPaths;
use imu_core::ImuError;
use proptest::prelude::*;
use std::fmt::Write as _;

/// Processed-layout file with one row per `(time, value)`
fn write_processed(paths: &SessionPaths, kind: SensorKind, rows: &[(f64, f64)]) {
    let mut contents = format!("time,diff_rss_{}\n", kind.unit());
    for (time, value) in rows {
        writeln!(contents, "{:.3},{:.4}", time, value).unwrap();
    }
    std::fs::write(paths.path(kind), contents).unwrap();
}

fn aggregator(bins: usize) -> SessionAggregator {
    SessionAggregator::new(AggregationSettings {
        bins,
        ..AggregationSettings::default()
    })
    .unwrap()
}

#[test]
fn test_four_event_session() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SessionPaths::new(dir.path(), 3);
    paths.ensure_dirs().unwrap();

    // each 11.0 row crosses the accelerometer threshold on its own
    let mut accel: Vec<(f64, f64)> = (0..=50).map(|t| (t as f64, 0.0)).collect();
    for t in [5, 12, 19, 47] {
        accel[t].1 = 11.0;
    }
    let gyro: Vec<(f64, f64)> = (0..=50).map(|t| (t as f64, 150.0)).collect();
    write_processed(&paths, SensorKind::Accelerometer, &accel);
    write_processed(&paths, SensorKind::Gyroscope, &gyro);

    let summary = aggregator(2).aggregate_files(&paths).unwrap();
    assert_eq!(summary.accelerometer.events, 4);
    assert_eq!(summary.accelerometer.counts(), vec![280, 620]);
    assert_eq!(summary.gyroscope.events, 51);
    assert_eq!(summary.gyroscope.counts(), vec![500, 500]);
    assert_eq!(summary.stages, vec![Stage::Awake, Stage::Awake]);

    let chart = summary.render();
    let lines: Vec<_> = chart.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "awake:        ||||");
    assert_eq!(lines[3], "deep sleep:       ");
}

#[test]
fn test_raw_files_use_magnitude() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SessionPaths::new(dir.path(), 4);
    paths.ensure_dirs().unwrap();

    let mut acc = String::from("timestamp,x_(g/s),y_(g/s),z_(g/s)\n");
    let mut gyro = String::from("timestamp,x_(rad/s),y_(rad/s),z_(rad/s)\n");
    for t in 0..10 {
        writeln!(acc, "{}.000,3.0000,4.0000,0.0000", t).unwrap();
        writeln!(gyro, "{}.000,60.0000,80.0000,0.0000", t).unwrap();
    }
    std::fs::write(paths.path(SensorKind::Accelerometer), acc).unwrap();
    std::fs::write(paths.path(SensorKind::Gyroscope), gyro).unwrap();

    let summary = aggregator(3).aggregate_files(&paths).unwrap();
    // |(3,4,0)| = 5, so every third row pushes the sum past 10
    assert_eq!(summary.accelerometer.events, 3);
    // |(60,80,0)| = 100, an event needs the sum to exceed 100
    assert_eq!(summary.gyroscope.events, 5);
    assert_eq!(summary.stages.len(), 3);
}

#[test]
fn test_missing_gyroscope_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SessionPaths::new(dir.path(), 5);
    paths.ensure_dirs().unwrap();
    write_processed(&paths, SensorKind::Accelerometer, &[(0.0, 1.0), (1.0, 1.0)]);

    let err = aggregator(2).aggregate_files(&paths).unwrap_err();
    assert!(matches!(err, ImuError::Csv(_)));
}

#[test]
fn test_header_only_file_is_empty_channel() {
    let dir = tempfile::tempdir().unwrap();
    let paths = SessionPaths::new(dir.path(), 6);
    paths.ensure_dirs().unwrap();
    write_processed(&paths, SensorKind::Accelerometer, &[]);
    write_processed(&paths, SensorKind::Gyroscope, &[(0.0, 1.0)]);

    let err = aggregator(2).aggregate_files(&paths).unwrap_err();
    assert!(matches!(err, ImuError::EmptyChannel { kind: SensorKind::Accelerometer }));
}

fn samples(values: &[f64]) -> Vec<Sample> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| Sample {
            timestamp: i as f64,
            payload: Payload::Scalar(value),
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_bins_always_match_request(
        values in proptest::collection::vec(0.0f64..50.0, 1..200),
        bins in 1usize..40,
    ) {
        let events = detect_events(&samples(&values), 10.0);
        let last = (values.len() - 1) as f64;
        let binned = bin_events(&events, 0.0, last, bins, 1000);
        prop_assert_eq!(binned.len(), bins);
        prop_assert!(binned.iter().map(|bin| bin.count).sum::<u32>() <= 1000);
    }

    #[test]
    fn prop_events_are_ordered(values in proptest::collection::vec(-20.0f64..20.0, 0..300)) {
        let events = detect_events(&samples(&values), 10.0);
        prop_assert!(events.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert!(events.len() <= values.len());
    }
}
