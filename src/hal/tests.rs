// src/hal/tests.rs
//! Unit tests for HAL types

use crate::hal::types::*;

#[test]
fn test_payload_slices() {
    let scalar = Payload::Scalar(-0.25);
    assert_eq!(scalar.as_slice(), &[-0.25]);

    let vector = Payload::Vector([0.1, 0.2, 0.3]);
    assert_eq!(vector.as_slice(), &[0.1, 0.2, 0.3]);
}

#[test]
fn test_payload_magnitude() {
    assert_eq!(Payload::Scalar(-12.5).magnitude(), 12.5);
    assert_eq!(Payload::Vector([2.0, 3.0, 6.0]).magnitude(), 7.0);
}

#[test]
fn test_sample_keeps_device_epoch() {
    let reading = RawReading {
        epoch: 1_700_000_000.5,
        value: Payload::Scalar(0.02),
    };
    let sample = Sample::from(reading);
    assert_eq!(sample.timestamp, 1_700_000_000.5);
    assert_eq!(sample.payload, Payload::Scalar(0.02));
}

#[test]
fn test_sensor_kind_names() {
    assert_eq!(SensorKind::Accelerometer.short_name(), "acc");
    assert_eq!(SensorKind::Gyroscope.short_name(), "gyro");
    assert_eq!(SensorKind::Gyroscope.unit(), "(rad/s)");
    assert_eq!(SensorKind::Accelerometer.to_string(), "accelerometer");
}

#[test]
fn test_connection_parameter_defaults() {
    let params = ConnectionParameters::default();
    assert_eq!(params.min_conn_interval_ms, 7.5);
    assert_eq!(params.max_conn_interval_ms, 7.5);
    assert_eq!(params.latency, 0);
    assert_eq!(params.supervision_timeout_ms, 6000);
}

#[test]
fn test_stage_names() {
    assert_eq!(StageRequest::Rss.name(), "rss");
    assert_eq!(StageRequest::MovingAverage { window: 5 }.name(), "moving_average");
    assert_eq!(
        StageRequest::Delta {
            threshold: 0.01,
            mode: DeltaMode::Absolute
        }
        .name(),
        "delta"
    );
    assert_eq!(SignalHandle(7).to_string(), "signal#7");
}
