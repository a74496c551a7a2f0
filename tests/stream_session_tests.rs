//! Session lifecycle against the simulated board

use imu_core::acquisition::{bounded, SessionState, StreamSession};
use imu_core::config::{DeviceSelection, FilterSettings};
use imu_core::hal::simulator::{DeviceCommand, SimulatedSensor, SimulatorConfig};
use imu_core::hal::{ConnectionParameters, Payload, SensorKind};
use imu_core::ImuError;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn connected(config: SimulatorConfig, filters: FilterSettings) -> (Arc<SimulatedSensor>, StreamSession) {
    let sensor = Arc::new(SimulatedSensor::new(config));
    let mut session = StreamSession::new(sensor.clone(), filters);
    session.connect(&ConnectionParameters::default()).unwrap();
    (sensor, session)
}

#[test]
fn test_connect_records_parameters() {
    let (sensor, session) = connected(SimulatorConfig::default(), FilterSettings::default());
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(sensor.connection_parameters(), Some(ConnectionParameters::default()));
    assert!(session.device().is_connected());
}

#[test]
fn test_refused_link() {
    let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig {
        fail_connect: true,
        ..SimulatorConfig::default()
    }));
    let mut session = StreamSession::new(sensor, FilterSettings::default());
    let err = session.connect(&ConnectionParameters::default()).unwrap_err();
    assert!(matches!(err, ImuError::ConnectionFailure { .. }));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_capabilities_follow_variant() {
    let (_sensor, session) = connected(SimulatorConfig::default(), FilterSettings::default());
    let accel = session.capabilities(SensorKind::Accelerometer).unwrap();
    assert_eq!(accel.model, "BMI160");
    assert_eq!(accel.frequency.len(), 12);

    let (_sensor, session) = connected(SimulatorConfig::bmi270(), FilterSettings::default());
    let gyro = session.capabilities(SensorKind::Gyroscope).unwrap();
    assert_eq!(gyro.model, "BMI270");
}

#[test]
fn test_configure_writes_both_sensors() {
    let (sensor, mut session) = connected(SimulatorConfig::default(), FilterSettings::default());
    session.configure(&DeviceSelection::default()).unwrap();
    assert_eq!(session.state(), SessionState::Configured);
    assert_eq!(sensor.config_writes(), 2);

    let kinds: Vec<_> = sensor
        .commands()
        .into_iter()
        .filter_map(|command| match command {
            DeviceCommand::WriteConfig { kind, .. } => Some(kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![SensorKind::Accelerometer, SensorKind::Gyroscope]);
}

#[test]
fn test_chain_build_times_out_on_lost_notification() {
    let filters = FilterSettings {
        stage_timeout_ms: 50,
        ..FilterSettings::default()
    };
    let (sensor, mut session) = connected(
        SimulatorConfig {
            drop_completions: true,
            ..SimulatorConfig::default()
        },
        filters,
    );
    session.configure(&DeviceSelection::default()).unwrap();
    let (tx, _rx) = bounded(8).unwrap();

    let started = Instant::now();
    let err = session.subscribe(SensorKind::Accelerometer, false, tx).unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(matches!(
        err,
        ImuError::ChainBuildTimeout { kind: SensorKind::Accelerometer, .. }
    ));
    assert_eq!(sensor.subscription_count(), 0);
    assert_eq!(session.state(), SessionState::Configured);
}

#[test]
fn test_rejected_stage_fails_subscription() {
    let (_sensor, mut session) = connected(
        SimulatorConfig {
            reject_processors: true,
            ..SimulatorConfig::default()
        },
        FilterSettings::default(),
    );
    session.configure(&DeviceSelection::default()).unwrap();
    let (tx, _rx) = bounded(8).unwrap();
    let err = session.subscribe(SensorKind::Gyroscope, false, tx).unwrap_err();
    assert!(matches!(err, ImuError::ChainStageRejected { kind: SensorKind::Gyroscope, .. }));
}

#[test]
fn test_double_subscribe_rejected() {
    let (_sensor, mut session) = connected(SimulatorConfig::default(), FilterSettings::default());
    session.configure(&DeviceSelection::default()).unwrap();
    let (tx, _rx) = bounded(8).unwrap();
    session.subscribe(SensorKind::Accelerometer, true, tx.clone()).unwrap();
    let err = session.subscribe(SensorKind::Accelerometer, true, tx).unwrap_err();
    assert!(matches!(err, ImuError::InvalidState { .. }));
}

#[test]
fn test_resubscribe_after_stop() {
    let (sensor, mut session) = connected(SimulatorConfig::default(), FilterSettings::default());
    session.configure(&DeviceSelection::default()).unwrap();
    for kind in SensorKind::ALL {
        let (tx, _rx) = bounded(64).unwrap();
        session.subscribe(kind, false, tx).unwrap();
    }
    session.start().unwrap();
    session.stop().unwrap();
    assert_eq!(sensor.subscription_count(), 0);

    let (tx, rx) = bounded(64).unwrap();
    session.subscribe(SensorKind::Accelerometer, true, tx).unwrap();
    assert!(session.is_raw(SensorKind::Accelerometer));
    assert_eq!(sensor.inject(SensorKind::Accelerometer, Payload::Vector([0.1, 0.2, 0.3])), 1);
    let sample = rx.pop_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(sample.payload, Payload::Vector([0.1, 0.2, 0.3]));
}

#[test]
fn test_start_while_streaming_rejected() {
    let (_sensor, mut session) = connected(SimulatorConfig::default(), FilterSettings::default());
    session.configure(&DeviceSelection::default()).unwrap();
    let mut receivers = Vec::new();
    for kind in SensorKind::ALL {
        let (tx, rx) = bounded(4096).unwrap();
        session.subscribe(kind, true, tx).unwrap();
        receivers.push(rx);
    }
    session.start().unwrap();
    assert!(matches!(session.start(), Err(ImuError::InvalidState { .. })));
    assert!(matches!(
        session.configure(&DeviceSelection::default()),
        Err(ImuError::InvalidState { .. })
    ));
    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
}
