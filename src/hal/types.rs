// src/hal/types.rs
//! Core types for wearable IMU device abstraction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor channel carried by the wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl SensorKind {
    /// Both channels, accelerometer first
    pub const ALL: [SensorKind; 2] = [SensorKind::Accelerometer, SensorKind::Gyroscope];

    /// Unit suffix used in CSV headers
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "(g/s)",
            SensorKind::Gyroscope => "(rad/s)",
        }
    }

    /// Short name used for file names and thread names
    pub fn short_name(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "acc",
            SensorKind::Gyroscope => "gyro",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Accelerometer => write!(f, "accelerometer"),
            SensorKind::Gyroscope => write!(f, "gyroscope"),
        }
    }
}

/// Opaque hardware-variant identifier reported by the board for one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantId(pub u8);

/// Opaque handle to a device-side signal (raw data signal or processor output)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalHandle(pub u64);

impl fmt::Display for SignalHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// Sample payload: one thresholded scalar (processed) or an x/y/z triple (raw)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    Scalar(f64),
    Vector([f64; 3]),
}

impl Payload {
    /// Components in write order
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Payload::Scalar(value) => std::slice::from_ref(value),
            Payload::Vector(values) => values,
        }
    }

    /// Absolute magnitude: `|v|` for scalars, Euclidean norm for triples
    pub fn magnitude(&self) -> f64 {
        match self {
            Payload::Scalar(value) => value.abs(),
            Payload::Vector([x, y, z]) => (x * x + y * y + z * z).sqrt(),
        }
    }
}

/// Reading as handed to a subscription callback by the transport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// Device epoch in seconds since the Unix epoch
    pub epoch: f64,
    pub value: Payload,
}

/// Application-visible sample, produced exactly once per device callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub payload: Payload,
}

impl From<RawReading> for Sample {
    fn from(reading: RawReading) -> Self {
        Self {
            timestamp: reading.epoch,
            payload: reading.value,
        }
    }
}

/// BLE connection parameters applied right after the link comes up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    #[serde(default = "defaults::min_conn_interval_ms")]
    pub min_conn_interval_ms: f32,

    #[serde(default = "defaults::max_conn_interval_ms")]
    pub max_conn_interval_ms: f32,

    /// Consecutive connection events the peripheral may skip
    #[serde(default = "defaults::latency")]
    pub latency: u16,

    #[serde(default = "defaults::supervision_timeout_ms")]
    pub supervision_timeout_ms: u16,
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            min_conn_interval_ms: defaults::min_conn_interval_ms(),
            max_conn_interval_ms: defaults::max_conn_interval_ms(),
            latency: defaults::latency(),
            supervision_timeout_ms: defaults::supervision_timeout_ms(),
        }
    }
}

mod defaults {
    use crate::config::constants::hal::*;

    pub fn min_conn_interval_ms() -> f32 { DEFAULT_MIN_CONN_INTERVAL_MS }
    pub fn max_conn_interval_ms() -> f32 { DEFAULT_MAX_CONN_INTERVAL_MS }
    pub fn latency() -> u16 { DEFAULT_CONN_LATENCY }
    pub fn supervision_timeout_ms() -> u16 { DEFAULT_SUPERVISION_TIMEOUT_MS }
}

/// Output mode of the firmware delta processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMode {
    /// Emit the difference to the last emitted value
    Differential,
    /// Emit the input value itself
    Absolute,
}

/// One firmware processing-stage creation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageRequest {
    Rss,
    MovingAverage { window: u8 },
    Delta { threshold: f32, mode: DeltaMode },
}

impl StageRequest {
    pub fn name(&self) -> &'static str {
        match self {
            StageRequest::Rss => "rss",
            StageRequest::MovingAverage { .. } => "moving_average",
            StageRequest::Delta { .. } => "delta",
        }
    }
}

/// Value written to the device for one configuration register
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    /// Physical value (Hz, g) that the firmware maps to the nearest setting
    Physical(f32),
    /// Raw register code for boards that take enum codes
    Code(u8),
}

/// Resolved sampling configuration for one sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub frequency: ConfigValue,
    pub range: ConfigValue,
}
