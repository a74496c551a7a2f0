// src/config/mod.rs
//! Configuration management

pub mod constants;
pub mod loader;

pub use loader::{ConfigError, ConfigLoader};

use crate::hal::types::ConnectionParameters;
use crate::processing::chain::ChainSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete system configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SystemConfig {
    #[serde(default)]
    pub device: DeviceSelection,
    #[serde(default)]
    pub connection: ConnectionParameters,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Resolved device configuration handed over by the set-up collaborator.
///
/// Indices refer to the option sets of the connected board's variants and are
/// only validated against the catalog once the board is identified.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeviceSelection {
    #[serde(default)]
    pub mac_address: String,

    #[serde(default = "defaults::acc_frequency")]
    pub acc_frequency: usize,

    #[serde(default = "defaults::acc_range")]
    pub acc_range: usize,

    #[serde(default = "defaults::gyro_frequency")]
    pub gyro_frequency: usize,

    #[serde(default = "defaults::gyro_range")]
    pub gyro_range: usize,

    /// Stream raw x/y/z instead of the firmware-filtered scalar
    #[serde(default)]
    pub raw_data: bool,
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self {
            mac_address: String::new(),
            acc_frequency: defaults::acc_frequency(),
            acc_range: defaults::acc_range(),
            gyro_frequency: defaults::gyro_frequency(),
            gyro_range: defaults::gyro_range(),
            raw_data: false,
        }
    }
}

/// Firmware filter chain parameters, independent per channel
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FilterSettings {
    #[serde(default = "ChainSpec::accelerometer")]
    pub accelerometer: ChainSpec,

    #[serde(default = "ChainSpec::gyroscope")]
    pub gyroscope: ChainSpec,

    #[serde(default = "defaults::chain_stage_timeout_ms")]
    pub stage_timeout_ms: u64,
}

impl FilterSettings {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            accelerometer: ChainSpec::accelerometer(),
            gyroscope: ChainSpec::gyroscope(),
            stage_timeout_ms: defaults::chain_stage_timeout_ms(),
        }
    }
}

/// Queue sizing and worker timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineSettings {
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "defaults::pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    #[serde(default = "defaults::idle_backoff_ms")]
    pub idle_backoff_ms: u64,

    #[serde(default = "defaults::drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    #[serde(default = "defaults::worker_join_timeout_ms")]
    pub worker_join_timeout_ms: u64,
}

impl PipelineSettings {
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn worker_join_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_join_timeout_ms)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::queue_capacity(),
            pop_timeout_ms: defaults::pop_timeout_ms(),
            idle_backoff_ms: defaults::idle_backoff_ms(),
            drain_timeout_ms: defaults::drain_timeout_ms(),
            worker_join_timeout_ms: defaults::worker_join_timeout_ms(),
        }
    }
}

/// Offline aggregation parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AggregationSettings {
    #[serde(default = "defaults::bins")]
    pub bins: usize,

    #[serde(default = "defaults::probe_count")]
    pub probe_count: usize,

    #[serde(default = "defaults::acc_event_threshold")]
    pub acc_event_threshold: f64,

    #[serde(default = "defaults::gyro_event_threshold")]
    pub gyro_event_threshold: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            bins: defaults::bins(),
            probe_count: defaults::probe_count(),
            acc_event_threshold: defaults::acc_event_threshold(),
            gyro_event_threshold: defaults::gyro_event_threshold(),
        }
    }
}

/// Where session files live
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageSettings {
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

impl SystemConfig {
    /// Check value ranges that the type system does not enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.pipeline.queue_capacity == 0 {
            problems.push("pipeline.queue_capacity must be greater than 0".to_string());
        }
        if self.pipeline.pop_timeout_ms == 0 {
            problems.push("pipeline.pop_timeout_ms must be greater than 0".to_string());
        }
        if self.aggregation.bins == 0 {
            problems.push("aggregation.bins must be greater than 0".to_string());
        }
        if self.aggregation.probe_count < 2 {
            problems.push("aggregation.probe_count must be at least 2".to_string());
        }
        for (name, threshold) in [
            ("aggregation.acc_event_threshold", self.aggregation.acc_event_threshold),
            ("aggregation.gyro_event_threshold", self.aggregation.gyro_event_threshold),
        ] {
            if !(threshold > 0.0) {
                problems.push(format!("{} must be positive", name));
            }
        }
        for (name, chain) in [
            ("filters.accelerometer", &self.filters.accelerometer),
            ("filters.gyroscope", &self.filters.gyroscope),
        ] {
            if chain.window == 0 {
                problems.push(format!("{}.window must be greater than 0", name));
            }
            if !(chain.threshold > 0.0) {
                problems.push(format!("{}.threshold must be positive", name));
            }
        }
        if self.connection.min_conn_interval_ms > self.connection.max_conn_interval_ms {
            problems.push("connection.min_conn_interval_ms exceeds max_conn_interval_ms".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn acc_frequency() -> usize { device::DEFAULT_ACC_FREQUENCY_INDEX }
    pub fn acc_range() -> usize { device::DEFAULT_ACC_RANGE_INDEX }
    pub fn gyro_frequency() -> usize { device::DEFAULT_GYRO_FREQUENCY_INDEX }
    pub fn gyro_range() -> usize { device::DEFAULT_GYRO_RANGE_INDEX }

    pub fn chain_stage_timeout_ms() -> u64 { hal::DEFAULT_CHAIN_STAGE_TIMEOUT_MS }

    pub fn queue_capacity() -> usize { pipeline::DEFAULT_QUEUE_CAPACITY }
    pub fn pop_timeout_ms() -> u64 { pipeline::DEFAULT_POP_TIMEOUT_MS }
    pub fn idle_backoff_ms() -> u64 { pipeline::DEFAULT_IDLE_BACKOFF_MS }
    pub fn drain_timeout_ms() -> u64 { pipeline::DEFAULT_DRAIN_TIMEOUT_MS }
    pub fn worker_join_timeout_ms() -> u64 { pipeline::DEFAULT_WORKER_JOIN_TIMEOUT_MS }

    pub fn bins() -> usize { aggregation::DEFAULT_BINS }
    pub fn probe_count() -> usize { aggregation::DEFAULT_PROBE_COUNT }
    pub fn acc_event_threshold() -> f64 { aggregation::DEFAULT_ACC_EVENT_THRESHOLD }
    pub fn gyro_event_threshold() -> f64 { aggregation::DEFAULT_GYRO_EVENT_THRESHOLD }

    pub fn data_dir() -> PathBuf { PathBuf::from(storage::DEFAULT_DATA_DIR) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::types::DeltaMode;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.queue_capacity, 25_000);
        assert_eq!(config.filters.accelerometer.window, 5);
        assert_eq!(config.filters.gyroscope.threshold, 3.0);
        assert_eq!(config.filters.gyroscope.mode, DeltaMode::Differential);
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let mut config = SystemConfig::default();
        config.pipeline.queue_capacity = 0;
        config.aggregation.bins = 0;
        config.filters.gyroscope.window = 0;

        match config.validate() {
            Err(ConfigError::Invalid(problems)) => {
                assert_eq!(problems.len(), 3);
                assert!(problems.iter().any(|p| p.contains("queue_capacity")));
                assert!(problems.iter().any(|p| p.contains("filters.gyroscope.window")));
            }
            other => panic!("Expected invalid configuration, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_durations() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.pop_timeout(), Duration::from_secs(1));
        assert_eq!(settings.idle_backoff(), Duration::from_secs(2));
        assert_eq!(settings.drain_timeout(), Duration::from_secs(5));
    }
}
