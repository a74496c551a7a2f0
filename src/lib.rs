//! IMU-Core: wearable IMU ingestion and offline sleep-stage aggregation
//!
//! This library streams triaxial accelerometer and gyroscope data from a
//! wearable into per-channel CSV files and turns finished sessions into sleep
//! stages. It features:
//!
//! - Capability catalog resolving user indices into device settings
//! - On-device filter chain construction with bounded completion waits
//! - Bounded, closable queues with dedicated writer threads per channel
//! - Bounded-time shutdown with a per-channel drain report
//! - Event detection, binning and Deep / Light / Awake classification
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imu_core::acquisition::{IngestionPipeline, ShutdownCoordinator, StreamSession};
//! use imu_core::config::SystemConfig;
//! use imu_core::hal::{SensorKind, SimulatedSensor, SimulatorConfig};
//! use imu_core::session::SessionPaths;
//! use imu_core::utils::SystemTimeProvider;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SystemConfig::default();
//!     let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig::default()));
//!     let mut session = StreamSession::new(sensor, config.filters.clone());
//!     session.connect(&config.connection)?;
//!     session.configure(&config.device)?;
//!
//!     let paths = SessionPaths::new(&config.storage.data_dir, 1);
//!     let pipeline = IngestionPipeline::open(&paths, false, &config.pipeline, Arc::new(SystemTimeProvider))?;
//!     for kind in SensorKind::ALL {
//!         session.subscribe(kind, false, pipeline.sink(kind))?;
//!     }
//!     session.start()?;
//!     std::thread::sleep(std::time::Duration::from_secs(10));
//!
//!     let report = ShutdownCoordinator::from_settings(&config.pipeline).shutdown(&mut session, pipeline);
//!     println!("{:?}", report);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod session;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{IngestionPipeline, ShutdownCoordinator, ShutdownReport, StreamSession};
pub use analysis::{SessionAggregator, SessionSummary, Stage};
pub use config::{ConfigLoader, SystemConfig};
pub use error::{ErrorCategory, ImuError, ImuResult};
pub use hal::{Payload, Sample, SensorKind, SensorTransport};
pub use session::{SessionPaths, SessionRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Wearable IMU ingestion pipeline and offline sleep-stage aggregation".to_string(),
        features: vec![
            "Capability catalog".to_string(),
            "Firmware filter chains".to_string(),
            "Backpressured CSV ingestion".to_string(),
            "Bounded-time shutdown".to_string(),
            "Sleep-stage aggregation".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
