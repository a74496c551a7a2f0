// src/error.rs
//! Unified error handling for IMU Core
//!
//! Every fallible operation in the crate returns [`ImuResult`]. Layer-specific
//! errors (transport, queue, configuration) convert into [`ImuError`] with `?`,
//! and [`ImuError::category`] exposes how a caller is expected to react.

use crate::acquisition::queue::QueueError;
use crate::config::loader::ConfigError;
use crate::hal::traits::TransportError;
use crate::hal::types::SensorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Unified error type for the ingestion pipeline and the offline aggregator
#[derive(Debug, Error)]
pub enum ImuError {
    /// The link to the wearable could not be established
    #[error("failed to connect to device {device}: {reason}")]
    ConnectionFailure { device: String, reason: String },

    /// The board reports a sensor variant the catalog does not know
    #[error("{kind} variant is not supported on this device")]
    UnsupportedDevice { kind: SensorKind },

    /// A configuration index outside the enumerated option set
    #[error("invalid {setting} option {index} (valid: 0..{available})")]
    InvalidOption {
        setting: String,
        index: usize,
        available: usize,
    },

    #[error("{kind} must be configured before subscribing")]
    NotConfigured { kind: SensorKind },

    #[error("cannot start streaming: {kind} is not subscribed")]
    NothingSubscribed { kind: SensorKind },

    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// No completion notification for a processor stage within the budget
    #[error("{stage} stage of the {kind} filter chain not created within {timeout:?}")]
    ChainBuildTimeout {
        kind: SensorKind,
        stage: &'static str,
        timeout: Duration,
    },

    #[error("{stage} stage of the {kind} filter chain was rejected by the device")]
    ChainStageRejected { kind: SensorKind, stage: &'static str },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed row {line} in {path}: {reason}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("{kind} channel has no samples")]
    EmptyChannel { kind: SensorKind },

    #[error("bin count mismatch: {accel} accelerometer bins vs {gyro} gyroscope bins")]
    BinMismatch { accel: usize, gyro: usize },

    #[error("data writer for {kind} is closed")]
    WriterClosed { kind: SensorKind },

    #[error("failed to spawn worker thread {name}: {source}")]
    WorkerSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// How callers are expected to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Session cannot start; surface immediately
    Fatal,
    /// Bad user or file configuration; re-prompt or abort set-up
    Configuration,
    /// Operations called out of order; fail fast
    Programming,
    /// Device refused or never answered a request
    Device,
    /// Queue or writer misuse during ingestion
    Pipeline,
    /// File reading or writing
    Storage,
    /// Offline aggregation input problems
    Analysis,
}

impl ImuError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImuError::ConnectionFailure { .. } => ErrorCategory::Fatal,
            ImuError::UnsupportedDevice { .. }
            | ImuError::InvalidOption { .. }
            | ImuError::Config(_) => ErrorCategory::Configuration,
            ImuError::NotConfigured { .. }
            | ImuError::NothingSubscribed { .. }
            | ImuError::InvalidState { .. } => ErrorCategory::Programming,
            ImuError::ChainBuildTimeout { .. }
            | ImuError::ChainStageRejected { .. }
            | ImuError::Transport(_) => ErrorCategory::Device,
            ImuError::Queue(_)
            | ImuError::WriterClosed { .. }
            | ImuError::WorkerSpawn { .. } => ErrorCategory::Pipeline,
            ImuError::Io { .. } | ImuError::Csv(_) => ErrorCategory::Storage,
            ImuError::MalformedRow { .. }
            | ImuError::EmptyChannel { .. }
            | ImuError::BinMismatch { .. } => ErrorCategory::Analysis,
        }
    }

    /// Whether the current session must be abandoned
    pub fn is_fatal(&self) -> bool {
        self.category() == ErrorCategory::Fatal
    }
}

/// Result type alias for IMU operations
pub type ImuResult<T> = Result<T, ImuError>;

/// Attach the offending path to I/O errors
pub trait IoResultExt<T> {
    fn with_path(self, path: &Path) -> ImuResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: &Path) -> ImuResult<T> {
        self.map_err(|source| ImuError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
