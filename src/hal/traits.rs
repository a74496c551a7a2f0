// src/hal/traits.rs
//! Core HAL traits for wearable sensor transports

use crate::hal::types::{
    ConnectionParameters, RawReading, SensorConfig, SensorKind, SignalHandle, StageRequest,
    VariantId,
};
use thiserror::Error;

/// Callback invoked on the transport's own delivery context for every reading
pub type SampleCallback = Box<dyn Fn(RawReading) + Send + Sync + 'static>;

/// One-shot completion for a processor creation request.
///
/// Receives `None` when the firmware refused to create the processor.
pub type ProcessorCompletion = Box<dyn FnOnce(Option<SignalHandle>) + Send + 'static>;

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("link unavailable: {0}")]
    LinkUnavailable(String),
    #[error("device is not connected")]
    NotConnected,
    #[error("unknown signal {0}")]
    UnknownSignal(SignalHandle),
    #[error("{kind} is not present on this board")]
    ModuleMissing { kind: SensorKind },
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Opaque transport to the wearable.
///
/// The wire protocol stays behind this trait; the core only needs to send
/// configuration, create processors, subscribe to signals and drive sampling.
/// Implementations use interior mutability because readings are delivered from
/// the transport's own event context while the session keeps issuing commands.
pub trait SensorTransport: Send + Sync {
    /// Open the link
    fn connect(&self) -> Result<(), TransportError>;

    /// Apply connection interval, latency and supervision timeout
    fn set_connection_parameters(&self, params: &ConnectionParameters) -> Result<(), TransportError>;

    /// Hardware variant of a module, `None` if the board lacks it
    fn lookup_variant(&self, kind: SensorKind) -> Option<VariantId>;

    /// Write sampling frequency and range for one sensor
    fn write_config(&self, kind: SensorKind, config: &SensorConfig) -> Result<(), TransportError>;

    /// Raw data signal of one sensor
    fn data_signal(&self, kind: SensorKind) -> Result<SignalHandle, TransportError>;

    /// Ask the firmware to create a processor fed by `source`.
    ///
    /// Returns once the request is queued; `completion` fires later, possibly on
    /// another thread, with the handle of the new processor's output.
    fn create_processor(
        &self,
        source: SignalHandle,
        request: StageRequest,
        completion: ProcessorCompletion,
    ) -> Result<(), TransportError>;

    /// Route readings of `signal` into `callback`
    fn subscribe(&self, signal: SignalHandle, callback: SampleCallback) -> Result<(), TransportError>;

    fn enable_sampling(&self, kind: SensorKind) -> Result<(), TransportError>;

    fn start(&self, kind: SensorKind) -> Result<(), TransportError>;

    fn stop(&self, kind: SensorKind) -> Result<(), TransportError>;

    fn disable_sampling(&self, kind: SensorKind) -> Result<(), TransportError>;

    /// Drop subscriptions and processors held by the firmware
    fn reset(&self) -> Result<(), TransportError>;

    fn disconnect(&self) -> Result<(), TransportError>;

    /// Human-readable device identifier (MAC address for BLE boards)
    fn address(&self) -> String;
}
