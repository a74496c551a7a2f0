// src/hal/mod.rs
//! Hardware abstraction layer for wearable IMU boards

pub mod catalog;
pub mod device;
pub mod simulator;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use catalog::{options_for, Capability, OptionEntry, OptionSet};
pub use device::{DeviceHandle, DeviceIdentity};
pub use simulator::{SimulatedSensor, SimulatorConfig};
pub use traits::*;
pub use types::*;
