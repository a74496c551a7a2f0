// src/hal/device.rs
//! Connected-board handle: link state, identified variants, configuration gates

use crate::error::{ImuError, ImuResult};
use crate::hal::catalog::{self, Capability};
use crate::hal::traits::SensorTransport;
use crate::hal::types::{ConnectionParameters, SensorConfig, SensorKind, SignalHandle, VariantId};
use std::sync::Arc;

/// Sensor variants reported by the board at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    pub accelerometer: Option<VariantId>,
    pub gyroscope: Option<VariantId>,
}

impl DeviceIdentity {
    pub fn variant(&self, kind: SensorKind) -> Option<VariantId> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Gyroscope => self.gyroscope,
        }
    }
}

/// Handle to one wearable behind a transport
pub struct DeviceHandle {
    transport: Arc<dyn SensorTransport>,
    identity: Option<DeviceIdentity>,
    configured: [bool; 2],
}

fn slot(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Accelerometer => 0,
        SensorKind::Gyroscope => 1,
    }
}

impl DeviceHandle {
    pub fn new(transport: Arc<dyn SensorTransport>) -> Self {
        Self {
            transport,
            identity: None,
            configured: [false; 2],
        }
    }

    /// Open the link, apply connection parameters and identify the modules
    pub fn connect(&mut self, params: &ConnectionParameters) -> ImuResult<DeviceIdentity> {
        let address = self.transport.address();
        let failure = |reason: String| ImuError::ConnectionFailure {
            device: address.clone(),
            reason,
        };

        self.transport.connect().map_err(|e| failure(e.to_string()))?;
        self.transport
            .set_connection_parameters(params)
            .map_err(|e| failure(e.to_string()))?;

        let identity = DeviceIdentity {
            accelerometer: self.transport.lookup_variant(SensorKind::Accelerometer),
            gyroscope: self.transport.lookup_variant(SensorKind::Gyroscope),
        };
        tracing::info!(
            device = %address,
            accelerometer = ?identity.accelerometer,
            gyroscope = ?identity.gyroscope,
            "connected"
        );
        self.identity = Some(identity);
        self.configured = [false; 2];
        Ok(identity)
    }

    pub fn is_connected(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
    }

    pub fn address(&self) -> String {
        self.transport.address()
    }

    /// Catalog entry for the connected board's variant of `kind`
    pub fn capability(&self, kind: SensorKind) -> ImuResult<Capability> {
        let identity = self.identity.ok_or(ImuError::InvalidState {
            operation: "query capabilities",
            state: "disconnected",
        })?;
        identity
            .variant(kind)
            .and_then(|variant| catalog::options_for(kind, variant))
            .ok_or(ImuError::UnsupportedDevice { kind })
    }

    /// Write one already-resolved configuration
    pub fn write_config(&mut self, kind: SensorKind, config: &SensorConfig) -> ImuResult<()> {
        self.transport.write_config(kind, config)?;
        self.configured[slot(kind)] = true;
        tracing::debug!(%kind, ?config, "configuration written");
        Ok(())
    }

    pub fn is_configured(&self, kind: SensorKind) -> bool {
        self.configured[slot(kind)]
    }

    /// Raw data signal of a configured sensor
    pub fn signal(&self, kind: SensorKind) -> ImuResult<SignalHandle> {
        if !self.is_configured(kind) {
            return Err(ImuError::NotConfigured { kind });
        }
        Ok(self.transport.data_signal(kind)?)
    }

    pub fn transport(&self) -> &dyn SensorTransport {
        self.transport.as_ref()
    }

    /// Reset the board and drop the link
    pub fn disconnect(&mut self) -> ImuResult<()> {
        if self.identity.take().is_none() {
            return Ok(());
        }
        self.configured = [false; 2];
        let reset = self.transport.reset();
        self.transport.disconnect()?;
        reset?;
        tracing::info!(device = %self.transport.address(), "disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::catalog::variants;
    use crate::hal::simulator::{SimulatedSensor, SimulatorConfig};

    #[test]
    fn test_connect_identifies_modules() {
        let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig::default()));
        let mut device = DeviceHandle::new(sensor.clone());

        let identity = device.connect(&ConnectionParameters::default()).unwrap();
        assert_eq!(identity.accelerometer, Some(variants::ACC_BMI160));
        assert_eq!(identity.gyroscope, Some(variants::GYRO_BMI160));
        assert_eq!(sensor.connection_parameters(), Some(ConnectionParameters::default()));
        assert_eq!(device.capability(SensorKind::Gyroscope).unwrap().model, "BMI160");
    }

    #[test]
    fn test_connection_failure() {
        let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig {
            fail_connect: true,
            ..SimulatorConfig::default()
        }));
        let mut device = DeviceHandle::new(sensor);
        let err = device.connect(&ConnectionParameters::default()).unwrap_err();
        assert!(err.is_fatal());
        assert!(!device.is_connected());
    }

    #[test]
    fn test_missing_module_is_unsupported() {
        let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig {
            gyro_variant: None,
            ..SimulatorConfig::default()
        }));
        let mut device = DeviceHandle::new(sensor);
        device.connect(&ConnectionParameters::default()).unwrap();
        assert!(matches!(
            device.capability(SensorKind::Gyroscope),
            Err(ImuError::UnsupportedDevice { kind: SensorKind::Gyroscope })
        ));
    }

    #[test]
    fn test_signal_requires_configuration() {
        let sensor = Arc::new(SimulatedSensor::new(SimulatorConfig::default()));
        let mut device = DeviceHandle::new(sensor);
        device.connect(&ConnectionParameters::default()).unwrap();
        assert!(matches!(
            device.signal(SensorKind::Accelerometer),
            Err(ImuError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_capability_before_connect() {
        let device = DeviceHandle::new(Arc::new(SimulatedSensor::new(SimulatorConfig::default())));
        assert!(matches!(
            device.capability(SensorKind::Accelerometer),
            Err(ImuError::InvalidState { .. })
        ));
    }
}
