// src/hal/catalog.rs
//! Capability catalog: hardware variant -> valid sampling options
//!
//! Each supported board variant maps to one [`Capability`] entry holding the
//! frequency and range option sets and the way those options are encoded when
//! written to the device. Lookups happen once per connection; there is no
//! per-model branching anywhere else in the crate.

use crate::error::{ImuError, ImuResult};
use crate::hal::types::{ConfigValue, SensorConfig, SensorKind, VariantId};
use std::fmt;

/// Board variant identifiers as reported by module lookup
pub mod variants {
    use crate::hal::types::VariantId;

    pub const ACC_MMA8452Q: VariantId = VariantId(0);
    pub const ACC_BMI160: VariantId = VariantId(1);
    pub const ACC_BMA255: VariantId = VariantId(3);
    pub const ACC_BMI270: VariantId = VariantId(4);

    pub const GYRO_BMI160: VariantId = VariantId(0);
    pub const GYRO_BMI270: VariantId = VariantId(1);
}

/// One selectable option
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionEntry {
    /// Physical value in Hz, g or degrees per second
    pub value: f32,
    pub label: &'static str,
    /// Register code understood by boards taking enum codes
    pub code: u8,
}

/// Ordered set of options; valid indices are exactly `0..len()`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionSet {
    name: &'static str,
    entries: &'static [OptionEntry],
}

impl OptionSet {
    const fn new(name: &'static str, entries: &'static [OptionEntry]) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &OptionEntry)> {
        self.entries.iter().enumerate()
    }

    /// Resolve a user-supplied index; the only gate before a device write
    pub fn resolve(&self, index: usize) -> ImuResult<&OptionEntry> {
        self.entries.get(index).ok_or_else(|| ImuError::InvalidOption {
            setting: self.name.to_string(),
            index,
            available: self.entries.len(),
        })
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.iter() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", index, entry.label)?;
        }
        Ok(())
    }
}

/// How resolved options are written to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEncoding {
    Physical,
    RegisterCode,
}

/// Capability entry for one sensor variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capability {
    pub kind: SensorKind,
    pub variant: VariantId,
    pub model: &'static str,
    pub frequency: OptionSet,
    pub range: OptionSet,
    pub encoding: ConfigEncoding,
}

impl Capability {
    /// Resolve both indices into the value written to the device
    pub fn sensor_config(&self, frequency_index: usize, range_index: usize) -> ImuResult<SensorConfig> {
        let frequency = self.frequency.resolve(frequency_index)?;
        let range = self.range.resolve(range_index)?;
        Ok(SensorConfig {
            frequency: self.encode(frequency),
            range: self.encode(range),
        })
    }

    fn encode(&self, entry: &OptionEntry) -> ConfigValue {
        match self.encoding {
            ConfigEncoding::Physical => ConfigValue::Physical(entry.value),
            ConfigEncoding::RegisterCode => ConfigValue::Code(entry.code),
        }
    }
}

macro_rules! options {
    ($(($value:expr, $label:expr, $code:expr)),* $(,)?) => {
        &[$(OptionEntry { value: $value, label: $label, code: $code }),*]
    };
}

const BOSCH_ACC_ODR: &[OptionEntry] = options![
    (0.78125, "0.78125Hz", 0),
    (1.5625, "1.5625Hz", 1),
    (3.125, "3.125Hz", 2),
    (6.25, "6.25Hz", 3),
    (12.5, "12.5Hz", 4),
    (25.0, "25Hz", 5),
    (50.0, "50Hz", 6),
    (100.0, "100Hz", 7),
    (200.0, "200Hz", 8),
    (400.0, "400Hz", 9),
    (800.0, "800Hz", 10),
    (1600.0, "1600Hz", 11),
];

const BMA255_ACC_ODR: &[OptionEntry] = options![
    (15.62, "15.62Hz", 0),
    (31.26, "31.26Hz", 1),
    (62.5, "62.5Hz", 2),
    (125.0, "125Hz", 3),
    (250.0, "250Hz", 4),
    (500.0, "500Hz", 5),
    (1000.0, "1000Hz", 6),
    (2000.0, "2000Hz", 7),
];

const MMA8452Q_ACC_ODR: &[OptionEntry] = options![
    (800.0, "800Hz", 0),
    (400.0, "400Hz", 1),
    (200.0, "200Hz", 2),
    (100.0, "100Hz", 3),
    (50.0, "50Hz", 4),
    (12.5, "12.5Hz", 5),
    (6.25, "6.25Hz", 6),
    (1.56, "1.56Hz", 7),
];

const BOSCH_ACC_RANGE: &[OptionEntry] = options![
    (2.0, "2G", 0),
    (4.0, "4G", 1),
    (8.0, "8G", 2),
    (16.0, "16G", 3),
];

const MMA8452Q_ACC_RANGE: &[OptionEntry] = options![
    (2.0, "2G", 0),
    (4.0, "4G", 1),
    (8.0, "8G", 2),
];

const BOSCH_GYRO_ODR: &[OptionEntry] = options![
    (25.0, "25Hz", 6),
    (50.0, "50Hz", 7),
    (100.0, "100Hz", 8),
    (200.0, "200Hz", 9),
    (400.0, "400Hz", 10),
    (800.0, "800Hz", 11),
    (1600.0, "1600Hz", 12),
    (3200.0, "3200Hz", 13),
];

const BOSCH_GYRO_RANGE: &[OptionEntry] = options![
    (2000.0, "2000dps", 0),
    (1000.0, "1000dps", 1),
    (500.0, "500dps", 2),
    (250.0, "250dps", 3),
    (125.0, "125dps", 4),
];

const ACC_FREQUENCY: &str = "accelerometer frequency";
const ACC_RANGE: &str = "accelerometer range";
const GYRO_FREQUENCY: &str = "gyroscope frequency";
const GYRO_RANGE: &str = "gyroscope range";

const fn accel(
    variant: VariantId,
    model: &'static str,
    frequency: &'static [OptionEntry],
    range: &'static [OptionEntry],
) -> Capability {
    Capability {
        kind: SensorKind::Accelerometer,
        variant,
        model,
        frequency: OptionSet::new(ACC_FREQUENCY, frequency),
        range: OptionSet::new(ACC_RANGE, range),
        encoding: ConfigEncoding::Physical,
    }
}

const fn gyro(variant: VariantId, model: &'static str) -> Capability {
    Capability {
        kind: SensorKind::Gyroscope,
        variant,
        model,
        frequency: OptionSet::new(GYRO_FREQUENCY, BOSCH_GYRO_ODR),
        range: OptionSet::new(GYRO_RANGE, BOSCH_GYRO_RANGE),
        encoding: ConfigEncoding::RegisterCode,
    }
}

const CATALOG: &[Capability] = &[
    accel(variants::ACC_BMI160, "BMI160", BOSCH_ACC_ODR, BOSCH_ACC_RANGE),
    accel(variants::ACC_BMI270, "BMI270", BOSCH_ACC_ODR, BOSCH_ACC_RANGE),
    accel(variants::ACC_BMA255, "BMA255", BMA255_ACC_ODR, BOSCH_ACC_RANGE),
    accel(variants::ACC_MMA8452Q, "MMA8452Q", MMA8452Q_ACC_ODR, MMA8452Q_ACC_RANGE),
    gyro(variants::GYRO_BMI160, "BMI160"),
    gyro(variants::GYRO_BMI270, "BMI270"),
];

/// Options for a variant, `None` when the variant is not supported
pub fn options_for(kind: SensorKind, variant: VariantId) -> Option<Capability> {
    let found = CATALOG
        .iter()
        .find(|entry| entry.kind == kind && entry.variant == variant)
        .copied();
    if found.is_none() {
        tracing::warn!(%kind, variant = variant.0, "sensor variant not supported");
    }
    found
}

/// All catalogued capabilities
pub fn supported() -> &'static [Capability] {
    CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_variants_resolve() {
        let acc = options_for(SensorKind::Accelerometer, variants::ACC_BMI160).unwrap();
        assert_eq!(acc.model, "BMI160");
        assert_eq!(acc.frequency.len(), 12);
        assert_eq!(acc.range.len(), 4);

        let gyro = options_for(SensorKind::Gyroscope, variants::GYRO_BMI270).unwrap();
        assert_eq!(gyro.encoding, ConfigEncoding::RegisterCode);
        assert_eq!(gyro.frequency.resolve(1).unwrap().code, 7);
    }

    #[test]
    fn test_unknown_variant_is_absent() {
        assert!(options_for(SensorKind::Gyroscope, VariantId(42)).is_none());
        assert!(options_for(SensorKind::Accelerometer, VariantId(2)).is_none());
    }

    #[test]
    fn test_sensor_config_encoding() {
        let acc = options_for(SensorKind::Accelerometer, variants::ACC_BMI160).unwrap();
        let config = acc.sensor_config(6, 2).unwrap();
        assert_eq!(config.frequency, ConfigValue::Physical(50.0));
        assert_eq!(config.range, ConfigValue::Physical(8.0));

        let gyro = options_for(SensorKind::Gyroscope, variants::GYRO_BMI160).unwrap();
        let config = gyro.sensor_config(1, 1).unwrap();
        assert_eq!(config.frequency, ConfigValue::Code(7));
        assert_eq!(config.range, ConfigValue::Code(1));
    }

    #[test]
    fn test_option_listing() {
        let acc = options_for(SensorKind::Accelerometer, variants::ACC_MMA8452Q).unwrap();
        assert_eq!(acc.range.to_string(), "0: 2G\n1: 4G\n2: 8G");
    }

    proptest! {
        #[test]
        fn resolve_accepts_exactly_enumerated_indices(entry in 0..CATALOG.len(), index in 0usize..64) {
            let capability = CATALOG[entry];
            for set in [capability.frequency, capability.range] {
                let result = set.resolve(index);
                if index < set.len() {
                    prop_assert!(result.is_ok());
                } else {
                    let is_invalid_option = matches!(
                        result,
                        Err(ImuError::InvalidOption { index: i, available, .. }) if i == index && available == set.len()
                    );
                    prop_assert!(is_invalid_option);
                }
            }
        }
    }
}
