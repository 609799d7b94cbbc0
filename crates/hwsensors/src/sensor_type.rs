//! Sensor type categories.
//!
//! Mirrors `enum sensor_type` from `<sys/sensors.h>`. The discriminants are
//! the kernel's type indices and form the fourth component of a sensor MIB.

use crate::{Error, Result};
use std::str::FromStr;

/// Kernel sensor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum SensorType {
    /// Temperature (micro-kelvin).
    Temp = 0,
    /// Fan speed (RPM).
    FanRpm = 1,
    /// DC voltage (micro-volts).
    VoltsDc = 2,
    /// AC voltage (micro-volts).
    VoltsAc = 3,
    /// Resistance (micro-ohms).
    Ohms = 4,
    /// Power (micro-watts).
    Watts = 5,
    /// Current (micro-amperes).
    Amps = 6,
    /// Energy stored (micro-watt-hours).
    WattHour = 7,
    /// Charge stored (micro-amp-hours).
    AmpHour = 8,
    /// Boolean indicator.
    Indicator = 9,
    /// Raw integer.
    Integer = 10,
    /// Percentage (thousandths).
    Percent = 11,
    /// Illuminance (micro-lux).
    Lux = 12,
    /// Disk drive state.
    Drive = 13,
    /// Time delta (nanoseconds).
    TimeDelta = 14,
    /// Relative humidity (thousandths of a percent).
    Humidity = 15,
    /// Frequency (micro-hertz).
    Freq = 16,
    /// Angle (micro-degrees).
    Angle = 17,
    /// Distance (micrometres).
    Distance = 18,
    /// Pressure (millipascals).
    Pressure = 19,
    /// Acceleration (micro-m/s²).
    Accel = 20,
    /// Velocity (micro-m/s).
    Velocity = 21,
    /// Energy (micro-joules).
    Energy = 22,
}

impl SensorType {
    /// Number of sensor type categories (`SENSOR_MAX_TYPES`).
    pub const COUNT: usize = 23;

    /// All types in ascending kernel index order.
    pub const ALL: [SensorType; Self::COUNT] = [
        SensorType::Temp,
        SensorType::FanRpm,
        SensorType::VoltsDc,
        SensorType::VoltsAc,
        SensorType::Ohms,
        SensorType::Watts,
        SensorType::Amps,
        SensorType::WattHour,
        SensorType::AmpHour,
        SensorType::Indicator,
        SensorType::Integer,
        SensorType::Percent,
        SensorType::Lux,
        SensorType::Drive,
        SensorType::TimeDelta,
        SensorType::Humidity,
        SensorType::Freq,
        SensorType::Angle,
        SensorType::Distance,
        SensorType::Pressure,
        SensorType::Accel,
        SensorType::Velocity,
        SensorType::Energy,
    ];

    /// Converts a kernel type index to a SensorType.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Returns the kernel type index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the label used by `sysctl(8)` (`sensor_type_s`).
    pub fn label(self) -> &'static str {
        match self {
            SensorType::Temp => "temp",
            SensorType::FanRpm => "fan",
            SensorType::VoltsDc => "volt",
            SensorType::VoltsAc => "acvolt",
            SensorType::Ohms => "resistance",
            SensorType::Watts => "power",
            SensorType::Amps => "current",
            SensorType::WattHour => "watthour",
            SensorType::AmpHour => "amphour",
            SensorType::Indicator => "indicator",
            SensorType::Integer => "raw",
            SensorType::Percent => "percent",
            SensorType::Lux => "illuminance",
            SensorType::Drive => "drive",
            SensorType::TimeDelta => "timedelta",
            SensorType::Humidity => "humidity",
            SensorType::Freq => "frequency",
            SensorType::Angle => "angle",
            SensorType::Distance => "distance",
            SensorType::Pressure => "pressure",
            SensorType::Accel => "acceleration",
            SensorType::Velocity => "velocity",
            SensorType::Energy => "energy",
        }
    }
}

impl FromStr for SensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == lower)
            .ok_or_else(|| Error::InvalidSensorType(s.to_string()))
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
