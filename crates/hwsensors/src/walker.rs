//! Temperature sensor discovery.
//!
//! [`walk`] enumerates every device in the registry and every sensor on it,
//! keeping the valid temperature readings. [`walk_paths`] reads a fixed list
//! of sensors instead, for machines where discovery must be overridden.

use crate::registry::{DeviceSlot, SensorRegistry};
use crate::{Error, Result, SensorType, MICROKELVIN_AT_ZERO_CELSIUS, MICRO_UNITS};
use std::str::FromStr;
use tracing::{debug, trace};

/// A valid temperature reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Index of the owning device.
    pub device: u32,
    /// Name of the owning device.
    pub chip: String,
    /// Sensor type; always [`SensorType::Temp`] for walker output.
    pub kind: SensorType,
    /// Ordinal among sensors of the same type on the device.
    pub ordinal: u32,
    /// Raw value in micro-kelvin.
    pub microkelvin: i64,
}

impl Reading {
    /// Returns the temperature in degrees Celsius.
    pub fn celsius(&self) -> f64 {
        (self.microkelvin - MICROKELVIN_AT_ZERO_CELSIUS) as f64 / MICRO_UNITS
    }
}

/// Readings collected in one enumeration pass, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub readings: Vec<Reading>,
}

impl Snapshot {
    /// Returns the number of readings.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Returns true if no readings were collected.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Iterates over the readings.
    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

/// Walks the whole registry and returns all valid temperature readings.
///
/// Device indices are queried from 0 upward. Vacant indices are skipped and
/// the walk ends at the first exhausted index. Sensors reported missing are
/// skipped. Any other query failure aborts the walk.
pub fn walk<R: SensorRegistry + ?Sized>(registry: &R) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();
    let mut index: u32 = 0;

    loop {
        let device = match registry.device(index)? {
            DeviceSlot::Present(device) => device,
            DeviceSlot::Vacant => {
                trace!("hw.sensors.{} vacant", index);
                index += 1;
                continue;
            }
            DeviceSlot::Exhausted => break,
        };

        debug!("Found sensor device {} ({})", device.index, device.name);

        for kind in SensorType::ALL {
            for ordinal in 0..device.count(kind) {
                let Some(sensor) = registry.sensor(device.index, kind, ordinal)? else {
                    trace!("hw.sensors.{}.{}{} missing", device.index, kind, ordinal);
                    continue;
                };

                if sensor.kind != SensorType::Temp || sensor.invalid {
                    continue;
                }

                snapshot.readings.push(Reading {
                    device: device.index,
                    chip: device.name.clone(),
                    kind: sensor.kind,
                    ordinal: sensor.ordinal,
                    microkelvin: sensor.value,
                });
            }
        }

        index += 1;
    }

    debug!(
        "Enumerated {} device slots, {} temperature readings",
        index,
        snapshot.len()
    );
    Ok(snapshot)
}

/// Address of one temperature sensor: `hw.sensors.<device>.temp<ordinal>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SensorPath {
    pub device: u32,
    pub ordinal: u32,
}

impl FromStr for SensorPath {
    type Err = Error;

    /// Parses `<device>.temp<n>`, optionally prefixed with `hw.sensors.`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPath(s.to_string());
        let rest = s.strip_prefix("hw.sensors.").unwrap_or(s);

        let (device, sensor) = rest.split_once('.').ok_or_else(invalid)?;
        let device: u32 = device.parse().map_err(|_| invalid())?;

        let split = sensor
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (label, ordinal) = sensor.split_at(split);
        if label.parse::<SensorType>()? != SensorType::Temp {
            return Err(invalid());
        }
        let ordinal: u32 = ordinal.parse().map_err(|_| invalid())?;

        Ok(SensorPath { device, ordinal })
    }
}

impl std::fmt::Display for SensorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hw.sensors.{}.{}{}",
            self.device,
            SensorType::Temp,
            self.ordinal
        )
    }
}

/// Reads a fixed list of temperature sensors.
///
/// Unlike [`walk`], a device or sensor that is absent is an error: every
/// path was named explicitly. Readings flagged invalid are still dropped.
pub fn walk_paths<R: SensorRegistry + ?Sized>(
    registry: &R,
    paths: &[SensorPath],
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::default();

    for path in paths {
        let not_found = || Error::SensorNotFound {
            device: path.device,
            kind: SensorType::Temp,
            ordinal: path.ordinal,
        };

        let device = match registry.device(path.device)? {
            DeviceSlot::Present(device) => device,
            DeviceSlot::Vacant | DeviceSlot::Exhausted => return Err(not_found()),
        };

        let sensor = registry
            .sensor(device.index, SensorType::Temp, path.ordinal)?
            .ok_or_else(not_found)?;

        if sensor.invalid {
            trace!("{} invalid", path);
            continue;
        }

        snapshot.readings.push(Reading {
            device: device.index,
            chip: device.name,
            kind: SensorType::Temp,
            ordinal: path.ordinal,
            microkelvin: sensor.value,
        });
    }

    Ok(snapshot)
}
