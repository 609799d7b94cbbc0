//! In-memory registry with a scripted device tree.
//!
//! Used to exercise discovery against sparse trees, mixed sensor types and
//! injected kernel errors without real hardware.

use super::{
    device_slot_for_errno, sensor_absent_errno, DeviceSlot, SensorDevice, SensorRegistry,
    SensorValue,
};
use crate::{Error, Result, SensorType};
use std::io;

#[derive(Debug, Clone)]
enum Slot {
    Device(FakeDevice),
    Vacant,
    Exhausted,
    Fail(i32),
}

#[derive(Debug, Clone, Copy)]
enum FakeSensor {
    Value { value: i64, invalid: bool },
    Fail(i32),
}

/// A scripted sensor device.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    name: String,
    sensors: Vec<(SensorType, FakeSensor)>,
    extra_counts: [u32; SensorType::COUNT],
}

impl FakeDevice {
    /// Creates a device with no sensors.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sensors: Vec::new(),
            extra_counts: [0; SensorType::COUNT],
        }
    }

    /// Adds a valid sensor of `kind` with the next free ordinal.
    pub fn sensor(mut self, kind: SensorType, value: i64) -> Self {
        self.sensors.push((
            kind,
            FakeSensor::Value {
                value,
                invalid: false,
            },
        ));
        self
    }

    /// Adds a sensor of `kind` flagged invalid.
    pub fn invalid_sensor(mut self, kind: SensorType, value: i64) -> Self {
        self.sensors.push((
            kind,
            FakeSensor::Value {
                value,
                invalid: true,
            },
        ));
        self
    }

    /// Adds a valid temperature sensor.
    pub fn temp(self, microkelvin: i64) -> Self {
        self.sensor(SensorType::Temp, microkelvin)
    }

    /// Declares one more ordinal of `kind` than is scripted; queries past the
    /// scripted sensors report it missing.
    pub fn missing_sensor(mut self, kind: SensorType) -> Self {
        self.extra_counts[kind.index()] += 1;
        self
    }

    /// Adds a sensor of `kind` whose query fails with `errno`.
    pub fn failing_sensor(mut self, kind: SensorType, errno: i32) -> Self {
        self.sensors.push((kind, FakeSensor::Fail(errno)));
        self
    }

    fn counts(&self) -> [u32; SensorType::COUNT] {
        let mut counts = self.extra_counts;
        for (kind, _) in &self.sensors {
            counts[kind.index()] += 1;
        }
        counts
    }

    fn lookup(&self, kind: SensorType, ordinal: u32) -> Option<FakeSensor> {
        self.sensors
            .iter()
            .filter(|(k, _)| *k == kind)
            .nth(ordinal as usize)
            .map(|(_, sensor)| *sensor)
    }
}

/// Registry serving a scripted sequence of device slots.
///
/// Slots are numbered from 0 in the order they are added. Queries past the
/// last slot report the registry as exhausted.
#[derive(Debug, Clone, Default)]
pub struct FakeRegistry {
    slots: Vec<Slot>,
}

impl FakeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a device.
    pub fn with_device(mut self, device: FakeDevice) -> Self {
        self.slots.push(Slot::Device(device));
        self
    }

    /// Appends an unused index (`ENXIO`).
    pub fn with_gap(mut self) -> Self {
        self.slots.push(Slot::Vacant);
        self
    }

    /// Appends an explicit end of enumeration (`ENOENT`).
    pub fn with_exhausted(mut self) -> Self {
        self.slots.push(Slot::Exhausted);
        self
    }

    /// Appends an index whose device query fails with `errno`.
    pub fn with_failing_device(mut self, errno: i32) -> Self {
        self.slots.push(Slot::Fail(errno));
        self
    }

    fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }
}

impl SensorRegistry for FakeRegistry {
    fn device(&self, index: u32) -> Result<DeviceSlot> {
        match self.slot(index) {
            Some(Slot::Device(device)) => Ok(DeviceSlot::Present(SensorDevice {
                index,
                name: device.name.clone(),
                counts: device.counts(),
            })),
            Some(Slot::Vacant) => Ok(DeviceSlot::Vacant),
            Some(Slot::Exhausted) | None => Ok(DeviceSlot::Exhausted),
            Some(Slot::Fail(errno)) => {
                device_slot_for_errno(Some(*errno)).ok_or_else(|| Error::DeviceQuery {
                    device: index,
                    source: io::Error::from_raw_os_error(*errno),
                })
            }
        }
    }

    fn sensor(&self, device: u32, kind: SensorType, ordinal: u32) -> Result<Option<SensorValue>> {
        let fake = match self.slot(device) {
            Some(Slot::Device(fake)) => fake,
            _ => return Ok(None),
        };

        match fake.lookup(kind, ordinal) {
            Some(FakeSensor::Value { value, invalid }) => Ok(Some(SensorValue {
                kind,
                ordinal,
                value,
                invalid,
            })),
            Some(FakeSensor::Fail(errno)) if sensor_absent_errno(Some(errno)) => Ok(None),
            Some(FakeSensor::Fail(errno)) => Err(Error::SensorQuery {
                device,
                kind,
                ordinal,
                source: io::Error::from_raw_os_error(errno),
            }),
            None => Ok(None),
        }
    }
}
