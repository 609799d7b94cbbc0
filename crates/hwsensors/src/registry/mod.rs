//! Kernel sensor registry access.
//!
//! The registry is addressed by MIB paths `{CTL_HW, HW_SENSORS, device}` for
//! device metadata and `{CTL_HW, HW_SENSORS, device, type, ordinal}` for an
//! individual sensor. [`SysctlRegistry`] queries the running kernel;
//! [`FakeRegistry`] serves a scripted tree from memory.

mod fake;
mod sysctl;

pub use fake::{FakeDevice, FakeRegistry};
pub use sysctl::SysctlRegistry;

use crate::{Result, SensorType};

/// One hardware monitoring chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorDevice {
    /// Kernel-assigned device index.
    pub index: u32,
    /// Device name, e.g. `cpu0` or `acpitz0`.
    pub name: String,
    /// Number of sensors per type, indexed by [`SensorType::index`].
    pub counts: [u32; SensorType::COUNT],
}

impl SensorDevice {
    /// Returns how many sensors of `kind` the device exposes.
    pub fn count(&self, kind: SensorType) -> u32 {
        self.counts[kind.index()]
    }
}

/// Outcome of a device metadata query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSlot {
    /// A device is attached at this index.
    Present(SensorDevice),
    /// No device at this index (`ENXIO`); later indices may still be in use.
    Vacant,
    /// No devices at this index or beyond (`ENOENT`).
    Exhausted,
}

/// One sensor as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorValue {
    /// Sensor type.
    pub kind: SensorType,
    /// Ordinal among sensors of the same type on the device.
    pub ordinal: u32,
    /// Raw value in the kernel's fixed-point unit for `kind`.
    pub value: i64,
    /// `SENSOR_FINVALID` is set.
    pub invalid: bool,
}

/// Read access to a kernel sensor registry.
pub trait SensorRegistry {
    /// Queries device metadata at `index`.
    fn device(&self, index: u32) -> Result<DeviceSlot>;

    /// Queries a single sensor.
    ///
    /// Returns `Ok(None)` if the sensor is missing or not configured.
    fn sensor(&self, device: u32, kind: SensorType, ordinal: u32) -> Result<Option<SensorValue>>;
}

impl<R: SensorRegistry + ?Sized> SensorRegistry for &R {
    fn device(&self, index: u32) -> Result<DeviceSlot> {
        (**self).device(index)
    }

    fn sensor(&self, device: u32, kind: SensorType, ordinal: u32) -> Result<Option<SensorValue>> {
        (**self).sensor(device, kind, ordinal)
    }
}

impl<R: SensorRegistry + ?Sized> SensorRegistry for Box<R> {
    fn device(&self, index: u32) -> Result<DeviceSlot> {
        (**self).device(index)
    }

    fn sensor(&self, device: u32, kind: SensorType, ordinal: u32) -> Result<Option<SensorValue>> {
        (**self).sensor(device, kind, ordinal)
    }
}

/// Maps a device query errno to a slot, or `None` if it is a hard failure.
pub(crate) fn device_slot_for_errno(errno: Option<i32>) -> Option<DeviceSlot> {
    match errno {
        Some(libc::ENXIO) => Some(DeviceSlot::Vacant),
        Some(libc::ENOENT) => Some(DeviceSlot::Exhausted),
        _ => None,
    }
}

/// Returns true if a sensor query errno means the sensor is simply absent.
pub(crate) fn sensor_absent_errno(errno: Option<i32>) -> bool {
    matches!(errno, Some(libc::ENOENT) | Some(libc::ENXIO))
}
