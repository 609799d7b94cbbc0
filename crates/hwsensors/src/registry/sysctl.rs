//! Registry backed by the running kernel's `hw.sensors` sysctl tree.

use super::{DeviceSlot, SensorRegistry, SensorValue};
use crate::{Error, Result, SensorType};

/// Kernel sensor registry queried through `sysctl(2)`.
///
/// Only OpenBSD exposes `hw.sensors`; on other platforms construction fails
/// with [`Error::Unsupported`].
#[derive(Debug)]
pub struct SysctlRegistry {
    _private: (),
}

#[cfg(target_os = "openbsd")]
mod ffi {
    use crate::SensorType;
    use libc::{c_char, c_int, c_void};

    pub const CTL_HW: c_int = 6;
    pub const HW_SENSORS: c_int = 11;

    /// `SENSOR_FINVALID` from `<sys/sensors.h>`.
    pub const SENSOR_FINVALID: c_int = 0x0001;

    /// `struct sensordev`.
    #[repr(C)]
    pub struct SensorDev {
        pub num: c_int,
        pub xname: [c_char; 16],
        pub maxnumt: [c_int; SensorType::COUNT],
        pub sensors_count: c_int,
    }

    /// `struct sensor`.
    #[repr(C)]
    pub struct Sensor {
        pub desc: [c_char; 32],
        pub tv: libc::timeval,
        pub value: i64,
        pub kind: c_int,
        pub status: c_int,
        pub numt: c_int,
        pub flags: c_int,
    }

    /// Reads the node at `mib` into `out`.
    pub fn query<T>(mib: &[c_int], out: &mut T) -> std::io::Result<()> {
        let mut len = std::mem::size_of::<T>();
        // SAFETY: `out` is a valid, exclusively borrowed buffer of `len` bytes
        // and the kernel writes at most `len` bytes into it.
        let rc = unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                out as *mut T as *mut c_void,
                &mut len,
                std::ptr::null_mut(),
                0,
            )
        };
        if rc == -1 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(target_os = "openbsd")]
impl SysctlRegistry {
    /// Opens the kernel sensor registry.
    pub fn new() -> Result<Self> {
        Ok(Self { _private: () })
    }
}

#[cfg(not(target_os = "openbsd"))]
impl SysctlRegistry {
    /// Opens the kernel sensor registry.
    pub fn new() -> Result<Self> {
        Err(Error::Unsupported)
    }
}

#[cfg(target_os = "openbsd")]
impl SensorRegistry for SysctlRegistry {
    fn device(&self, index: u32) -> Result<DeviceSlot> {
        use super::{device_slot_for_errno, SensorDevice};

        let mib = [ffi::CTL_HW, ffi::HW_SENSORS, index as libc::c_int];
        // SAFETY: SensorDev is plain old data; all-zero is a valid value.
        let mut raw: ffi::SensorDev = unsafe { std::mem::zeroed() };

        if let Err(source) = ffi::query(&mib, &mut raw) {
            return device_slot_for_errno(source.raw_os_error()).ok_or(Error::DeviceQuery {
                device: index,
                source,
            });
        }

        let name_bytes: Vec<u8> = raw
            .xname
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();

        let mut counts = [0u32; SensorType::COUNT];
        for (count, &max) in counts.iter_mut().zip(raw.maxnumt.iter()) {
            *count = u32::try_from(max).unwrap_or(0);
        }

        Ok(DeviceSlot::Present(SensorDevice {
            index,
            name: String::from_utf8_lossy(&name_bytes).into_owned(),
            counts,
        }))
    }

    fn sensor(&self, device: u32, kind: SensorType, ordinal: u32) -> Result<Option<SensorValue>> {
        use super::sensor_absent_errno;

        let mib = [
            ffi::CTL_HW,
            ffi::HW_SENSORS,
            device as libc::c_int,
            kind as libc::c_int,
            ordinal as libc::c_int,
        ];
        // SAFETY: Sensor is plain old data; all-zero is a valid value.
        let mut raw: ffi::Sensor = unsafe { std::mem::zeroed() };

        if let Err(source) = ffi::query(&mib, &mut raw) {
            if sensor_absent_errno(source.raw_os_error()) {
                return Ok(None);
            }
            return Err(Error::SensorQuery {
                device,
                kind,
                ordinal,
                source,
            });
        }

        Ok(Some(SensorValue {
            kind: SensorType::from_index(raw.kind).unwrap_or(kind),
            ordinal: u32::try_from(raw.numt).unwrap_or(ordinal),
            value: raw.value,
            invalid: raw.flags & ffi::SENSOR_FINVALID != 0,
        }))
    }
}

#[cfg(not(target_os = "openbsd"))]
impl SensorRegistry for SysctlRegistry {
    fn device(&self, _index: u32) -> Result<DeviceSlot> {
        Err(Error::Unsupported)
    }

    fn sensor(
        &self,
        _device: u32,
        _kind: SensorType,
        _ordinal: u32,
    ) -> Result<Option<SensorValue>> {
        Err(Error::Unsupported)
    }
}
