//! hw.sensors Library
//!
//! Discovers and reads the hardware monitoring sensors the OpenBSD kernel
//! exposes under the `hw.sensors` sysctl tree, and collects the temperature
//! sensors among them into [`Snapshot`]s.

pub mod error;
pub mod registry;
pub mod sensor_type;
pub mod walker;

pub use error::{Error, Result};
pub use registry::{
    DeviceSlot, FakeDevice, FakeRegistry, SensorDevice, SensorRegistry, SensorValue,
    SysctlRegistry,
};
pub use sensor_type::SensorType;
pub use walker::{walk, walk_paths, Reading, SensorPath, Snapshot};

/// Kernel temperature offset: 0 °C expressed in micro-kelvin.
pub const MICROKELVIN_AT_ZERO_CELSIUS: i64 = 273_150_000;

/// Fixed-point scale of kernel sensor values (micro-units).
pub const MICRO_UNITS: f64 = 1_000_000.0;
