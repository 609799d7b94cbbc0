//! Error types for the hw.sensors library.

use crate::SensorType;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when querying the kernel sensor registry.
#[derive(Error, Debug)]
pub enum Error {
    /// Device metadata query failed with an unexpected error.
    #[error("sysctl hw.sensors.{device} failed: {source}")]
    DeviceQuery {
        device: u32,
        #[source]
        source: std::io::Error,
    },

    /// Individual sensor query failed with an unexpected error.
    #[error("sysctl hw.sensors.{device}.{kind}{ordinal} failed: {source}")]
    SensorQuery {
        device: u32,
        kind: SensorType,
        ordinal: u32,
        #[source]
        source: std::io::Error,
    },

    /// A sensor named in a fixed sensor table is not present.
    #[error("Sensor hw.sensors.{device}.{kind}{ordinal} not found")]
    SensorNotFound {
        device: u32,
        kind: SensorType,
        ordinal: u32,
    },

    /// The kernel sensor registry is not available on this platform.
    #[error("hw.sensors is not supported on this platform")]
    Unsupported,

    /// Unknown sensor type label.
    #[error("Invalid sensor type: {0}")]
    InvalidSensorType(String),

    /// Malformed sensor path.
    #[error("Invalid sensor path: {0}")]
    InvalidPath(String),
}
