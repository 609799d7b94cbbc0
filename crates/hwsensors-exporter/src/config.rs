//! Configuration management.

use anyhow::{bail, Context, Result};
use hwsensors::SensorPath;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted snapshot interval, in seconds.
pub const MAX_INTERVAL: u64 = 86_400;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Metrics file to maintain (e.g., "/var/node_exporter/hwsensors.prom")
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Seconds between snapshots
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Permission bits of the published file
    #[serde(default = "default_mode")]
    pub mode: u32,

    /// Fixed sensor table (e.g., ["hw.sensors.0.temp0"]); empty enables discovery
    #[serde(default)]
    pub sensors: Vec<String>,
}

// Default value functions
fn default_output() -> PathBuf {
    PathBuf::from("/var/node_exporter/hwsensors.prom")
}

fn default_interval() -> u64 {
    15
}

fn default_mode() -> u32 {
    0o644
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be run.
    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            bail!("interval must be at least one second");
        }
        if self.interval > MAX_INTERVAL {
            bail!(
                "interval {} exceeds the maximum of {} seconds",
                self.interval,
                MAX_INTERVAL
            );
        }
        if self.output.file_name().is_none() {
            bail!("output {} does not name a file", self.output.display());
        }
        if self.mode & !0o777 != 0 {
            bail!("mode {:o} has bits outside 0777", self.mode);
        }
        self.sensor_paths()?;
        Ok(())
    }

    /// Returns the snapshot interval.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Parses the fixed sensor table.
    pub fn sensor_paths(&self) -> Result<Vec<SensorPath>> {
        self.sensors
            .iter()
            .map(|s| {
                s.parse::<SensorPath>()
                    .with_context(|| format!("Invalid sensor entry {:?}", s))
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: default_output(),
            interval: default_interval(),
            mode: default_mode(),
            sensors: Vec::new(),
        }
    }
}
