//! One collect, format and publish cycle.

use crate::format;
use crate::publish::{FileOps, Publisher, SystemFileOps};
use anyhow::{Context, Result};
use hwsensors::{walk, walk_paths, SensorPath, SensorRegistry, Snapshot};
use tracing::debug;

/// Reads sensors from a registry and publishes them to one file.
pub struct Exporter<R, F: FileOps = SystemFileOps> {
    registry: R,
    sensors: Vec<SensorPath>,
    publisher: Publisher<F>,
}

impl<R: SensorRegistry, F: FileOps> Exporter<R, F> {
    /// Creates an exporter.
    ///
    /// An empty `sensors` table discovers sensors on every cycle; otherwise
    /// exactly the listed sensors are read.
    pub fn new(registry: R, sensors: Vec<SensorPath>, publisher: Publisher<F>) -> Self {
        Self {
            registry,
            sensors,
            publisher,
        }
    }

    /// Reads one snapshot.
    pub fn collect(&self) -> Result<Snapshot> {
        let snapshot = if self.sensors.is_empty() {
            walk(&self.registry)
        } else {
            walk_paths(&self.registry, &self.sensors)
        };
        snapshot.context("Failed to read hw.sensors")
    }

    /// Reads one snapshot and returns it in exposition format.
    pub fn render(&self) -> Result<String> {
        Ok(format::render(&self.collect()?))
    }

    /// Reads one snapshot and publishes it.
    pub fn run_cycle(&self) -> Result<()> {
        let snapshot = self.collect()?;
        let text = format::render(&snapshot);
        self.publisher.publish(&text).with_context(|| {
            format!(
                "Failed to publish {}",
                self.publisher.target().display()
            )
        })?;
        debug!(
            "Published {} readings to {}",
            snapshot.len(),
            self.publisher.target().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwsensors::{FakeDevice, FakeRegistry, SensorType};
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const EXPECTED: &str = "# TYPE node_hwmon_temp_celsius gauge\n\
        node_hwmon_temp_celsius{chip=\"cpu0\", sensor=\"temp0\"} 27.00\n";

    fn two_devices() -> FakeRegistry {
        FakeRegistry::new()
            .with_device(FakeDevice::new("cpu0").temp(300_150_000))
            .with_device(
                FakeDevice::new("acpitz0").invalid_sensor(SensorType::Temp, 300_150_000),
            )
    }

    #[test]
    fn test_cycle_writes_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hwsensors.prom");
        let exporter = Exporter::new(two_devices(), Vec::new(), Publisher::new(&target, 0o644));

        exporter.run_cycle().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), EXPECTED);
    }

    #[test]
    fn test_fixed_sensor_table() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hwsensors.prom");
        let registry = FakeRegistry::new()
            .with_device(FakeDevice::new("cpu0").temp(300_150_000))
            .with_device(FakeDevice::new("cpu1").temp(310_150_000));
        let sensors = vec![SensorPath {
            device: 1,
            ordinal: 0,
        }];
        let exporter = Exporter::new(registry, sensors, Publisher::new(&target, 0o644));

        assert_eq!(
            exporter.render().unwrap(),
            "# TYPE node_hwmon_temp_celsius gauge\n\
             node_hwmon_temp_celsius{chip=\"cpu1\", sensor=\"temp0\"} 37.00\n"
        );
    }

    #[test]
    fn test_failed_walk_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hwsensors.prom");
        fs::write(&target, EXPECTED).unwrap();

        let registry = FakeRegistry::new()
            .with_device(FakeDevice::new("cpu0").temp(320_150_000))
            .with_failing_device(libc::EIO);
        let exporter = Exporter::new(registry, Vec::new(), Publisher::new(&target, 0o644));

        let err = exporter.run_cycle().unwrap_err();
        assert!(format!("{:#}", err).contains("hw.sensors.1"));
        assert_eq!(fs::read_to_string(&target).unwrap(), EXPECTED);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_target_always_complete_for_readers() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("hwsensors.prom");
        let exporter = Exporter::new(two_devices(), Vec::new(), Publisher::new(&target, 0o644));

        exporter.run_cycle().unwrap();

        let done = AtomicBool::new(false);
        let reads = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            let reader = scope.spawn(|| loop {
                let content = fs::read_to_string(&target).unwrap();
                assert_eq!(content, EXPECTED);
                reads.fetch_add(1, Ordering::Relaxed);
                if done.load(Ordering::Acquire) {
                    break;
                }
            });

            for _ in 0..200 {
                exporter.run_cycle().unwrap();
            }
            done.store(true, Ordering::Release);
            reader.join().unwrap();
        });

        assert!(reads.load(Ordering::Relaxed) > 0);
    }
}
