//! Prometheus text exposition of a snapshot.

use hwsensors::Snapshot;
use std::fmt::Write;

/// Metric name for all temperature readings.
pub const METRIC: &str = "node_hwmon_temp_celsius";

/// Renders `snapshot` as a textfile-collector document.
///
/// One `# TYPE` line, then one sample per reading:
/// `node_hwmon_temp_celsius{chip="cpu0", sensor="temp0"} 27.00`.
/// Chip names are written as the kernel reports them.
pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::with_capacity(48 + snapshot.len() * 72);
    let _ = writeln!(out, "# TYPE {} gauge", METRIC);

    for reading in snapshot {
        let _ = writeln!(
            out,
            "{}{{chip=\"{}\", sensor=\"{}{}\"}} {:.2}",
            METRIC,
            reading.chip,
            reading.kind,
            reading.ordinal,
            reading.celsius()
        );
    }

    out
}
