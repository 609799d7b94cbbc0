//! hw.sensors Exporter Daemon
//!
//! Reads temperature sensors from the kernel `hw.sensors` tree on a fixed
//! interval and keeps a node_exporter textfile-collector file up to date.

mod config;
mod exporter;
mod format;
mod publish;
mod schedule;

use anyhow::{Context, Result};
use clap::Parser;
use hwsensors::SysctlRegistry;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use exporter::Exporter;
use publish::Publisher;
use schedule::Scheduler;

#[derive(Parser)]
#[command(name = "hwsensorsd")]
#[command(about = "Publish hw.sensors temperatures for the node_exporter textfile collector")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); built-in defaults are used if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metrics file to maintain, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds between snapshots, overriding the configuration
    #[arg(short, long)]
    interval: Option<u64>,

    /// Publish a single snapshot and exit
    #[arg(long)]
    once: bool,

    /// Print a single snapshot to stdout instead of publishing it
    #[arg(long)]
    stdout: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = load_config(&cli)?;

    let registry = SysctlRegistry::new().context("Failed to open kernel sensor registry")?;
    let exporter = Exporter::new(
        registry,
        config.sensor_paths()?,
        Publisher::new(&config.output, config.mode),
    );

    if cli.stdout {
        print!("{}", exporter.render()?);
        return Ok(());
    }

    if cli.once {
        return exporter.run_cycle();
    }

    let scheduler = Scheduler::new(config.interval());
    info!(
        "Publishing to {} every {:?} (phase {:?})",
        config.output.display(),
        scheduler.interval(),
        scheduler.offset()
    );

    match scheduler.run(|| exporter.run_cycle())? {}
}

/// Loads the configuration file, if any, and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            config
        }
        None => Config::default(),
    };

    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if let Some(interval) = cli.interval {
        config.interval = interval;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["hwsensorsd", "-o", "/tmp/t.prom", "-i", "30", "--once"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.output, PathBuf::from("/tmp/t.prom"));
        assert_eq!(config.interval, 30);
        assert!(cli.once);
    }

    #[test]
    fn test_cli_rejects_zero_interval() {
        let cli = Cli::parse_from(["hwsensorsd", "--interval", "0"]);
        assert!(load_config(&cli).is_err());
    }
}
