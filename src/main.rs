//! CLI entry point for the IoT Digital Twin simulator.
//!
//! Runs a single seeded experiment, or (with `--what-if`) a base and a
//! modified scenario back to back with a metric comparison.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use iot_twin_sim::analysis::{report, what_if, ScenarioResults};
use iot_twin_sim::config::{LogFormat, SimConfig};
use iot_twin_sim::runner::Simulation;
use iot_twin_sim::sync::SyncStrategyKind;
use iot_twin_sim::telemetry;

#[derive(Debug, Parser)]
#[command(
    name = "iot-twin-sim",
    about = "Digital Twin — resource-constrained IoT system simulator",
    version
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sync strategy to use
    #[arg(long, value_enum)]
    sync_strategy: Option<SyncStrategyKind>,

    /// Simulation duration in hours
    #[arg(long)]
    duration: Option<f64>,

    /// Sensor sampling rate in seconds
    #[arg(long)]
    sampling_rate: Option<u64>,

    /// Battery capacity in mAh
    #[arg(long)]
    battery_capacity: Option<f64>,

    /// RAM size in KB
    #[arg(long)]
    ram_size: Option<f64>,

    /// Network bandwidth in kbps
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Disable edge processing
    #[arg(long)]
    no_edge: bool,

    /// Disable memory leak simulation
    #[arg(long)]
    no_leak: bool,

    /// Tick log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Run a What-If comparison (base config vs. CLI overrides)
    #[arg(long)]
    what_if: bool,

    /// Suppress the per-tick alert stream
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    /// Overrides shared by both scenarios of a what-if run.
    fn apply_shared_overrides(&self, config: &mut SimConfig) {
        if let Some(duration) = self.duration {
            config.simulation.duration_hours = duration;
        }
        if let Some(rate) = self.sampling_rate {
            config.simulation.sampling_rate_seconds = rate;
        }
        if let Some(capacity) = self.battery_capacity {
            config.device.battery.capacity_mah = capacity;
        }
        if let Some(ram) = self.ram_size {
            config.device.memory.total_ram_kb = ram;
        }
        if let Some(bandwidth) = self.bandwidth {
            config.device.network.max_bandwidth_kbps = bandwidth;
        }
        if let Some(seed) = self.seed {
            config.simulation.random_seed = seed;
        }
        if let Some(format) = self.log_format {
            config.simulation.log_format = format;
        }
    }

    /// Overrides that distinguish the what-if scenario from the base.
    fn apply_variant_overrides(&self, config: &mut SimConfig) {
        if let Some(strategy) = self.sync_strategy {
            config.sync.default_strategy = strategy;
        }
        if self.no_edge {
            config.edge.enabled = false;
        }
        if self.no_leak {
            config.device.memory.leak_enabled = false;
        }
    }
}

fn run_scenario(config: SimConfig, quiet: bool) -> Result<Simulation> {
    let mut sim = Simulation::new(config);
    if quiet {
        sim = sim.quiet();
    }
    sim.run()?;
    Ok(sim)
}

fn print_report(sim: &Simulation) {
    report::print_summary(
        sim.device(),
        sim.twin(),
        sim.sync_engine(),
        sim.fault_detector(),
        sim.edge(),
        sim.predictive(),
        sim.config().simulation.duration_hours,
    );
}

fn extract_results(sim: &Simulation) -> ScenarioResults {
    ScenarioResults::extract(
        sim.device(),
        sim.twin(),
        sim.sync_engine(),
        sim.fault_detector(),
        sim.edge(),
        sim.predictive(),
    )
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let base_config = SimConfig::load(cli.config.as_deref())?;

    if cli.what_if {
        // Shared parameters apply to BOTH scenarios; only the strategy and
        // the edge/leak toggles make the what-if differ.
        let mut shared_config = base_config;
        cli.apply_shared_overrides(&mut shared_config);

        let mut whatif_config = shared_config.clone();
        cli.apply_variant_overrides(&mut whatif_config);

        println!("=== Running BASE scenario ===");
        let base_sim = run_scenario(shared_config, cli.quiet)?;

        println!("=== Running WHAT-IF scenario ===");
        let whatif_sim = run_scenario(whatif_config, cli.quiet)?;

        let comparison = what_if::compare(
            &extract_results(&base_sim),
            &extract_results(&whatif_sim),
        );

        println!("=== BASE SCENARIO REPORT ===");
        print_report(&base_sim);
        println!("=== WHAT-IF SCENARIO REPORT ===");
        print_report(&whatif_sim);
        report::print_whatif_comparison(&comparison);
    } else {
        let mut config = base_config;
        cli.apply_shared_overrides(&mut config);
        cli.apply_variant_overrides(&mut config);

        let sim = run_scenario(config, cli.quiet)?;
        print_report(&sim);
    }

    Ok(())
}
