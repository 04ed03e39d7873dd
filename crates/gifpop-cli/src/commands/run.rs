//! Experiment execution

use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use gifpop_runtime::SimulationResult;

use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};

/// Run an experiment and report spike counts
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Write results as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the simulated time (ms)
    #[arg(long)]
    pub duration_ms: Option<f64>,

    /// Override the resolution (ms)
    #[arg(long)]
    pub dt_ms: Option<f64>,

    /// Collect per-step timing
    #[arg(long)]
    pub perf: bool,
}

/// Per-population summary
#[derive(Debug, Serialize)]
struct PopulationSummary {
    name: String,
    #[serde(rename = "N")]
    n: u64,
    spikes: u64,
    rate_hz: f64,
}

/// JSON document written by `run`
#[derive(Debug, Serialize)]
struct RunReport<'a> {
    seed: u64,
    dt_ms: f64,
    populations: Vec<PopulationSummary>,
    result: &'a SimulationResult,
}

impl RunCommand {
    /// Apply command-line overrides to a loaded experiment
    pub fn apply_overrides(&self, config: &mut ExperimentConfig) -> CliResult<()> {
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(duration) = self.duration_ms {
            if !(duration > 0.0) {
                return Err(CliError::invalid_args("--duration-ms must be > 0"));
            }
            config.simulation.duration_ms = duration;
        }
        if let Some(dt) = self.dt_ms {
            if !(dt > 0.0) {
                return Err(CliError::invalid_args("--dt-ms must be > 0"));
            }
            config.simulation.dt_ms = dt;
        }
        if self.perf {
            config.simulation.perf = true;
        }
        Ok(())
    }

    /// Load, simulate and report
    pub fn execute(self, config_path: Option<&Path>) -> CliResult<()> {
        let mut config = ExperimentConfig::load(config_path)?;
        self.apply_overrides(&mut config)?;

        let mut engine = config.build_engine()?;

        info!(
            "Running {} populations for {} ms (dt = {} ms, seed = {})",
            config.populations.len(),
            config.simulation.duration_ms,
            config.simulation.dt_ms,
            config.simulation.seed
        );
        let result = engine.run()?;
        info!(
            "Simulation completed: {} spikes in {} steps",
            result.total_spikes, result.steps_executed
        );

        let populations: Vec<PopulationSummary> = config
            .populations
            .iter()
            .enumerate()
            .map(|(i, pop)| {
                let node = i as u32;
                PopulationSummary {
                    name: pop.name.clone(),
                    n: pop.params.n,
                    spikes: result.spike_counts(node).iter().sum(),
                    rate_hz: result.population_rate_hz(node),
                }
            })
            .collect();

        for pop in &populations {
            println!(
                "{:<16} N={:<8} spikes={:<10} rate={:.3} Hz",
                pop.name, pop.n, pop.spikes, pop.rate_hz
            );
        }
        if let Some(perf) = &result.perf {
            println!(
                "perf: avg {} ns/step, max {} ns/step over {} steps",
                perf.avg_step_ns, perf.max_step_ns, perf.steps
            );
        }

        if let Some(path) = &self.output {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let report = RunReport {
                seed: config.simulation.seed,
                dt_ms: config.simulation.dt_ms,
                populations,
                result: &result,
            };
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| CliError::Generic(anyhow::anyhow!(e)))?;
            std::fs::write(path, json)?;
            info!("Wrote results to {}", path.display());
        }

        Ok(())
    }
}
