//! Inspection of derived model constants

use clap::Args;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use gifpop_runtime::synapse::MembranePropagator;
use gifpop_runtime::GifPopulation;

use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};

/// Show constants a population derives at calibration
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Only inspect this population
    #[arg(short, long)]
    pub population: Option<String>,

    /// Override the resolution (ms)
    #[arg(long)]
    pub dt_ms: Option<f64>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Constants of one calibrated population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedConstants {
    /// Population name
    pub name: String,
    /// Resolution (ms)
    pub dt_ms: f64,
    /// History length (steps)
    pub len_kernel: usize,
    /// Refractory period (steps)
    pub k_ref: usize,
    /// Membrane decay per step
    pub p22: f64,
    /// Current-to-voltage gain per step (mV/pA)
    pub p20: f64,
    /// Excitatory current decay per step
    pub p11_ex: f64,
    /// Inhibitory current decay per step
    pub p11_in: f64,
}

/// Calibrate every population of `config` and collect its constants
pub fn derive_constants(config: &ExperimentConfig) -> CliResult<Vec<DerivedConstants>> {
    let h = config.simulation.dt_ms;
    config
        .populations
        .iter()
        .map(|pop| -> CliResult<DerivedConstants> {
            let mut model = GifPopulation::new(pop.params.clone())?;
            model.calibrate(h)?;
            let history = model
                .history()
                .ok_or_else(|| CliError::config(format!("{} has no history", pop.name)))?;
            let prop = MembranePropagator::new(model.params(), h);
            Ok(DerivedConstants {
                name: pop.name.clone(),
                dt_ms: h,
                len_kernel: history.len(),
                k_ref: history.k_ref(),
                p22: prop.p22,
                p20: prop.p20,
                p11_ex: prop.ex.p11,
                p11_in: prop.inh.p11,
            })
        })
        .collect()
}

impl InspectCommand {
    /// Print derived constants
    pub fn execute(self, config_path: Option<&Path>) -> CliResult<()> {
        let mut config = ExperimentConfig::load(config_path)?;
        if let Some(dt) = self.dt_ms {
            if !(dt > 0.0) {
                return Err(CliError::invalid_args("--dt-ms must be > 0"));
            }
            config.simulation.dt_ms = dt;
        }
        if let Some(name) = &self.population {
            config.populations.retain(|p| &p.name == name);
            if config.populations.is_empty() {
                return Err(CliError::invalid_args(format!("unknown population '{}'", name)));
            }
        }

        info!("Inspecting {} populations", config.populations.len());
        let constants = derive_constants(&config)?;

        if self.json {
            let json = serde_json::to_string_pretty(&constants)
                .map_err(|e| CliError::Generic(anyhow::anyhow!(e)))?;
            println!("{}", json);
        } else {
            for c in &constants {
                println!("{} (dt = {} ms)", c.name, c.dt_ms);
                println!("  len_kernel: {}", c.len_kernel);
                println!("  k_ref:      {}", c.k_ref);
                println!("  P22:        {:.9}", c.p22);
                println!("  P20:        {:.9}", c.p20);
                println!("  P11 ex/in:  {:.9} / {:.9}", c.p11_ex, c.p11_in);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let constants = derive_constants(&ExperimentConfig::default()).unwrap();
        assert_eq!(constants.len(), 1);
        let c = &constants[0];
        assert_eq!(c.len_kernel, 2749);
        assert_eq!(c.k_ref, 40);
        assert!((c.p22 - (-0.1f64 / 20.0).exp()).abs() < 1e-15);
    }
}
