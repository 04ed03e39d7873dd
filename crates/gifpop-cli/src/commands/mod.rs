//! CLI command implementations for gifpop

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::CliResult;

pub mod inspect;
pub mod params;
pub mod run;

/// gifpop - mesoscopic simulation of GIF neuron populations
#[derive(Parser, Debug)]
#[command(
    name = "gifpop",
    version,
    about = "Population-density simulation of generalized integrate-and-fire neurons",
    long_about = "gifpop simulates finite populations of GIF neurons with spike-frequency \
                  adaptation at the level of population spike counts. Experiments are \
                  described in TOML and results are written as JSON."
)]
pub struct GifPopCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Experiment file (TOML); the default experiment is used when omitted
    #[arg(short, long, global = true, env = "GIFPOP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an experiment
    Run(run::RunCommand),

    /// Show constants derived at calibration
    Inspect(inspect::InspectCommand),

    /// Print default population parameters
    Params(params::ParamsCommand),
}

impl GifPopCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        let config = self.config;
        match self.command {
            Commands::Run(cmd) => cmd.execute(config.as_deref()),
            Commands::Inspect(cmd) => cmd.execute(config.as_deref()),
            Commands::Params(cmd) => cmd.execute(),
        }
    }
}
