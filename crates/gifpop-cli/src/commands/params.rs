//! Default parameter listing

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::error::CliResult;

/// Print the default experiment, a starting point for new configurations
#[derive(Args, Debug)]
pub struct ParamsCommand {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ParamsCommand {
    /// Render the default experiment as TOML
    pub fn execute(self) -> CliResult<()> {
        let text = ExperimentConfig::default().to_toml_string()?;
        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, text)?;
                info!("Wrote default experiment to {}", path.display());
            }
            None => print!("{}", text),
        }
        Ok(())
    }
}
