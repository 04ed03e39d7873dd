//! Experiment configuration for the gifpop CLI
//!
//! An experiment is a TOML file with a `[simulation]` table and any number
//! of `[[population]]`, `[[connection]]` and `[[stimulus]]` entries.
//! Populations are referred to by name; times are given in milliseconds and
//! converted to steps of the configured resolution.

use std::collections::HashMap;
use std::path::Path;

use gifpop_runtime::simulation::{NodeId, StimulusPattern};
use gifpop_runtime::{GifPopParams, Recordable, SimulationEngine, SimulationParams};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Complete experiment description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Global simulation settings
    pub simulation: SimulationSection,
    /// Populations, in node order
    #[serde(rename = "population")]
    pub populations: Vec<PopulationConfig>,
    /// Projections between populations
    #[serde(rename = "connection")]
    pub connections: Vec<ConnectionConfig>,
    /// External input
    #[serde(rename = "stimulus")]
    pub stimuli: Vec<StimulusConfig>,
}

/// `[simulation]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    /// Resolution (ms)
    pub dt_ms: f64,
    /// Simulated time (ms)
    pub duration_ms: f64,
    /// Slice length and minimum connection delay (steps)
    pub min_delay_steps: usize,
    /// Random seed
    pub seed: u64,
    /// Observables to sample from every population
    pub record: Vec<Recordable>,
    /// Sampling interval (steps)
    pub record_interval_steps: usize,
    /// Cap on the number of recorded spike events
    pub max_recorded_events: Option<usize>,
    /// Collect per-step timing
    pub perf: bool,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            dt_ms: 0.1,
            duration_ms: 1000.0,
            min_delay_steps: 10,
            seed: 42,
            record: vec![Recordable::Mean],
            record_interval_steps: 10,
            max_recorded_events: Some(1_000_000),
            perf: false,
        }
    }
}

/// `[[population]]` entry: a name plus the full parameter table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Unique population name
    pub name: String,
    /// Model parameters; missing keys take their defaults
    #[serde(flatten)]
    pub params: GifPopParams,
}

/// `[[connection]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Source population name
    pub source: String,
    /// Target population name
    pub target: String,
    /// Weight per spike (pA); negative weights are inhibitory
    pub weight: f64,
    /// Delay (ms)
    pub delay_ms: f64,
}

/// `[[stimulus]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StimulusConfig {
    /// Step current
    Current {
        /// Target population name
        population: String,
        /// Amplitude (pA)
        amplitude: f64,
        /// Onset (ms)
        start_ms: f64,
        /// Offset (ms)
        stop_ms: f64,
    },
    /// Poisson spike source
    Poisson {
        /// Target population name
        population: String,
        /// Rate (Hz)
        rate_hz: f64,
        /// Weight per spike (pA)
        weight: f64,
        /// Onset (ms)
        start_ms: f64,
        /// Offset (ms)
        stop_ms: f64,
    },
    /// Spikes at fixed times
    SpikeTrain {
        /// Target population name
        population: String,
        /// Weight per spike (pA)
        weight: f64,
        /// Spike times (ms)
        times_ms: Vec<f64>,
    },
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationSection::default(),
            populations: vec![PopulationConfig {
                name: "pop".to_string(),
                params: GifPopParams::default(),
            }],
            connections: Vec::new(),
            stimuli: Vec::new(),
        }
    }
}

impl ExperimentConfig {
    /// Load an experiment from file; a missing file gives the default
    /// experiment
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            tracing::warn!("{} not found, using the default experiment", path.display());
            Ok(Self::default())
        }
    }

    /// Load from `path` if given, otherwise the default experiment
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize experiment: {}", e)))
    }

    /// Population names, in node order
    pub fn population_names(&self) -> Vec<String> {
        self.populations.iter().map(|p| p.name.clone()).collect()
    }

    /// Convert a time in ms to the nearest step
    fn to_steps(&self, ms: f64) -> u64 {
        (ms / self.simulation.dt_ms).round().max(0.0) as u64
    }

    /// Engine-level simulation parameters
    pub fn simulation_params(&self) -> CliResult<SimulationParams> {
        let sim = &self.simulation;
        if !(sim.dt_ms > 0.0 && sim.dt_ms.is_finite()) {
            return Err(CliError::config(format!("dt_ms must be > 0, got {}", sim.dt_ms)));
        }
        let params = SimulationParams {
            dt_ns: (sim.dt_ms * 1_000_000.0).round() as u64,
            duration_ns: (sim.duration_ms * 1_000_000.0).round().max(0.0) as u64,
            min_delay_steps: sim.min_delay_steps,
            random_seed: Some(sim.seed),
            record: sim.record.clone(),
            record_interval_steps: sim.record_interval_steps,
            max_recorded_events: sim.max_recorded_events,
            perf_enabled: sim.perf,
        };
        params.validate()?;
        Ok(params)
    }

    /// Build an engine with all populations, connections and stimuli
    pub fn build_engine(&self) -> CliResult<SimulationEngine> {
        if self.populations.is_empty() {
            return Err(CliError::config("experiment has no populations"));
        }

        let mut engine = SimulationEngine::new(self.simulation_params()?)?;
        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        for pop in &self.populations {
            let id = engine.add_population(pop.params.clone())?;
            if ids.insert(pop.name.as_str(), id).is_some() {
                return Err(CliError::config(format!(
                    "duplicate population name '{}'",
                    pop.name
                )));
            }
        }
        let lookup = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| CliError::config(format!("unknown population '{}'", name)))
        };

        for conn in &self.connections {
            let delay = (conn.delay_ms / self.simulation.dt_ms).round().max(0.0) as usize;
            engine.connect(lookup(&conn.source)?, lookup(&conn.target)?, conn.weight, delay)?;
        }

        for stim in &self.stimuli {
            let pattern = match stim {
                StimulusConfig::Current {
                    population,
                    amplitude,
                    start_ms,
                    stop_ms,
                } => StimulusPattern::Current {
                    node: lookup(population)?,
                    amplitude: *amplitude,
                    start_step: self.to_steps(*start_ms),
                    stop_step: self.to_steps(*stop_ms),
                },
                StimulusConfig::Poisson {
                    population,
                    rate_hz,
                    weight,
                    start_ms,
                    stop_ms,
                } => StimulusPattern::Poisson {
                    node: lookup(population)?,
                    rate_hz: *rate_hz,
                    weight: *weight,
                    start_step: self.to_steps(*start_ms),
                    stop_step: self.to_steps(*stop_ms),
                },
                StimulusConfig::SpikeTrain {
                    population,
                    weight,
                    times_ms,
                } => StimulusPattern::SpikeTrain {
                    node: lookup(population)?,
                    weight: *weight,
                    steps: times_ms.iter().map(|t| self.to_steps(*t)).collect(),
                },
            };
            engine.add_stimulus(pattern)?;
        }

        Ok(engine)
    }
}
