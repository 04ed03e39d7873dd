//! Population-density model of generalized integrate-and-fire neurons
//!
//! This crate simulates finite populations of GIF neurons with exponential
//! synaptic currents and spike-frequency adaptation at the level of
//! population spike counts: instead of tracking every neuron, neurons are
//! grouped by the time since their last spike and the number of spikes per
//! step is drawn from the expected count.
//!
//! [`GifPopulation`] is a single model instance; [`SimulationEngine`]
//! connects several of them and advances them in slices, delivering spike
//! counts with delays.

#![deny(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod buffer;
pub mod error;
pub mod hazard;
pub mod history;
pub mod kernel;
pub mod params;
pub mod population;
pub mod recordables;
pub mod sampler;
pub mod simulation;
pub mod status;
pub mod synapse;

// Re-export essential types
pub use error::{Result, RuntimeError};
pub use params::GifPopParams;
pub use population::{GifPopState, GifPopulation, SpikeCountEvent};
pub use recordables::Recordable;
pub use sampler::SpikeCountSampler;
pub use simulation::{
    NodeId, SimulationEngine, SimulationParams, SimulationResult, StimulusPattern,
};
pub use status::{StatusDict, StatusValue};

/// Runtime crate version for compatibility checking
pub const RUNTIME_VERSION: u32 = 1;

/// Default simulation time step (0.1 millisecond in nanoseconds)
pub const DEFAULT_TIMESTEP_NS: u64 = 100_000;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Input buffer size of a population used outside the engine (steps)
pub const DEFAULT_BUFFER_HORIZON: usize = 1024;
