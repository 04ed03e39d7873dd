//! Slice-based simulation engine for networks of populations
//!
//! Time advances in slices of `min_delay_steps` steps. Within a slice every
//! population is updated independently (in parallel with the `parallel`
//! feature); the spike counts they emit are buffered and only delivered to
//! their targets once the slice is complete. Because every connection delay
//! is at least one slice long, delivered input always lands in a later
//! slice.

use crate::{
    error::*,
    params::GifPopParams,
    population::{GifPopulation, SpikeCountEvent},
    recordables::Recordable,
    DEFAULT_SEED,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Index of a population in the engine
pub type NodeId = u32;

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationParams {
    /// Time step duration (ns)
    pub dt_ns: u64,
    /// Total simulation duration (ns)
    pub duration_ns: u64,
    /// Steps per slice; lower bound for every connection delay
    pub min_delay_steps: usize,
    /// Seed for populations and stimulus generators
    pub random_seed: Option<u64>,
    /// Observables sampled from every population
    pub record: Vec<Recordable>,
    /// Sample observables every this many steps
    pub record_interval_steps: usize,
    /// Maximum spike events to record (prevents memory issues)
    pub max_recorded_events: Option<usize>,
    /// Enable performance sampling
    pub perf_enabled: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt_ns: crate::DEFAULT_TIMESTEP_NS, // 0.1ms timestep
            duration_ns: 1_000_000_000,        // 1 second
            min_delay_steps: 10,               // 1ms slices
            random_seed: None,
            record: Vec::new(),
            record_interval_steps: 1,
            max_recorded_events: Some(1_000_000),
            perf_enabled: false,
        }
    }
}

impl SimulationParams {
    /// Create new simulation parameters with validation
    pub fn new(dt_ns: u64, duration_ns: u64) -> Result<Self> {
        let params = Self {
            dt_ns,
            duration_ns,
            ..Default::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the slice length in steps
    pub fn with_min_delay(mut self, steps: usize) -> Self {
        self.min_delay_steps = steps;
        self
    }

    /// Sample these observables every `interval` steps
    pub fn with_recording(mut self, record: Vec<Recordable>, interval: usize) -> Self {
        self.record = record;
        self.record_interval_steps = interval;
        self
    }

    /// Set maximum event recording limit
    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.max_recorded_events = Some(limit);
        self
    }

    /// Enable or disable performance sampling
    pub fn with_perf(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    /// Get timestep in milliseconds
    pub fn dt_ms(&self) -> f64 {
        self.dt_ns as f64 / 1_000_000.0
    }

    /// Get duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.duration_ns as f64 / 1_000_000.0
    }

    /// Get number of simulation steps
    pub fn num_steps(&self) -> usize {
        (self.duration_ns / self.dt_ns) as usize
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.dt_ns == 0 {
            return Err(RuntimeError::invalid_parameter("dt_ns", "0", "> 0"));
        }
        if self.duration_ns == 0 {
            return Err(RuntimeError::invalid_parameter("duration_ns", "0", "> 0"));
        }
        if self.duration_ns < self.dt_ns {
            return Err(RuntimeError::invalid_parameter(
                "duration_ns",
                format!("{} (with dt_ns={})", self.duration_ns, self.dt_ns),
                ">= dt_ns",
            ));
        }
        if self.min_delay_steps == 0 {
            return Err(RuntimeError::invalid_parameter("min_delay_steps", "0", ">= 1"));
        }
        if self.record_interval_steps == 0 {
            return Err(RuntimeError::invalid_parameter(
                "record_interval_steps",
                "0",
                ">= 1",
            ));
        }
        Ok(())
    }
}

/// Weighted, delayed projection of one population's spike counts onto
/// another
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    /// Emitting population
    pub source: NodeId,
    /// Receiving population
    pub target: NodeId,
    /// Synaptic weight per spike (pA)
    pub weight: f64,
    /// Transmission delay (steps)
    pub delay_steps: usize,
}

/// Input stimulus pattern
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum StimulusPattern {
    /// Step current injection over `[start_step, stop_step)`
    Current {
        /// Target population
        node: NodeId,
        /// Current amplitude (pA)
        amplitude: f64,
        /// First step with current
        start_step: u64,
        /// First step without current
        stop_step: u64,
    },
    /// Poisson spike source over `[start_step, stop_step)`
    Poisson {
        /// Target population
        node: NodeId,
        /// Firing rate (Hz)
        rate_hz: f64,
        /// Weight per spike (pA)
        weight: f64,
        /// First active step
        start_step: u64,
        /// First inactive step
        stop_step: u64,
    },
    /// Spikes at fixed steps
    SpikeTrain {
        /// Target population
        node: NodeId,
        /// Weight per spike (pA)
        weight: f64,
        /// Delivery steps
        steps: Vec<u64>,
    },
}

impl StimulusPattern {
    /// Target population
    pub fn node(&self) -> NodeId {
        match self {
            Self::Current { node, .. } | Self::Poisson { node, .. } | Self::SpikeTrain { node, .. } => {
                *node
            }
        }
    }
}

/// Spike count emitted by a population in one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PopulationSpikes {
    /// Emitting population
    pub node: NodeId,
    /// Emission step
    pub step: u64,
    /// Number of spikes
    pub multiplicity: u64,
}

/// Recorded observable sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservableSample {
    /// Sampled population
    pub node: NodeId,
    /// Sample step
    pub step: u64,
    /// Observable
    pub recordable: Recordable,
    /// Value after the step's update
    pub value: f64,
}

/// Performance metrics collected during simulation slices.
/// Present when SimulationParams::with_perf(true) is used.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerfReport {
    /// Average step time in nanoseconds
    pub avg_step_ns: u64,
    /// Max step time in nanoseconds (slice time over slice length)
    pub max_step_ns: u64,
    /// Steps sampled
    pub steps: usize,
}

/// Simulation results
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationResult {
    /// Recorded spike counts, in step order then node order
    pub events: Vec<PopulationSpikes>,
    /// Recorded observable samples
    pub samples: Vec<ObservableSample>,
    /// Population sizes, indexed by node
    pub population_sizes: Vec<u64>,
    /// Time step (ns)
    pub dt_ns: u64,
    /// Number of steps executed
    pub steps_executed: usize,
    /// Total number of spikes, recorded or not
    pub total_spikes: u64,
    /// Optional performance report
    pub perf: Option<PerfReport>,
}

impl SimulationResult {
    /// Create a new empty result
    pub fn new(dt_ns: u64, population_sizes: Vec<u64>) -> Self {
        Self {
            events: Vec::new(),
            samples: Vec::new(),
            population_sizes,
            dt_ns,
            steps_executed: 0,
            total_spikes: 0,
            perf: None,
        }
    }

    /// Get spike events of one population
    pub fn spikes_for(&self, node: NodeId) -> Vec<&PopulationSpikes> {
        self.events.iter().filter(|e| e.node == node).collect()
    }

    /// Dense per-step spike counts of one population
    pub fn spike_counts(&self, node: NodeId) -> Vec<u64> {
        let mut counts = vec![0; self.steps_executed];
        for event in self.spikes_for(node) {
            if let Some(slot) = counts.get_mut(event.step as usize) {
                *slot += event.multiplicity;
            }
        }
        counts
    }

    /// Mean firing rate per neuron of one population (Hz)
    pub fn population_rate_hz(&self, node: NodeId) -> f64 {
        let n = match self.population_sizes.get(node as usize) {
            Some(n) if *n > 0 => *n as f64,
            _ => return 0.0,
        };
        let duration_s = self.steps_executed as f64 * self.dt_ns as f64 / 1_000_000_000.0;
        if duration_s <= 0.0 {
            return 0.0;
        }
        let spikes: u64 = self.spikes_for(node).iter().map(|e| e.multiplicity).sum();
        spikes as f64 / (n * duration_s)
    }

    /// Get samples of one observable of one population
    pub fn samples_for(&self, node: NodeId, recordable: Recordable) -> Vec<&ObservableSample> {
        self.samples
            .iter()
            .filter(|s| s.node == node && s.recordable == recordable)
            .collect()
    }
}

/// Output of one population over one slice
type SliceOutput = (Vec<SpikeCountEvent>, Vec<ObservableSample>);

/// Simulation engine
#[derive(Debug)]
pub struct SimulationEngine {
    /// Simulation parameters
    params: SimulationParams,
    /// Configured populations; runs work on copies
    populations: Vec<GifPopulation>,
    /// Outgoing connections, indexed by source node
    outgoing: Vec<Vec<Connection>>,
    /// Input stimuli
    stimuli: Vec<StimulusPattern>,
    /// Populations as left by the last run
    last_state: Vec<GifPopulation>,
}

impl SimulationEngine {
    /// Create a new simulation engine
    pub fn new(params: SimulationParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            populations: Vec::new(),
            outgoing: Vec::new(),
            stimuli: Vec::new(),
            last_state: Vec::new(),
        })
    }

    /// Add a population and return its node id
    pub fn add_population(&mut self, params: GifPopParams) -> Result<NodeId> {
        let id = self.populations.len() as NodeId;
        self.populations.push(GifPopulation::new(params)?);
        self.outgoing.push(Vec::new());
        log::debug!("Added population {}", id);
        Ok(id)
    }

    /// Connect two populations. The delay must be at least one slice.
    pub fn connect(
        &mut self,
        source: NodeId,
        target: NodeId,
        weight: f64,
        delay_steps: usize,
    ) -> Result<()> {
        self.check_node(source)?;
        self.check_node(target)?;
        check_finite("weight", weight)?;
        if delay_steps < self.params.min_delay_steps {
            return Err(RuntimeError::invalid_config(format!(
                "connection {} -> {} has delay {} steps, below the minimum of {}",
                source, target, delay_steps, self.params.min_delay_steps
            )));
        }
        self.outgoing[source as usize].push(Connection {
            source,
            target,
            weight,
            delay_steps,
        });
        Ok(())
    }

    /// Add an input stimulus
    pub fn add_stimulus(&mut self, stimulus: StimulusPattern) -> Result<()> {
        self.check_node(stimulus.node())?;
        match &stimulus {
            StimulusPattern::Current { amplitude, .. } => check_finite("amplitude", *amplitude)?,
            StimulusPattern::Poisson {
                rate_hz, weight, ..
            } => {
                if !(*rate_hz >= 0.0 && rate_hz.is_finite()) {
                    return Err(RuntimeError::invalid_parameter(
                        "rate_hz",
                        rate_hz.to_string(),
                        "finite and >= 0.0",
                    ));
                }
                check_finite("weight", *weight)?;
            }
            StimulusPattern::SpikeTrain { weight, .. } => check_finite("weight", *weight)?,
        }
        self.stimuli.push(stimulus);
        Ok(())
    }

    fn check_node(&self, node_id: NodeId) -> Result<()> {
        if (node_id as usize) < self.populations.len() {
            Ok(())
        } else {
            Err(RuntimeError::NodeNotFound { node_id })
        }
    }

    /// Configured population
    pub fn population(&self, node_id: NodeId) -> Result<&GifPopulation> {
        self.populations
            .get(node_id as usize)
            .ok_or(RuntimeError::NodeNotFound { node_id })
    }

    /// Mutable access to a configured population, e.g. to set its initial
    /// state
    pub fn population_mut(&mut self, node_id: NodeId) -> Result<&mut GifPopulation> {
        self.populations
            .get_mut(node_id as usize)
            .ok_or(RuntimeError::NodeNotFound { node_id })
    }

    /// Populations as left by the last run
    pub fn final_state(&self) -> &[GifPopulation] {
        &self.last_state
    }

    /// Number of populations
    pub fn num_populations(&self) -> usize {
        self.populations.len()
    }

    /// All connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.outgoing.iter().flatten()
    }

    /// Get simulation parameters
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Run the complete simulation.
    ///
    /// Every run starts from the configured populations, so repeated runs
    /// with the same seed give identical results.
    pub fn run(&mut self) -> Result<SimulationResult> {
        log::info!(
            "Starting simulation: {}ms with {}ms timestep, {} populations",
            self.params.duration_ms(),
            self.params.dt_ms(),
            self.populations.len()
        );

        let num_steps = self.params.num_steps();
        let slice = self.params.min_delay_steps;
        let seed = self.params.random_seed.unwrap_or(DEFAULT_SEED);
        let max_delay = self
            .connections()
            .map(|c| c.delay_steps)
            .max()
            .unwrap_or(0);
        let horizon = slice + max_delay + 1;

        let mut nodes = self.populations.clone();
        for (i, node) in nodes.iter_mut().enumerate() {
            node.set_seed(seed.wrapping_add(i as u64));
            node.init_buffers(horizon, 0);
            node.calibrate(self.params.dt_ms())?;
        }
        let mut stimulus_rng = StdRng::seed_from_u64(seed.wrapping_add(nodes.len() as u64));

        let mut results = SimulationResult::new(
            self.params.dt_ns,
            nodes.iter().map(|n| n.params().n).collect(),
        );
        let mut perf_samples: Vec<u64> = Vec::new();
        let mut limit_reached = false;
        let progress_every = (num_steps / 10).max(1);
        let mut next_progress = 0;

        let mut origin = 0usize;
        while origin < num_steps {
            let len = slice.min(num_steps - origin);
            let slice_start = Instant::now();

            self.apply_stimuli(&mut nodes, origin as u64, len, &mut stimulus_rng)?;

            let outputs = advance_all(
                &mut nodes,
                origin as u64,
                len,
                &self.params.record,
                self.params.record_interval_steps,
            )?;

            // deliver only after every population finished the slice
            for (source, (events, _)) in outputs.iter().enumerate() {
                for event in events {
                    for conn in &self.outgoing[source] {
                        nodes[conn.target as usize].handle_spike(
                            event.step + conn.delay_steps as u64,
                            conn.weight,
                            event.multiplicity,
                        )?;
                    }
                }
            }

            let mut slice_events: Vec<PopulationSpikes> = outputs
                .iter()
                .enumerate()
                .flat_map(|(node, (events, _))| {
                    events.iter().map(move |e| PopulationSpikes {
                        node: node as NodeId,
                        step: e.step,
                        multiplicity: e.multiplicity,
                    })
                })
                .collect();
            slice_events.sort_by_key(|e| (e.step, e.node));
            results.total_spikes += slice_events.iter().map(|e| e.multiplicity).sum::<u64>();

            if !limit_reached {
                let room = self
                    .params
                    .max_recorded_events
                    .map_or(usize::MAX, |max| max.saturating_sub(results.events.len()));
                if slice_events.len() > room {
                    log::warn!(
                        "Event recording limit reached: {}",
                        self.params.max_recorded_events.unwrap_or(0)
                    );
                    slice_events.truncate(room);
                    limit_reached = true;
                }
                results.events.extend(slice_events);
            }

            for (_, samples) in outputs {
                results.samples.extend(samples);
            }

            if self.params.perf_enabled {
                let per_step = slice_start.elapsed().as_nanos() as u64 / len as u64;
                perf_samples.extend(std::iter::repeat(per_step).take(len));
            }

            origin += len;
            results.steps_executed = origin;

            if origin >= next_progress {
                let progress = (origin as f32 / num_steps as f32) * 100.0;
                log::debug!("Simulation progress: {:.1}%", progress);
                next_progress = origin + progress_every;
            }
        }

        results
            .samples
            .sort_by_key(|s| (s.step, s.node, s.recordable));

        log::info!(
            "Simulation completed: {} spikes in {} steps",
            results.total_spikes,
            results.steps_executed
        );

        if self.params.perf_enabled && !perf_samples.is_empty() {
            let steps = perf_samples.len();
            let sum: u128 = perf_samples.iter().map(|v| *v as u128).sum();
            let avg = (sum / steps as u128) as u64;
            let max = perf_samples.iter().copied().max().unwrap_or(0);
            results.perf = Some(PerfReport {
                avg_step_ns: avg,
                max_step_ns: max,
                steps,
            });
        }

        self.last_state = nodes;
        Ok(results)
    }

    /// Deposit stimulus input for steps `origin .. origin + len`
    fn apply_stimuli(
        &self,
        nodes: &mut [GifPopulation],
        origin: u64,
        len: usize,
        rng: &mut StdRng,
    ) -> Result<()> {
        let end = origin + len as u64;
        let dt_s = self.params.dt_ns as f64 / 1_000_000_000.0;

        for stimulus in &self.stimuli {
            match stimulus {
                StimulusPattern::Current {
                    node,
                    amplitude,
                    start_step,
                    stop_step,
                } => {
                    for step in origin.max(*start_step)..end.min(*stop_step) {
                        nodes[*node as usize].handle_current(step, 1.0, *amplitude)?;
                    }
                }
                StimulusPattern::Poisson {
                    node,
                    rate_hz,
                    weight,
                    start_step,
                    stop_step,
                } => {
                    let mean = rate_hz * dt_s;
                    if mean <= 0.0 {
                        continue;
                    }
                    let poisson = Poisson::new(mean).map_err(|e| {
                        RuntimeError::invalid_parameter("rate_hz", rate_hz.to_string(), e.to_string())
                    })?;
                    for step in origin.max(*start_step)..end.min(*stop_step) {
                        let count = poisson.sample(rng) as u64;
                        if count > 0 {
                            nodes[*node as usize].handle_spike(step, *weight, count)?;
                        }
                    }
                }
                StimulusPattern::SpikeTrain { node, weight, steps } => {
                    for &step in steps.iter().filter(|s| (origin..end).contains(*s)) {
                        nodes[*node as usize].handle_spike(step, *weight, 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RuntimeError::invalid_parameter(name, value.to_string(), "finite"))
    }
}

/// Advance every population over one slice
fn advance_all(
    nodes: &mut [GifPopulation],
    origin: u64,
    len: usize,
    record: &[Recordable],
    interval: usize,
) -> Result<Vec<SliceOutput>> {
    #[cfg(feature = "parallel")]
    {
        nodes
            .par_iter_mut()
            .enumerate()
            .map(|(i, node)| advance_slice(node, i as NodeId, origin, len, record, interval))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        nodes
            .iter_mut()
            .enumerate()
            .map(|(i, node)| advance_slice(node, i as NodeId, origin, len, record, interval))
            .collect()
    }
}

/// Advance one population step by step over a slice, sampling observables
/// after each recorded step
fn advance_slice(
    node: &mut GifPopulation,
    id: NodeId,
    origin: u64,
    len: usize,
    record: &[Recordable],
    interval: usize,
) -> Result<SliceOutput> {
    if record.is_empty() {
        return Ok((node.update(origin, 0, len)?, Vec::new()));
    }

    let mut events = Vec::new();
    let mut samples = Vec::new();
    for lag in 0..len {
        events.extend(node.update(origin, lag, lag + 1)?);
        let step = origin + lag as u64;
        if step % interval as u64 == 0 {
            samples.extend(record.iter().map(|&recordable| ObservableSample {
                node: id,
                step,
                recordable,
                value: node.observable(recordable),
            }));
        }
    }
    Ok((events, samples))
}

/// Run a fixed-step deterministic simulation of unconnected populations
pub fn run_fixed_step(
    populations: Vec<GifPopParams>,
    dt_ns: u64,
    duration_ns: u64,
    seed: Option<u64>,
) -> Result<SimulationResult> {
    let params = SimulationParams::new(dt_ns, duration_ns)?.with_event_limit(1_000_000);
    let mut engine = SimulationEngine::new(SimulationParams {
        random_seed: seed,
        ..params
    })?;
    for p in populations {
        engine.add_population(p)?;
    }
    engine.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> GifPopParams {
        GifPopParams {
            len_kernel: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_params_default() {
        let params = SimulationParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.dt_ms(), 0.1);
        assert_eq!(params.num_steps(), 10_000);
    }

    #[test]
    fn test_simulation_params_validation() {
        assert!(SimulationParams::new(0, 1_000_000).is_err());
        assert!(SimulationParams::new(100_000, 0).is_err());
        assert!(SimulationParams::new(1_000_000, 100_000).is_err());
        assert!(SimulationParams::new(100_000, 1_000_000).is_ok());

        let params = SimulationParams::default().with_min_delay(0);
        assert!(params.validate().is_err());
        let params = SimulationParams::default().with_recording(vec![Recordable::VM], 0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_connect_checks() {
        let mut engine = SimulationEngine::new(SimulationParams::default()).unwrap();
        let a = engine.add_population(small_params()).unwrap();
        let b = engine.add_population(small_params()).unwrap();

        assert_eq!(
            engine.connect(a, 7, 1.0, 10),
            Err(RuntimeError::NodeNotFound { node_id: 7 })
        );
        assert!(matches!(
            engine.connect(a, b, 1.0, 5),
            Err(RuntimeError::InvalidConfiguration { .. })
        ));
        assert!(engine.connect(a, b, 1.0, 10).is_ok());
        assert_eq!(engine.connections().count(), 1);

        let stim = StimulusPattern::SpikeTrain {
            node: 3,
            weight: 1.0,
            steps: vec![1],
        };
        assert!(engine.add_stimulus(stim).is_err());
    }

    #[test]
    fn test_stimulus_values_must_be_finite() {
        let mut engine = SimulationEngine::new(SimulationParams::default()).unwrap();
        let a = engine.add_population(small_params()).unwrap();

        let rejected = [
            StimulusPattern::SpikeTrain {
                node: a,
                weight: f64::NAN,
                steps: vec![1],
            },
            StimulusPattern::Poisson {
                node: a,
                rate_hz: 10.0,
                weight: f64::INFINITY,
                start_step: 0,
                stop_step: 10,
            },
            StimulusPattern::Poisson {
                node: a,
                rate_hz: f64::NAN,
                weight: 1.0,
                start_step: 0,
                stop_step: 10,
            },
            StimulusPattern::Current {
                node: a,
                amplitude: f64::NAN,
                start_step: 0,
                stop_step: 10,
            },
        ];
        for stim in rejected {
            assert!(matches!(
                engine.add_stimulus(stim),
                Err(RuntimeError::InvalidParameter { .. })
            ));
        }

        let accepted = StimulusPattern::SpikeTrain {
            node: a,
            weight: -2.0,
            steps: vec![1],
        };
        assert!(engine.add_stimulus(accepted).is_ok());
    }

    #[test]
    fn test_result_helpers() {
        let mut result = SimulationResult::new(100_000, vec![100, 50]);
        result.steps_executed = 10_000; // 1 second
        result.events.push(PopulationSpikes {
            node: 0,
            step: 3,
            multiplicity: 40,
        });
        result.events.push(PopulationSpikes {
            node: 0,
            step: 9,
            multiplicity: 60,
        });
        result.events.push(PopulationSpikes {
            node: 1,
            step: 3,
            multiplicity: 5,
        });

        assert_eq!(result.spikes_for(0).len(), 2);
        let counts = result.spike_counts(0);
        assert_eq!(counts.len(), 10_000);
        assert_eq!(counts[3], 40);
        assert_eq!(counts[9], 60);
        assert!((result.population_rate_hz(0) - 1.0).abs() < 1e-12);
        assert!((result.population_rate_hz(1) - 0.1).abs() < 1e-12);
        assert_eq!(result.population_rate_hz(5), 0.0);
    }

    #[test]
    fn test_recording_samples_every_interval() {
        let params = SimulationParams::new(100_000, 10_000_000)
            .unwrap()
            .with_recording(vec![Recordable::VM, Recordable::Mean], 5);
        let mut engine = SimulationEngine::new(params).unwrap();
        engine.add_population(small_params()).unwrap();

        let result = engine.run().unwrap();
        assert_eq!(result.steps_executed, 100);
        assert_eq!(result.samples_for(0, Recordable::VM).len(), 20);
        assert_eq!(result.samples_for(0, Recordable::Mean).len(), 20);
        assert!(result.samples_for(0, Recordable::ISynEx).is_empty());
    }

    #[test]
    fn test_partial_last_slice() {
        // 25 steps with 10-step slices
        let params = SimulationParams::new(100_000, 2_500_000).unwrap();
        let mut engine = SimulationEngine::new(params).unwrap();
        engine.add_population(small_params()).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.steps_executed, 25);
    }

    #[test]
    fn test_current_stimulus_depolarizes() {
        let params = SimulationParams::new(100_000, 20_000_000)
            .unwrap()
            .with_recording(vec![Recordable::VM], 1);
        let mut engine = SimulationEngine::new(params).unwrap();
        let node = engine
            .add_population(GifPopParams {
                lambda_0: 0.0,
                ..small_params()
            })
            .unwrap();
        engine
            .add_stimulus(StimulusPattern::Current {
                node,
                amplitude: 100.0,
                start_step: 50,
                stop_step: 200,
            })
            .unwrap();

        let result = engine.run().unwrap();
        let v: Vec<f64> = result
            .samples_for(node, Recordable::VM)
            .iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(v[50], 0.0);
        assert!(v[51] > 0.0);
        assert!(v[199] > v[100]);
        assert_eq!(result.total_spikes, 0);
    }

    #[test]
    fn test_runs_are_repeatable() {
        let params = SimulationParams::new(100_000, 50_000_000)
            .unwrap()
            .with_seed(7);
        let mut engine = SimulationEngine::new(params).unwrap();
        let node = engine
            .add_population(GifPopParams {
                i_e: 400.0,
                ..small_params()
            })
            .unwrap();
        engine.connect(node, node, 5.0, 10).unwrap();

        let first = engine.run().unwrap();
        let second = engine.run().unwrap();
        assert!(first.total_spikes > 0);
        assert_eq!(first.events, second.events);
        assert_eq!(engine.final_state().len(), 1);
    }

    #[test]
    fn test_event_limit() {
        let params = SimulationParams::new(100_000, 50_000_000)
            .unwrap()
            .with_event_limit(3);
        let mut engine = SimulationEngine::new(params).unwrap();
        engine
            .add_population(GifPopParams {
                i_e: 600.0,
                ..small_params()
            })
            .unwrap();

        let result = engine.run().unwrap();
        assert_eq!(result.events.len(), 3);
        assert!(result.total_spikes > 3);
        assert_eq!(result.steps_executed, 500);
    }

    #[test]
    fn test_run_fixed_step_smoke() {
        let result = run_fixed_step(vec![small_params()], 100_000, 1_000_000, Some(1234)).unwrap();
        assert_eq!(result.steps_executed, 10);
        assert_eq!(result.population_sizes, vec![100]);
    }

    #[test]
    fn test_perf_report() {
        let params = SimulationParams::new(100_000, 1_000_000)
            .unwrap()
            .with_perf(true);
        let mut engine = SimulationEngine::new(params).unwrap();
        engine.add_population(small_params()).unwrap();
        let result = engine.run().unwrap();
        let perf = result.perf.unwrap();
        assert_eq!(perf.steps, 10);
        assert!(perf.max_step_ns >= perf.avg_step_ns);
    }
}
