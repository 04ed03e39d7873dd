//! Mesoscopic population of GIF neurons with exponential PSCs
//!
//! [`GifPopulation`] is a single model instance: it receives weighted spike
//! and current input, advances the population one step at a time and emits
//! the number of spikes drawn in each step as a [`SpikeCountEvent`].

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::buffer::RingBuffer;
use crate::error::*;
use crate::hazard::EscapeRate;
use crate::history::PopulationHistory;
use crate::kernel;
use crate::params::GifPopParams;
use crate::recordables::Recordable;
use crate::sampler::SpikeCountSampler;
use crate::status::{self, StatusDict, StatusValue};
use crate::synapse::MembranePropagator;
use crate::{DEFAULT_BUFFER_HORIZON, DEFAULT_SEED};

/// Dynamic state of a population
#[derive(Debug, Clone, PartialEq)]
pub struct GifPopState {
    /// Current input deposited in the previous step (pA)
    pub y0: f64,
    /// Filtered excitatory synaptic current (pA)
    pub i_syn_ex: f64,
    /// Filtered inhibitory synaptic current (pA)
    pub i_syn_in: f64,
    /// Membrane potential of the free population (mV)
    pub v_m: f64,
    /// Expected number of spikes in the last step
    pub n_expect: f64,
    /// Number of spikes drawn in the last step
    pub n_spikes: u64,
    /// Adaptive threshold of the free population (mV)
    pub theta_hat: f64,
    /// Whether the history buffers have been set up for the current state
    pub initialized: bool,
}

impl Default for GifPopState {
    fn default() -> Self {
        Self {
            y0: 0.0,
            i_syn_ex: 0.0,
            i_syn_in: 0.0,
            v_m: 0.0,
            n_expect: 0.0,
            n_spikes: 0,
            theta_hat: 0.0,
            initialized: false,
        }
    }
}

impl GifPopState {
    /// Names of the writable state entries
    pub const WRITABLE: [&'static str; 3] = ["V_m", "I_syn_ex", "I_syn_in"];

    /// Export state as named status entries
    pub fn get_status(&self, dict: &mut StatusDict) {
        dict.insert("V_m".into(), self.v_m.into());
        dict.insert("n_events".into(), StatusValue::Int(self.n_spikes as i64));
        dict.insert("E_sfa".into(), self.theta_hat.into());
        dict.insert("mean".into(), self.n_expect.into());
        dict.insert("I_syn_ex".into(), self.i_syn_ex.into());
        dict.insert("I_syn_in".into(), self.i_syn_in.into());
    }

    /// Apply writable state entries. If any of them is present the history
    /// must be rebuilt at the next calibration.
    pub fn with_status(&self, dict: &StatusDict) -> Result<Self> {
        let mut s = self.clone();
        status::update_f64(dict, "V_m", &mut s.v_m)?;
        status::update_f64(dict, "I_syn_ex", &mut s.i_syn_ex)?;
        status::update_f64(dict, "I_syn_in", &mut s.i_syn_in)?;
        if Self::WRITABLE.iter().any(|name| dict.contains_key(*name)) {
            s.initialized = false;
        }
        Ok(s)
    }
}

/// Output event: `multiplicity` spikes emitted by the population at `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpikeCountEvent {
    /// Absolute step of emission
    pub step: u64,
    /// Number of spikes in that step
    pub multiplicity: u64,
}

/// Quantities derived at calibration
#[derive(Debug, Clone, Copy)]
struct Calibration {
    h: f64,
    prop: MembranePropagator,
    hazard: EscapeRate,
    sampler: SpikeCountSampler,
}

/// A finite population of GIF neurons simulated at the level of spike
/// counts
#[derive(Debug, Clone)]
pub struct GifPopulation {
    params: GifPopParams,
    state: GifPopState,
    ex_spikes: RingBuffer,
    in_spikes: RingBuffer,
    currents: RingBuffer,
    calibration: Option<Calibration>,
    history: Option<PopulationHistory>,
    rng: StdRng,
    seed: u64,
}

impl GifPopulation {
    /// Create a population with the default random seed
    pub fn new(params: GifPopParams) -> Result<Self> {
        Self::with_seed(params, DEFAULT_SEED)
    }

    /// Create a population drawing its spike counts from a source seeded
    /// with `seed`
    pub fn with_seed(params: GifPopParams, seed: u64) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: GifPopState::default(),
            ex_spikes: RingBuffer::new(DEFAULT_BUFFER_HORIZON),
            in_spikes: RingBuffer::new(DEFAULT_BUFFER_HORIZON),
            currents: RingBuffer::new(DEFAULT_BUFFER_HORIZON),
            calibration: None,
            history: None,
            rng: StdRng::seed_from_u64(seed),
            seed,
        })
    }

    /// Model parameters
    pub fn params(&self) -> &GifPopParams {
        &self.params
    }

    /// Dynamic state
    pub fn state(&self) -> &GifPopState {
        &self.state
    }

    /// Refractory history, available after calibration
    pub fn history(&self) -> Option<&PopulationHistory> {
        self.history.as_ref()
    }

    /// Seed of the spike-count random source
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseed the spike-count random source
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Replace all parameters. Takes effect at the next calibration.
    pub fn set_params(&mut self, params: GifPopParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.calibration = None;
        Ok(())
    }

    /// Named view of parameters and state
    pub fn get_status(&self) -> StatusDict {
        let mut dict = StatusDict::new();
        self.params.get_status(&mut dict);
        self.state.get_status(&mut dict);
        dict
    }

    /// Apply named parameter and state entries.
    ///
    /// Nothing is changed unless all entries are valid. Writing any state
    /// entry forces the history to be rebuilt at the next calibration.
    pub fn set_status(&mut self, dict: &StatusDict) -> Result<()> {
        let params = self.params.with_status(dict)?;
        let state = self.state.with_status(dict)?;
        self.params = params;
        self.state = state;
        self.calibration = None;
        Ok(())
    }

    /// Current value of an observable
    pub fn observable(&self, recordable: Recordable) -> f64 {
        match recordable {
            Recordable::VM => self.state.v_m,
            Recordable::NEvents => self.state.n_spikes as f64,
            Recordable::ESfa => self.state.theta_hat,
            Recordable::Mean => self.state.n_expect,
            Recordable::ISynEx => self.state.i_syn_ex,
            Recordable::ISynIn => self.state.i_syn_in,
        }
    }

    /// Resize and clear the input buffers so they can hold deliveries up to
    /// `horizon` steps ahead of `origin`, the next step to be processed.
    pub fn init_buffers(&mut self, horizon: usize, origin: u64) {
        for buf in [&mut self.ex_spikes, &mut self.in_spikes, &mut self.currents] {
            if buf.horizon() != horizon.max(1) {
                *buf = RingBuffer::new(horizon);
            }
            buf.clear(origin);
        }
    }

    /// Prepare the model for stepping with resolution `h` (ms).
    ///
    /// Decay constants and kernel tables are derived every time; the
    /// history itself is only (re)allocated when the state was not yet
    /// initialized or no longer fits the parameters.
    pub fn calibrate(&mut self, h: f64) -> Result<()> {
        if !(h > 0.0 && h.is_finite()) {
            return Err(RuntimeError::invalid_parameter(
                "resolution",
                h.to_string(),
                "finite and > 0.0",
            ));
        }
        self.params.validate_for_calibration()?;

        let len = if self.params.len_kernel < 1 {
            kernel::history_size(&self.params, h)
        } else {
            self.params.len_kernel as usize
        };

        self.params.len_kernel = len as i64;

        let reuse = self.state.initialized
            && self.history.as_ref().map_or(false, |hist| {
                hist.fits(len, self.params.num_adaptation_terms(), self.params.n)
            });

        if reuse {
            if let Some(history) = self.history.as_mut() {
                history.rebuild_kernel(&self.params, h);
            }
        } else {
            let history = PopulationHistory::new(&self.params, h, len);
            log::debug!(
                "Initialized population history: N={}, len_kernel={}, k_ref={}",
                self.params.n,
                history.len(),
                history.k_ref()
            );
            self.history = Some(history);
            self.state.initialized = true;
        }

        self.calibration = Some(Calibration {
            h,
            prop: MembranePropagator::new(&self.params, h),
            hazard: EscapeRate::from_params(&self.params),
            sampler: SpikeCountSampler::from_flag(self.params.bino_rand),
        });
        Ok(())
    }

    /// Resolution the model was calibrated with (ms)
    pub fn resolution(&self) -> Option<f64> {
        self.calibration.map(|c| c.h)
    }

    /// Deposit weighted spikes delivered at `step`.
    ///
    /// Positive total weight goes to the excitatory channel, everything else
    /// to the inhibitory one.
    pub fn handle_spike(&mut self, step: u64, weight: f64, multiplicity: u64) -> Result<()> {
        let s = weight * multiplicity as f64;
        if s > 0.0 {
            self.ex_spikes.add_value(step, s)
        } else {
            self.in_spikes.add_value(step, s)
        }
    }

    /// Deposit a weighted current delivered at `step`
    pub fn handle_current(&mut self, step: u64, weight: f64, current: f64) -> Result<()> {
        self.currents.add_value(step, weight * current)
    }

    /// Advance over steps `origin + from .. origin + to`, returning one event
    /// per step in which spikes were drawn.
    pub fn update(&mut self, origin: u64, from: usize, to: usize) -> Result<Vec<SpikeCountEvent>> {
        let cal = self.calibration.ok_or(RuntimeError::NotCalibrated)?;
        if from >= to {
            return Err(RuntimeError::InvalidStepRange { from, to });
        }
        let expected = self.ex_spikes.origin();
        if origin + from as u64 != expected {
            return Err(RuntimeError::StepOutOfOrder {
                expected,
                found: origin + from as u64,
            });
        }
        let history = self.history.as_mut().ok_or(RuntimeError::NotCalibrated)?;

        let n = self.params.n;
        let rng = &mut self.rng;
        let mut events = Vec::new();

        for lag in from..to {
            let step = origin + lag as u64;

            let s_ex = self.ex_spikes.take(step);
            let s_in = self.in_spikes.take(step);
            let h_tot = cal.prop.drive(
                self.state.y0,
                &mut self.state.i_syn_ex,
                &mut self.state.i_syn_in,
                s_ex,
                s_in,
            );
            self.state.y0 = self.currents.take(step);

            let result = history.step(
                &self.params,
                &cal.prop,
                &cal.hazard,
                h_tot,
                &mut self.state.v_m,
                |n_expect| cal.sampler.draw(n_expect, n, &mut *rng),
            );

            self.state.n_expect = result.n_expect;
            self.state.n_spikes = result.n_spikes;
            self.state.theta_hat = result.theta_hat;

            if result.n_spikes > 0 {
                log::trace!("step {}: {} spikes", step, result.n_spikes);
                events.push(SpikeCountEvent {
                    step,
                    multiplicity: result.n_spikes,
                });
            }
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f64 = 0.1;

    fn calibrated(params: GifPopParams) -> GifPopulation {
        let mut pop = GifPopulation::new(params).unwrap();
        pop.calibrate(H).unwrap();
        pop
    }

    #[test]
    fn test_creation_validates() {
        let params = GifPopParams {
            tau_m: 0.0,
            ..Default::default()
        };
        assert!(GifPopulation::new(params).is_err());
        assert!(GifPopulation::new(GifPopParams::default()).is_ok());
    }

    #[test]
    fn test_update_requires_calibration() {
        let mut pop = GifPopulation::new(GifPopParams::default()).unwrap();
        assert_eq!(pop.update(0, 0, 10), Err(RuntimeError::NotCalibrated));
    }

    #[test]
    fn test_calibration_sizes_history() {
        let pop = calibrated(GifPopParams::default());
        assert_eq!(pop.params().len_kernel, 2749);
        assert_eq!(pop.history().unwrap().len(), 2749);
        assert!(pop.state().initialized);
        assert_eq!(pop.resolution(), Some(H));

        let explicit = calibrated(GifPopParams {
            len_kernel: 300,
            ..Default::default()
        });
        assert_eq!(explicit.history().unwrap().len(), 300);
    }

    #[test]
    fn test_calibration_rejects_empty_adaptation() {
        let mut pop = GifPopulation::new(GifPopParams {
            tau_sfa: vec![],
            q_sfa: vec![],
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            pop.calibrate(H),
            Err(RuntimeError::InvalidConfiguration { .. })
        ));
        assert!(pop.calibrate(0.0).is_err());
    }

    #[test]
    fn test_step_range_checks() {
        let mut pop = calibrated(GifPopParams::default());
        assert_eq!(
            pop.update(0, 5, 5),
            Err(RuntimeError::InvalidStepRange { from: 5, to: 5 })
        );
        pop.update(0, 0, 10).unwrap();
        assert_eq!(
            pop.update(20, 0, 10),
            Err(RuntimeError::StepOutOfOrder {
                expected: 10,
                found: 20
            })
        );
        assert!(pop.update(10, 0, 10).is_ok());
    }

    #[test]
    fn test_recalibration_keeps_history() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 200,
            ..Default::default()
        });
        pop.update(0, 0, 50).unwrap();
        let head = pop.history().unwrap().head();
        assert_eq!(head, 50);

        pop.calibrate(H).unwrap();
        assert_eq!(pop.history().unwrap().head(), head);
    }

    #[test]
    fn test_state_overwrite_reinitializes_history() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 200,
            ..Default::default()
        });
        pop.update(0, 0, 50).unwrap();

        let mut dict = StatusDict::new();
        dict.insert("V_m".into(), 5.0.into());
        pop.set_status(&dict).unwrap();
        assert!(!pop.state().initialized);
        assert_eq!(pop.state().v_m, 5.0);

        pop.calibrate(H).unwrap();
        assert!(pop.state().initialized);
        assert_eq!(pop.history().unwrap().head(), 0);
    }

    #[test]
    fn test_automatic_length_restored_when_history_kept() {
        let mut pop = calibrated(GifPopParams::default());
        pop.update(0, 0, 20).unwrap();

        let mut dict = StatusDict::new();
        dict.insert("len_kernel".into(), StatusValue::Int(-1));
        pop.set_status(&dict).unwrap();
        assert_eq!(pop.params().len_kernel, -1);

        pop.calibrate(H).unwrap();
        assert_eq!(pop.get_status()["len_kernel"], StatusValue::Int(2749));
        let history = pop.history().unwrap();
        assert_eq!(history.len(), 2749);
        assert_eq!(history.head(), 20);
    }

    #[test]
    fn test_population_size_change_reinitializes_history() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 200,
            ..Default::default()
        });
        pop.update(0, 0, 30).unwrap();

        let mut dict = StatusDict::new();
        dict.insert("N".into(), StatusValue::Int(10));
        pop.set_status(&dict).unwrap();
        pop.calibrate(H).unwrap();

        let history = pop.history().unwrap();
        assert_eq!(history.head(), 0);
        assert_eq!(history.occupancy(), 10.0);
    }

    #[test]
    fn test_parameter_write_keeps_history_unless_shape_changes() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 200,
            ..Default::default()
        });
        pop.update(0, 0, 30).unwrap();

        let mut dict = StatusDict::new();
        dict.insert("I_e".into(), 20.0.into());
        pop.set_status(&dict).unwrap();
        assert!(pop.state().initialized);
        pop.calibrate(H).unwrap();
        assert_eq!(pop.history().unwrap().head(), 30);

        let mut dict = StatusDict::new();
        dict.insert("tau_sfa".into(), vec![100.0, 500.0].into());
        dict.insert("q_sfa".into(), vec![1.0, 0.5].into());
        pop.set_status(&dict).unwrap();
        pop.calibrate(H).unwrap();
        assert_eq!(pop.history().unwrap().head(), 0);
        assert_eq!(pop.history().unwrap().adaptation().len(), 2);
    }

    #[test]
    fn test_invalid_status_leaves_model_unchanged() {
        let mut pop = calibrated(GifPopParams::default());
        let before = pop.get_status();

        let mut dict = StatusDict::new();
        dict.insert("V_m".into(), 3.0.into());
        dict.insert("C_m".into(), (-1.0).into());
        assert!(pop.set_status(&dict).is_err());
        assert_eq!(pop.get_status(), before);
        assert!(pop.state().initialized);
    }

    #[test]
    fn test_status_contains_observables() {
        let pop = calibrated(GifPopParams::default());
        let dict = pop.get_status();
        for r in Recordable::ALL {
            assert!(dict.contains_key(r.name()), "missing {}", r.name());
        }
        assert_eq!(dict.get("len_kernel"), Some(&StatusValue::Int(2749)));
    }

    #[test]
    fn test_input_routing() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 100,
            ..Default::default()
        });
        pop.handle_spike(0, 2.0, 10).unwrap();
        pop.handle_spike(1, -4.0, 5).unwrap();
        pop.update(0, 0, 1).unwrap();
        assert!(pop.observable(Recordable::ISynEx) > 0.0);
        assert_eq!(pop.observable(Recordable::ISynIn), 0.0);
        pop.update(1, 0, 1).unwrap();
        assert!(pop.observable(Recordable::ISynIn) < 0.0);

        // deposits outside the buffer window are rejected
        assert!(pop.handle_spike(0, 1.0, 1).is_err());
        assert!(pop
            .handle_current(2 + DEFAULT_BUFFER_HORIZON as u64, 1.0, 1.0)
            .is_err());
    }

    #[test]
    fn test_current_applies_one_step_later() {
        let mut pop = calibrated(GifPopParams {
            len_kernel: 100,
            lambda_0: 0.0,
            ..Default::default()
        });
        pop.handle_current(0, 1.0, 500.0).unwrap();
        pop.update(0, 0, 1).unwrap();
        assert_eq!(pop.state().v_m, 0.0);
        assert_eq!(pop.state().y0, 500.0);
        pop.update(1, 0, 1).unwrap();
        assert!(pop.state().v_m > 0.0);
    }

    #[test]
    fn test_silent_population_never_spikes() {
        let mut pop = calibrated(GifPopParams {
            lambda_0: 0.0,
            i_e: 2000.0,
            len_kernel: 300,
            ..Default::default()
        });
        let events = pop.update(0, 0, 2000).unwrap();
        assert!(events.is_empty());
        assert_eq!(pop.state().n_spikes, 0);
        assert_eq!(pop.state().n_expect, 0.0);
    }

    #[test]
    fn test_strong_drive_emits_events() {
        let mut pop = calibrated(GifPopParams {
            i_e: 500.0,
            len_kernel: 300,
            ..Default::default()
        });
        let events = pop.update(0, 0, 3000).unwrap();
        assert!(!events.is_empty());
        for event in &events {
            assert!(event.multiplicity > 0);
            assert!(event.multiplicity <= 100);
        }
        // events are reported in step order
        assert!(events.windows(2).all(|w| w[0].step < w[1].step));
    }
}
