//! Refractory history and occupancy bookkeeping of the population
//!
//! Neurons are grouped by the time since their last spike. The last `K`
//! steps each own a cohort slot in a rotating buffer; neurons whose last
//! spike lies further back are lumped into a single "free" bucket. Every
//! step the oldest slot retires into the free bucket and is reused for the
//! cohort that spikes in the current step.
//!
//! Indexing: the head `k0` points at the slot about to retire. Logical
//! index `l` maps to physical slot `(k0 + l) mod K` and holds the cohort
//! that spiked `K - l` steps ago, so `l = 0` is the oldest cohort and
//! `l = K - 1` the newest. Static kernel tables are indexed by `l`.
//!
//! Per slot the buffer keeps the number of spikes `n`, the expected number
//! of survivors `m` (neurons of that cohort that have not fired again), a
//! variance proxy `v`, the cohort's membrane potential `u` and its escape
//! rate `lambda` at the previous step.

use crate::hazard::EscapeRate;
use crate::kernel::AdaptationKernel;
use crate::params::GifPopParams;
use crate::synapse::MembranePropagator;

/// Below this per-step escape probability the linear approximation
/// `lambda · h` replaces `1 - exp(-lambda · h)`
const LINEAR_HAZARD_LIMIT: f64 = 0.01;

/// Escape probability of a cohort whose integrated hazard over the step is
/// `lambda_h`
fn slot_escape_probability(lambda_h: f64) -> f64 {
    if lambda_h > LINEAR_HAZARD_LIMIT {
        1.0 - (-lambda_h).exp()
    } else {
        lambda_h
    }
}

/// Result of one population step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStep {
    /// Expected number of spikes, never negative
    pub n_expect: f64,
    /// Drawn number of spikes, in `[0, N]`
    pub n_spikes: u64,
    /// Adaptive threshold of the free population (mV)
    pub theta_hat: f64,
}

/// Rotating cohort history, free bucket and adaptation accumulators
#[derive(Debug, Clone)]
pub struct PopulationHistory {
    len: usize,
    n_pop: u64,
    k_ref: usize,
    k0: usize,

    n: Vec<f64>,
    m: Vec<f64>,
    v: Vec<f64>,
    u: Vec<f64>,
    lambda: Vec<f64>,

    theta: Vec<f64>,
    theta_tld: Vec<f64>,

    x: f64,
    z: f64,
    lambda_free: f64,

    g: Vec<f64>,
    q30: Vec<f64>,
    q30k: Vec<f64>,
}

impl PopulationHistory {
    /// Fresh history of `len` slots with the whole population placed in the
    /// newest cohort.
    pub fn new(params: &GifPopParams, h: f64, len: usize) -> Self {
        let len = len.max(1);
        let num_sfa = params.num_adaptation_terms();
        let mut history = Self {
            len,
            n_pop: params.n,
            k_ref: 0,
            k0: 0,
            n: vec![0.0; len],
            m: vec![0.0; len],
            v: vec![0.0; len],
            u: vec![0.0; len],
            lambda: vec![0.0; len],
            theta: vec![0.0; len],
            theta_tld: vec![0.0; len],
            x: 0.0,
            z: 0.0,
            lambda_free: 0.0,
            g: vec![0.0; num_sfa],
            q30: vec![0.0; num_sfa],
            q30k: vec![0.0; num_sfa],
        };
        history.n[len - 1] = params.n_f64();
        history.m[len - 1] = params.n_f64();
        history.rebuild_kernel(params, h);
        history
    }

    /// Recompute the static kernel tables and the refractory length for
    /// (possibly changed) parameters, keeping the dynamic state.
    pub fn rebuild_kernel(&mut self, params: &GifPopParams, h: f64) {
        let kernel = AdaptationKernel::new(params, h);
        let n_pop = params.n_f64();
        let len = self.len;

        for l in 0..len {
            let theta = kernel.at(len - l);
            self.theta[l] = theta;
            self.theta_tld[l] = params.delta_v * (1.0 - (-theta / params.delta_v).exp()) / n_pop;
        }

        for (j, (tau, q)) in params.tau_sfa.iter().zip(&params.q_sfa).enumerate() {
            // the accumulated rate is scaled by tau so that q keeps voltage units
            self.q30k[j] = q * tau * (-h * len as f64 / tau).exp();
            self.q30[j] = (-h / tau).exp();
        }

        self.k_ref = (params.t_ref / h).round() as usize;
    }

    /// Whether the history can be kept for `len` slots, `num_sfa`
    /// adaptation terms and a population of `n` neurons
    pub fn fits(&self, len: usize, num_sfa: usize, n: u64) -> bool {
        self.len == len && self.g.len() == num_sfa && self.n_pop == n
    }

    /// Number of history slots `K`
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a history holds at least one slot
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute refractory period in steps
    pub fn k_ref(&self) -> usize {
        self.k_ref
    }

    /// Physical index of the slot about to retire
    pub fn head(&self) -> usize {
        self.k0
    }

    /// Expected number of neurons in the free bucket
    pub fn free_count(&self) -> f64 {
        self.x
    }

    /// Adaptation accumulators, one per exponential
    pub fn adaptation(&self) -> &[f64] {
        &self.g
    }

    /// Spike counts of the cohorts, oldest first
    pub fn cohort_spikes(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |l| self.n[(self.k0 + l) % self.len])
    }

    /// Expected survivors over all cohorts plus the free bucket
    pub fn survivor_mass(&self) -> f64 {
        self.m.iter().sum::<f64>() + self.x
    }

    /// Spike counts over all cohorts plus the free bucket
    pub fn occupancy(&self) -> f64 {
        self.n.iter().sum::<f64>() + self.x
    }

    /// Advance the population by one step.
    ///
    /// `h_tot` is the voltage drive of this step, `v_m` the membrane
    /// potential of the free population (updated in place) and `draw` turns
    /// the expected spike count into an integer count.
    pub fn step<F>(
        &mut self,
        params: &GifPopParams,
        prop: &MembranePropagator,
        hazard: &EscapeRate,
        h_tot: f64,
        v_m: &mut f64,
        draw: F,
    ) -> PopulationStep
    where
        F: FnOnce(f64) -> u64,
    {
        let len = self.len;
        let k0 = self.k0;
        let h = prop.h;
        let n_pop = params.n_f64();
        let retiring = self.n[k0];

        // adaptation of the free population, fed by the retiring cohort
        let mut theta_hat = params.v_t_star;
        for j in 0..self.g.len() {
            self.g[j] = self.g[j] * self.q30[j] + (1.0 - self.q30[j]) * retiring / (n_pop * h);
            theta_hat += self.q30k[j] * self.g[j];
        }

        // free population escape probability (trapezoidal rate over the step)
        *v_m = prop.relax(*v_m) + h_tot;
        let lambda_tld = hazard.rate(*v_m - theta_hat);
        let p_free = 1.0 - (-0.5 * (self.lambda_free + lambda_tld) * h / 1000.0).exp();
        self.lambda_free = lambda_tld;

        // the retiring cohort is already part of g
        theta_hat -= retiring * self.theta_tld[0];

        let big_x: f64 = self.m.iter().sum();
        let (mut big_w, mut big_y, mut big_z) = (0.0, 0.0, 0.0);

        let mut local_theta = theta_hat;
        for l in 0..len.saturating_sub(self.k_ref) {
            let mut k = k0 + l;
            if k >= len {
                k -= len;
            }

            let theta = self.theta[l] + local_theta;
            local_theta += self.n[k] * self.theta_tld[l];

            self.u[k] = prop.relax(self.u[k]) + h_tot;
            let lambda_tld = hazard.rate(self.u[k] - theta);
            let p_lambda =
                slot_escape_probability(0.5 * (lambda_tld + self.lambda[k]) * h / 1000.0);
            self.lambda[k] = lambda_tld;

            big_y += p_lambda * self.v[k];
            big_z += self.v[k];
            big_w += p_lambda * self.m[k];
            self.v[k] = (1.0 - p_lambda) * (1.0 - p_lambda) * self.v[k] + p_lambda * self.m[k];
            self.m[k] *= 1.0 - p_lambda;
        }

        let p_big_lambda = if big_z + self.z > 0.0 {
            (big_y + p_free * self.z) / (big_z + self.z)
        } else {
            0.0
        };

        let n_expect =
            (big_w + p_free * self.x + p_big_lambda * (n_pop - big_x - self.x)).max(0.0);
        let n_spikes = draw(n_expect);

        // the retiring cohort joins the free bucket
        self.z = (1.0 - p_free) * (1.0 - p_free) * self.z + self.x * p_free + self.v[k0];
        self.x = self.x * (1.0 - p_free) + self.m[k0];

        // and its slot is reused for the cohort spiking now
        let spikes = n_spikes as f64;
        self.n[k0] = spikes;
        self.m[k0] = spikes;
        self.v[k0] = 0.0;
        self.u[k0] = params.v_reset;
        self.lambda[k0] = 0.0;

        self.k0 = (k0 + 1) % len;

        PopulationStep {
            n_expect,
            n_spikes,
            theta_hat,
        }
    }
}
