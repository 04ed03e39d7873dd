//! Sum-of-exponentials adaptation kernel and history sizing

use crate::params::GifPopParams;

/// Longest history window considered by automatic sizing (ms)
pub const MAX_AUTO_HISTORY_MS: f64 = 20_000.0;

/// Relative kernel amplitude (in units of `Delta_V`) below which the
/// adaptation tail is truncated
pub const KERNEL_TAIL_THRESHOLD: f64 = 0.1;

/// Adaptation kernel `Σ_j q_j · exp(-t / tau_j)` sampled on the step grid
#[derive(Debug, Clone, Copy)]
pub struct AdaptationKernel<'a> {
    tau_sfa: &'a [f64],
    q_sfa: &'a [f64],
    h: f64,
}

impl<'a> AdaptationKernel<'a> {
    /// Kernel over the adaptation terms of `params` with step size `h` (ms)
    pub fn new(params: &'a GifPopParams, h: f64) -> Self {
        Self {
            tau_sfa: &params.tau_sfa,
            q_sfa: &params.q_sfa,
            h,
        }
    }

    /// Threshold contribution at a lag of `k` steps (mV)
    pub fn at(&self, k: usize) -> f64 {
        let t = k as f64 * self.h;
        self.tau_sfa
            .iter()
            .zip(self.q_sfa)
            .map(|(tau, q)| q * (-t / tau).exp())
            .sum()
    }
}

/// Choose the history length for `params` at step size `h`.
///
/// Starts from [`MAX_AUTO_HISTORY_MS`] and shortens the window while the
/// kernel one step earlier is still below `KERNEL_TAIL_THRESHOLD · Delta_V`,
/// but never below `5 · tau_m`. The window always covers the absolute
/// refractory period plus one step.
pub fn history_size(params: &GifPopParams, h: f64) -> usize {
    let kernel = AdaptationKernel::new(params, h);
    let threshold = KERNEL_TAIL_THRESHOLD * params.delta_v;

    let mut k = (MAX_AUTO_HISTORY_MS / h) as usize;
    let k_min = (5.0 * params.tau_m / h) as usize;
    while k > k_min && kernel.at(k - 1) < threshold {
        k -= 1;
    }

    if k as f64 * h <= params.t_ref {
        k = (params.t_ref / h) as usize + 1;
    }
    k.max(1)
}
