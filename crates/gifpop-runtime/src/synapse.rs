//! Exact integration of exponential synaptic currents and membrane drive
//!
//! The subthreshold dynamics are linear and time invariant, so every update
//! here uses exact exponential propagators instead of a finite-difference
//! scheme. Input arriving within a step is treated as a constant rate over
//! that step.

use crate::params::GifPopParams;

/// Relative distance between synaptic and membrane time constants below
/// which the equal-time-constant limit of the propagator is used
const DEGENERATE_TAU_TOLERANCE: f64 = 1e-8;

/// One exponential synaptic channel (excitatory or inhibitory)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpChannel {
    /// Synaptic time constant (ms)
    pub tau_syn: f64,
    /// Per-step decay `exp(-h / tau_syn)`
    pub p11: f64,
}

impl ExpChannel {
    fn new(tau_syn: f64, h: f64) -> Self {
        Self {
            tau_syn,
            p11: (-h / tau_syn).exp(),
        }
    }
}

/// Propagators for the membrane and both synaptic channels at a fixed step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembranePropagator {
    /// Step size (ms)
    pub h: f64,
    /// Membrane time constant (ms)
    pub tau_m: f64,
    /// Membrane capacitance (pF)
    pub c_m: f64,
    /// Resting potential (mV)
    pub e_l: f64,
    /// Constant input current (pA)
    pub i_e: f64,
    /// Membrane decay `exp(-h / tau_m)`
    pub p22: f64,
    /// Current-to-voltage gain over one step, `tau_m / c_m · (1 - p22)`
    pub p20: f64,
    /// Excitatory channel
    pub ex: ExpChannel,
    /// Inhibitory channel
    pub inh: ExpChannel,
}

impl MembranePropagator {
    /// Derive propagators from parameters at step size `h` (ms)
    pub fn new(params: &GifPopParams, h: f64) -> Self {
        let p22 = (-h / params.tau_m).exp();
        Self {
            h,
            tau_m: params.tau_m,
            c_m: params.c_m,
            e_l: params.e_l,
            i_e: params.i_e,
            p22,
            p20: params.tau_m / params.c_m * (1.0 - p22),
            ex: ExpChannel::new(params.tau_syn_ex, h),
            inh: ExpChannel::new(params.tau_syn_in, h),
        }
    }

    /// Free relaxation of a voltage trace over one step, without drive
    #[inline]
    pub fn relax(&self, v: f64) -> f64 {
        (v - self.e_l) * self.p22
    }

    /// Advance both synaptic currents by one step and return the total
    /// voltage drive `h_tot` for that step.
    ///
    /// `y0` is the current deposited during the previous step, `s_ex` and
    /// `s_in` the weighted spike sums arriving in this step (pA).
    pub fn drive(
        &self,
        y0: f64,
        i_syn_ex: &mut f64,
        i_syn_in: &mut f64,
        s_ex: f64,
        s_in: f64,
    ) -> f64 {
        let mut h_tot = (self.i_e + y0) * self.p20 + self.e_l;
        h_tot += self.channel_drive(&self.ex, i_syn_ex, s_ex);
        h_tot += self.channel_drive(&self.inh, i_syn_in, s_in);
        h_tot
    }

    /// Voltage drive contributed by one channel; decays the channel current.
    fn channel_drive(&self, channel: &ExpChannel, i_syn: &mut f64, s: f64) -> f64 {
        // input as a constant rate over the step, on the voltage scale
        let a = s / self.h * channel.tau_syn / self.c_m;
        let y = *i_syn / self.c_m;
        let tau_s = channel.tau_syn;
        let tau_m = self.tau_m;

        let drive = if (tau_s - tau_m).abs() <= DEGENERATE_TAU_TOLERANCE * tau_m {
            tau_m * a * (1.0 - self.p22) + self.p22 * self.h * (y - a)
        } else {
            tau_m
                * (a + (tau_s * channel.p11 * (y - a) - self.p22 * (tau_s * y - tau_m * a))
                    / (tau_s - tau_m))
        };

        *i_syn = (a + (y - a) * channel.p11) * self.c_m;
        drive
    }
}
