//! Parameters of the GIF population model

use crate::error::*;
use crate::status::{self, StatusDict, StatusValue};

/// Parameters for a population of generalized integrate-and-fire neurons
/// with exponential postsynaptic currents and threshold adaptation.
///
/// Status names follow the conventional model vocabulary (`N`, `C_m`,
/// `Delta_V`, ...); see [`GifPopParams::get_status`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GifPopParams {
    /// Number of neurons in the population
    #[cfg_attr(feature = "serde", serde(rename = "N"))]
    pub n: u64,
    /// Membrane time constant (ms)
    pub tau_m: f64,
    /// Membrane capacitance (pF)
    #[cfg_attr(feature = "serde", serde(rename = "C_m"))]
    pub c_m: f64,
    /// Absolute refractory period (ms)
    pub t_ref: f64,
    /// Escape rate at threshold (1/s)
    pub lambda_0: f64,
    /// Noise parameter of the escape rate (mV)
    #[cfg_attr(feature = "serde", serde(rename = "Delta_V"))]
    pub delta_v: f64,
    /// Length of the refractory history in steps; values below 1 select
    /// automatic sizing at calibration
    pub len_kernel: i64,
    /// Constant input current (pA)
    #[cfg_attr(feature = "serde", serde(rename = "I_e"))]
    pub i_e: f64,
    /// Reset potential (mV)
    #[cfg_attr(feature = "serde", serde(rename = "V_reset"))]
    pub v_reset: f64,
    /// Baseline threshold (mV)
    #[cfg_attr(feature = "serde", serde(rename = "V_T_star"))]
    pub v_t_star: f64,
    /// Resting potential (mV)
    #[cfg_attr(feature = "serde", serde(rename = "E_L"))]
    pub e_l: f64,
    /// Excitatory synaptic time constant (ms)
    pub tau_syn_ex: f64,
    /// Inhibitory synaptic time constant (ms)
    pub tau_syn_in: f64,
    /// Adaptation time constants (ms)
    pub tau_sfa: Vec<f64>,
    /// Adaptation kernel amplitudes (mV)
    pub q_sfa: Vec<f64>,
    /// Draw spike counts from a binomial (true) or Poisson (false) law
    #[cfg_attr(feature = "serde", serde(rename = "BinoRand"))]
    pub bino_rand: bool,
}

impl Default for GifPopParams {
    fn default() -> Self {
        Self {
            n: 100,
            tau_m: 20.0,       // 20ms membrane time constant
            c_m: 250.0,        // 250pF capacitance
            t_ref: 4.0,        // 4ms absolute refractoriness
            lambda_0: 10.0,    // 10Hz at threshold
            delta_v: 2.0,      // 2mV escape noise
            len_kernel: -1,    // automatic history length
            i_e: 0.0,
            v_reset: 0.0,
            v_t_star: 15.0,
            e_l: 0.0,
            tau_syn_ex: 3.0,
            tau_syn_in: 6.0,
            tau_sfa: vec![300.0],
            q_sfa: vec![0.5],
            bino_rand: true,
        }
    }
}

impl GifPopParams {
    /// Population size as a float, for the occupancy arithmetic
    pub fn n_f64(&self) -> f64 {
        self.n as f64
    }

    /// Number of adaptation exponentials
    pub fn num_adaptation_terms(&self) -> usize {
        self.tau_sfa.len()
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        if self.tau_sfa.len() != self.q_sfa.len() {
            return Err(RuntimeError::invalid_parameter(
                "tau_sfa",
                format!(
                    "{} entries (with {} entries in q_sfa)",
                    self.tau_sfa.len(),
                    self.q_sfa.len()
                ),
                "same dimension as q_sfa",
            ));
        }
        if self.c_m <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "C_m",
                self.c_m.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_m <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "tau_m",
                self.tau_m.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_syn_ex <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "tau_syn_ex",
                self.tau_syn_ex.to_string(),
                "> 0.0",
            ));
        }
        if self.tau_syn_in <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "tau_syn_in",
                self.tau_syn_in.to_string(),
                "> 0.0",
            ));
        }
        if let Some(tau) = self.tau_sfa.iter().find(|tau| **tau <= 0.0) {
            return Err(RuntimeError::invalid_parameter(
                "tau_sfa",
                tau.to_string(),
                "all entries > 0.0",
            ));
        }
        if self.n == 0 {
            return Err(RuntimeError::invalid_parameter("N", "0", ">= 1"));
        }
        if self.lambda_0 < 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "lambda_0",
                self.lambda_0.to_string(),
                ">= 0.0",
            ));
        }
        if self.delta_v <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "Delta_V",
                self.delta_v.to_string(),
                "> 0.0",
            ));
        }
        if self.t_ref < 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "t_ref",
                self.t_ref.to_string(),
                ">= 0.0",
            ));
        }
        Ok(())
    }

    /// Extra check applied at calibration: the adaptation arrays must not be
    /// empty once the model is about to run.
    pub fn validate_for_calibration(&self) -> Result<()> {
        self.validate()?;
        if self.tau_sfa.is_empty() {
            return Err(RuntimeError::invalid_config(
                "time constant array tau_sfa must not be empty",
            ));
        }
        if self.q_sfa.is_empty() {
            return Err(RuntimeError::invalid_config(
                "adaptation value array q_sfa must not be empty",
            ));
        }
        Ok(())
    }

    /// Export parameters as named status entries
    pub fn get_status(&self, dict: &mut StatusDict) {
        dict.insert("N".into(), StatusValue::Int(self.n as i64));
        dict.insert("tau_m".into(), self.tau_m.into());
        dict.insert("C_m".into(), self.c_m.into());
        dict.insert("lambda_0".into(), self.lambda_0.into());
        dict.insert("Delta_V".into(), self.delta_v.into());
        dict.insert("len_kernel".into(), self.len_kernel.into());
        dict.insert("I_e".into(), self.i_e.into());
        dict.insert("V_reset".into(), self.v_reset.into());
        dict.insert("V_T_star".into(), self.v_t_star.into());
        dict.insert("E_L".into(), self.e_l.into());
        dict.insert("t_ref".into(), self.t_ref.into());
        dict.insert("tau_syn_ex".into(), self.tau_syn_ex.into());
        dict.insert("tau_syn_in".into(), self.tau_syn_in.into());
        dict.insert("BinoRand".into(), self.bino_rand.into());
        dict.insert("tau_sfa".into(), self.tau_sfa.clone().into());
        dict.insert("q_sfa".into(), self.q_sfa.clone().into());
    }

    /// Apply named status entries, returning the validated result.
    ///
    /// `self` is left untouched; callers commit the returned value only on
    /// success.
    pub fn with_status(&self, dict: &StatusDict) -> Result<Self> {
        let mut p = self.clone();

        let mut n = p.n as i64;
        status::update_i64(dict, "N", &mut n)?;
        if n <= 0 {
            return Err(RuntimeError::invalid_parameter("N", n.to_string(), ">= 1"));
        }
        p.n = n as u64;

        status::update_f64(dict, "tau_m", &mut p.tau_m)?;
        status::update_f64(dict, "C_m", &mut p.c_m)?;
        status::update_f64(dict, "lambda_0", &mut p.lambda_0)?;
        status::update_f64(dict, "Delta_V", &mut p.delta_v)?;
        status::update_i64(dict, "len_kernel", &mut p.len_kernel)?;
        status::update_f64(dict, "I_e", &mut p.i_e)?;
        status::update_f64(dict, "V_reset", &mut p.v_reset)?;
        status::update_f64(dict, "V_T_star", &mut p.v_t_star)?;
        status::update_f64(dict, "E_L", &mut p.e_l)?;
        status::update_f64(dict, "t_ref", &mut p.t_ref)?;
        status::update_f64(dict, "tau_syn_ex", &mut p.tau_syn_ex)?;
        status::update_f64(dict, "tau_syn_in", &mut p.tau_syn_in)?;
        status::update_bool(dict, "BinoRand", &mut p.bino_rand)?;
        status::update_array(dict, "tau_sfa", &mut p.tau_sfa)?;
        status::update_array(dict, "q_sfa", &mut p.q_sfa)?;

        p.validate()?;
        Ok(p)
    }
}
