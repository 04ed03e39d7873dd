//! Escape-rate (hazard) functions

use crate::params::GifPopParams;

/// Escape rate as a function of the distance of the membrane potential
/// above threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EscapeRate {
    /// `lambda_0 · exp(x / delta_v)`, in 1/s
    Exponential {
        /// Rate at threshold (1/s)
        lambda_0: f64,
        /// Softness of the threshold (mV)
        delta_v: f64,
    },
}

impl EscapeRate {
    /// Exponential escape rate configured from the model parameters
    pub fn from_params(params: &GifPopParams) -> Self {
        Self::Exponential {
            lambda_0: params.lambda_0,
            delta_v: params.delta_v,
        }
    }

    /// Instantaneous rate (1/s) at distance `x` (mV) above threshold.
    ///
    /// Not clamped; large positive distances give arbitrarily large rates.
    #[inline]
    pub fn rate(&self, x: f64) -> f64 {
        match *self {
            // a silent population stays silent even where exp() overflows
            Self::Exponential { lambda_0, .. } if lambda_0 == 0.0 => 0.0,
            Self::Exponential { lambda_0, delta_v } => lambda_0 * (x / delta_v).exp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_rate() {
        let hazard = EscapeRate::from_params(&GifPopParams::default());
        assert!((hazard.rate(0.0) - 10.0).abs() < 1e-12);
        assert!((hazard.rate(2.0) - 10.0 * std::f64::consts::E).abs() < 1e-9);
        assert!(hazard.rate(-15.0) < hazard.rate(-14.0));
    }

    #[test]
    fn test_zero_baseline_is_silent() {
        let hazard = EscapeRate::Exponential {
            lambda_0: 0.0,
            delta_v: 2.0,
        };
        assert_eq!(hazard.rate(100.0), 0.0);
        assert_eq!(hazard.rate(1e6), 0.0);
    }
}
