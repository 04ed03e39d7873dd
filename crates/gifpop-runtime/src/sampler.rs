//! Stochastic spike-count draws
//!
//! Converts the expected number of spikes in a step into an integer count,
//! either as a binomial draw over the `N` neurons or as a Poisson draw with
//! the expected count as mean. Both paths saturate at `N`.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Poisson};

/// Sampling law used for the per-step spike count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpikeCountSampler {
    /// Binomial(`N`, `n_expect / N`)
    Binomial,
    /// Poisson(`n_expect`), with a Bernoulli fallback for vanishing means
    Poisson,
}

impl SpikeCountSampler {
    /// Sampler selected by the `BinoRand` flag
    pub fn from_flag(bino_rand: bool) -> Self {
        if bino_rand {
            Self::Binomial
        } else {
            Self::Poisson
        }
    }

    /// Draw a spike count for expected value `n_expect` in a population of
    /// `n` neurons. The result always lies in `[0, n]`.
    pub fn draw<R: Rng>(&self, n_expect: f64, n: u64, rng: &mut R) -> u64 {
        match self {
            Self::Binomial => draw_binomial(n_expect, n, rng),
            Self::Poisson => draw_poisson(n_expect, n, rng),
        }
    }
}

/// Poisson draw with saturation and a Bernoulli fallback for tiny means
pub fn draw_poisson<R: Rng>(n_expect: f64, n: u64, rng: &mut R) -> u64 {
    // the Poisson deviate degrades for excessive means; saturate instead
    if n_expect > n as f64 {
        return n;
    }
    if !(n_expect > f64::MIN_POSITIVE) {
        return 0;
    }

    let count = if poisson_resolvable(n_expect) {
        match Poisson::new(n_expect) {
            Ok(dist) => {
                let sample: f64 = dist.sample(rng);
                sample.max(0.0) as u64
            }
            Err(err) => {
                log::warn!("Poisson draw with mean {} rejected: {}", n_expect, err);
                0
            }
        }
    } else {
        u64::from(rng.gen::<f64>() < n_expect)
    };

    count.min(n)
}

/// Whether P(more than one spike) is representable for mean `n_expect`.
/// Below that a single Bernoulli trial decides the count.
fn poisson_resolvable(n_expect: f64) -> bool {
    1.0 - (n_expect + 1.0) * (-n_expect).exp() > f64::MIN_POSITIVE
}

/// Binomial draw over `n` trials with success probability `n_expect / n`
pub fn draw_binomial<R: Rng>(n_expect: f64, n: u64, rng: &mut R) -> u64 {
    let p = n_expect / n as f64;
    if p >= 1.0 {
        return n;
    }
    if !(p > 0.0) {
        return 0;
    }
    match Binomial::new(n, p) {
        Ok(dist) => dist.sample(rng).min(n),
        Err(err) => {
            log::warn!("Binomial draw with p={} rejected: {}", p, err);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_flag() {
        assert_eq!(SpikeCountSampler::from_flag(true), SpikeCountSampler::Binomial);
        assert_eq!(SpikeCountSampler::from_flag(false), SpikeCountSampler::Poisson);
    }

    #[test]
    fn test_saturation() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw_poisson(150.0, 100, &mut rng), 100);
        assert_eq!(draw_binomial(150.0, 100, &mut rng), 100);
        assert_eq!(draw_binomial(100.0, 100, &mut rng), 100);
    }

    #[test]
    fn test_degenerate_means() {
        let mut rng = StdRng::seed_from_u64(2);
        for sampler in [SpikeCountSampler::Binomial, SpikeCountSampler::Poisson] {
            assert_eq!(sampler.draw(0.0, 100, &mut rng), 0);
            assert_eq!(sampler.draw(-3.0, 100, &mut rng), 0);
            assert_eq!(sampler.draw(f64::MIN_POSITIVE / 2.0, 100, &mut rng), 0);
            assert_eq!(sampler.draw(f64::NAN, 100, &mut rng), 0);
        }
    }

    #[test]
    fn test_bernoulli_fallback_for_tiny_mean() {
        // 1 - (1 + x) e^-x underflows for x ~ 1e-160, so a single
        // Bernoulli trial decides the count
        assert!(!poisson_resolvable(1e-160));
        assert!(poisson_resolvable(1e-3));
        assert!(poisson_resolvable(3.0));

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert_eq!(draw_poisson(1e-160, 100, &mut rng), 0);
        }
    }

    #[test]
    fn test_poisson_mean() {
        let mut rng = StdRng::seed_from_u64(4);
        let draws = 20_000;
        let total: u64 = (0..draws).map(|_| draw_poisson(3.0, 1000, &mut rng)).sum();
        let mean = total as f64 / draws as f64;
        assert!((mean - 3.0).abs() < 0.1, "mean {}", mean);
    }

    #[test]
    fn test_binomial_mean() {
        let mut rng = StdRng::seed_from_u64(5);
        let draws = 20_000;
        let total: u64 = (0..draws).map(|_| draw_binomial(20.0, 50, &mut rng)).sum();
        let mean = total as f64 / draws as f64;
        assert!((mean - 20.0).abs() < 0.2, "mean {}", mean);
    }

    proptest! {
        #[test]
        fn prop_draw_within_population(
            n_expect in -10.0f64..500.0,
            n in 1u64..300,
            seed in any::<u64>(),
            binomial in any::<bool>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let sampler = SpikeCountSampler::from_flag(binomial);
            let count = sampler.draw(n_expect, n, &mut rng);
            prop_assert!(count <= n);
            if n_expect <= 0.0 {
                prop_assert_eq!(count, 0);
            }
        }
    }
}
