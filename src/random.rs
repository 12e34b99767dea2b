//! Standard-normal shock sources for the path simulator.
//!
//! Shocks are drawn per `(asset, trial)` stream so a trial's draws never
//! depend on which thread simulated it or in which order trials ran.

use rand::distributions::Open01;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Identifies the independent random stream of one simulated trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId {
    pub asset: usize,
    pub trial: usize,
}

/// Source of standard-normal variates, injected into the simulator.
pub trait ShockGenerator: Sync {
    /// Fills `shocks` with the variates of one trial, in day order.
    fn fill(&self, stream: StreamId, shocks: &mut [f64]);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalMethod {
    /// Quantile transform of open-interval uniforms.
    #[default]
    InverseCdf,
    /// rand_distr's ziggurat sampler.
    Ziggurat,
}

impl NormalMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InverseCdf => "inverse-cdf",
            Self::Ziggurat => "ziggurat",
        }
    }
}

/// Seeded generator; every stream gets its own `StdRng` keyed on the seed.
#[derive(Clone, Debug)]
pub struct SeededShocks {
    seed: u64,
    method: NormalMethod,
    standard_normal: Normal,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

impl SeededShocks {
    pub fn new(seed: u64, method: NormalMethod) -> Self {
        Self {
            seed,
            method,
            standard_normal: Normal::standard(),
        }
    }

    /// Picks a fresh seed from the thread RNG. Read it back with [`Self::seed`]
    /// to reproduce the run.
    pub fn from_entropy(method: NormalMethod) -> Self {
        Self::new(rand::thread_rng().r#gen(), method)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn method(&self) -> NormalMethod {
        self.method
    }

    fn stream_seed(&self, stream: StreamId) -> u64 {
        let asset_key = splitmix64(self.seed ^ splitmix64(stream.asset as u64));
        splitmix64(asset_key ^ stream.trial as u64)
    }

    fn stream_rng(&self, stream: StreamId) -> StdRng {
        StdRng::seed_from_u64(self.stream_seed(stream))
    }
}

impl ShockGenerator for SeededShocks {
    fn fill(&self, stream: StreamId, shocks: &mut [f64]) {
        let mut rng = self.stream_rng(stream);
        match self.method {
            NormalMethod::InverseCdf => {
                for z in shocks.iter_mut() {
                    let u: f64 = rng.sample(Open01);
                    *z = self.standard_normal.inverse_cdf(u);
                }
            }
            NormalMethod::Ziggurat => {
                for z in shocks.iter_mut() {
                    *z = rng.sample(StandardNormal);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(generator: &SeededShocks, asset: usize, trial: usize, n: usize) -> Vec<f64> {
        let mut out = vec![0.0; n];
        generator.fill(StreamId { asset, trial }, &mut out);
        out
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = SeededShocks::new(7, NormalMethod::InverseCdf);
        let b = SeededShocks::new(7, NormalMethod::InverseCdf);
        assert_eq!(draws(&a, 0, 3, 64), draws(&b, 0, 3, 64));
    }

    #[test]
    fn test_streams_differ() {
        let g = SeededShocks::new(7, NormalMethod::InverseCdf);
        assert_ne!(draws(&g, 0, 0, 16), draws(&g, 0, 1, 16));
        assert_ne!(draws(&g, 0, 0, 16), draws(&g, 1, 0, 16));
        let other = SeededShocks::new(8, NormalMethod::InverseCdf);
        assert_ne!(draws(&g, 0, 0, 16), draws(&other, 0, 0, 16));
    }

    #[test]
    fn test_draws_look_standard_normal() {
        for method in [NormalMethod::InverseCdf, NormalMethod::Ziggurat] {
            let g = SeededShocks::new(42, method);
            let z = draws(&g, 0, 0, 50_000);
            assert!(z.iter().all(|v| v.is_finite()));
            let n = z.len() as f64;
            let mean = z.iter().sum::<f64>() / n;
            let var = z.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            assert!(mean.abs() < 0.03, "{:?} mean {}", method, mean);
            assert!((var - 1.0).abs() < 0.05, "{:?} variance {}", method, var);
        }
    }

    #[test]
    fn test_normal_method_serde_names() {
        let json = serde_json::to_string(&NormalMethod::InverseCdf).unwrap();
        assert_eq!(json, "\"inverse-cdf\"");
        let parsed: NormalMethod = serde_json::from_str("\"ziggurat\"").unwrap();
        assert_eq!(parsed, NormalMethod::Ziggurat);
    }
}
