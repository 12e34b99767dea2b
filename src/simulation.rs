use crate::ensemble::PricePathEnsemble;
use crate::error::{Result, SimulationError};
use crate::random::{ShockGenerator, StreamId};
use crate::returns::ReturnStatistics;
use rayon::prelude::*;
use serde::Serialize;

/// Forecast horizon: number of simulated days (day 0 included) and trials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Horizon {
    pub days: usize,
    pub trials: usize,
}

impl Horizon {
    pub fn new(days: usize, trials: usize) -> Result<Self> {
        if days == 0 {
            return Err(SimulationError::InvalidParameter("days must be at least 1".to_string()));
        }
        if trials == 0 {
            return Err(SimulationError::InvalidParameter("trials must be at least 1".to_string()));
        }
        Ok(Self { days, trials })
    }
}

/// Geometric Brownian motion path generator.
///
/// `Path[0][k] = current price` and
/// `Path[t][k] = Path[t-1][k] * exp(drift + stdev * Z[t][k])`.
/// Trials run in parallel; each draws from its own stream, so the output
/// does not depend on the thread count.
pub struct PathSimulator<'a, G: ShockGenerator> {
    shocks: &'a G,
}

impl<'a, G: ShockGenerator> PathSimulator<'a, G> {
    pub fn new(shocks: &'a G) -> Self {
        Self { shocks }
    }

    /// Simulates `horizon.trials` paths of `horizon.days` prices for the asset
    /// at position `asset` in the portfolio (selects its random streams).
    pub fn simulate(
        &self,
        stats: &ReturnStatistics,
        current_price: f64,
        horizon: Horizon,
        asset: usize,
    ) -> Result<PricePathEnsemble> {
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "current price must be positive, got {}",
                current_price
            )));
        }
        if horizon.days == 0 || horizon.trials == 0 {
            return Err(SimulationError::InvalidParameter(format!(
                "horizon must be at least 1 day x 1 trial, got {} x {}",
                horizon.days, horizon.trials
            )));
        }
        if !(stats.drift.is_finite() && stats.stdev.is_finite() && stats.stdev >= 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "return statistics must be finite with non-negative stdev (drift {}, stdev {})",
                stats.drift, stats.stdev
            )));
        }

        let Horizon { days, trials } = horizon;
        let drift = stats.drift;
        let stdev = stats.stdev;
        let mut ensemble = PricePathEnsemble::zeros(days, trials);

        ensemble
            .as_mut_slice()
            .par_chunks_mut(days)
            .enumerate()
            .for_each_init(
                || vec![0.0; days - 1],
                |shocks, (trial, path)| {
                    self.shocks.fill(StreamId { asset, trial }, shocks);
                    path[0] = current_price;
                    for t in 1..days {
                        let daily_return = (drift + stdev * shocks[t - 1]).exp();
                        path[t] = (path[t - 1] * daily_return).clamp(f64::MIN_POSITIVE, f64::MAX);
                    }
                },
            );

        Ok(ensemble)
    }
}
