use crate::config::TRADING_DAYS;
use crate::error::{Result, SimulationError};
use serde::Serialize;

/// Daily log-return statistics of one asset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ReturnStatistics {
    /// Number of log-return samples (prices - 1).
    pub samples: usize,
    pub mean: f64,
    /// Population variance of the log returns.
    pub variance: f64,
    pub stdev: f64,
    /// `mean - variance / 2`, the per-step GBM drift.
    pub drift: f64,
}

/// ln(p[t] / p[t-1]) for every consecutive pair.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

impl ReturnStatistics {
    /// Estimates drift and volatility from at least two positive prices.
    pub fn estimate(prices: &[f64]) -> Result<Self> {
        if prices.len() < 2 {
            return Err(SimulationError::InsufficientData { required: 2, found: prices.len() });
        }
        if let Some((index, &price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(SimulationError::NonPositivePrice { index, price });
        }

        Self::from_log_returns(&log_returns(prices))
    }

    pub fn from_log_returns(returns: &[f64]) -> Result<Self> {
        if returns.is_empty() {
            return Err(SimulationError::InsufficientData { required: 1, found: 0 });
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        Ok(Self {
            samples: returns.len(),
            mean,
            variance,
            stdev: variance.sqrt(),
            drift: mean - 0.5 * variance,
        })
    }

    pub fn annualized_drift(&self) -> f64 {
        self.drift * TRADING_DAYS
    }

    pub fn annualized_volatility(&self) -> f64 {
        self.stdev * TRADING_DAYS.sqrt()
    }
}
