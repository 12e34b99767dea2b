use crate::config::WEIGHT_TOLERANCE;
use crate::ensemble::{PortfolioValueEnsemble, PricePathEnsemble};
use crate::error::{Result, SimulationError};
use tracing::debug;

// ──────────────────────────────────────────────────────────────────────────────
// Allocation
// ──────────────────────────────────────────────────────────────────────────────

/// Splits the initial investment across assets by weight.
///
/// Weights must match the asset count, lie in `[0, 1]` and sum to 1 within
/// `WEIGHT_TOLERANCE`. They are never renormalized.
pub fn allocate(weights: &[f64], asset_count: usize, initial_investment: f64) -> Result<Vec<f64>> {
    if weights.len() != asset_count {
        return Err(SimulationError::WeightMismatch(format!(
            "{} weights given for {} assets",
            weights.len(),
            asset_count
        )));
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !(w.is_finite() && (0.0..=1.0).contains(*w)))
    {
        return Err(SimulationError::WeightMismatch(format!(
            "weight #{} is {}, expected a value in [0, 1]",
            i, w
        )));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(SimulationError::WeightMismatch(format!("weights sum to {}, expected 1.0", total)));
    }
    if !(initial_investment.is_finite() && initial_investment > 0.0) {
        return Err(SimulationError::InvalidParameter(format!(
            "initial investment must be positive, got {}",
            initial_investment
        )));
    }

    Ok(weights.iter().map(|w| w * initial_investment).collect())
}

// ──────────────────────────────────────────────────────────────────────────────
// Aggregation
// ──────────────────────────────────────────────────────────────────────────────

/// Accumulates allocated position values into a portfolio ensemble.
///
/// Each asset's price grid is rescaled by `allocation / current_price` and
/// added elementwise, so a caller may drop every asset grid right after
/// adding it.
#[derive(Debug)]
pub struct PortfolioAggregator {
    values: PortfolioValueEnsemble,
    total_allocation: f64,
    assets: usize,
}

impl PortfolioAggregator {
    pub fn new(days: usize, trials: usize) -> Self {
        Self {
            values: PortfolioValueEnsemble::zeros(days, trials),
            total_allocation: 0.0,
            assets: 0,
        }
    }

    pub fn add(&mut self, ensemble: &PricePathEnsemble, current_price: f64, allocation: f64) -> Result<()> {
        if ensemble.shape() != self.values.shape() {
            let (expected_days, expected_trials) = self.values.shape();
            let (found_days, found_trials) = ensemble.shape();
            return Err(SimulationError::ShapeMismatch {
                expected_days,
                expected_trials,
                found_days,
                found_trials,
            });
        }
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "current price must be positive, got {}",
                current_price
            )));
        }
        if !(allocation.is_finite() && allocation >= 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "allocation must be non-negative, got {}",
                allocation
            )));
        }

        let scale = allocation / current_price;
        for (total, price) in self.values.as_mut_slice().iter_mut().zip(ensemble.as_slice()) {
            *total += price * scale;
        }
        self.total_allocation += allocation;
        self.assets += 1;
        debug!("aggregated asset #{} (allocation {:.2}, scale {:.6})", self.assets, allocation, scale);
        Ok(())
    }

    /// Sum of allocations added so far; the expected day-0 value of every trial.
    pub fn total_allocation(&self) -> f64 {
        self.total_allocation
    }

    pub fn finish(self) -> Result<PortfolioValueEnsemble> {
        if self.assets == 0 {
            return Err(SimulationError::EmptyInput("no assets were aggregated".to_string()));
        }
        Ok(self.values)
    }
}

/// Aggregates `(price ensemble, current price, allocation)` triples in one call.
pub fn aggregate(ensembles: &[(&PricePathEnsemble, f64, f64)]) -> Result<PortfolioValueEnsemble> {
    let (first, _, _) = ensembles
        .first()
        .ok_or_else(|| SimulationError::EmptyInput("no ensembles to aggregate".to_string()))?;
    let mut aggregator = PortfolioAggregator::new(first.days(), first.trials());
    for (ensemble, current_price, allocation) in ensembles {
        aggregator.add(ensemble, *current_price, *allocation)?;
    }
    aggregator.finish()
}

/// Last row of an ensemble.
pub fn terminal_values(ensemble: &PricePathEnsemble) -> Vec<f64> {
    ensemble.terminal_values()
}

/// Per-trial percentage change from the current price.
pub fn individual_returns_pct(terminal_prices: &[f64], current_price: f64) -> Result<Vec<f64>> {
    if !(current_price.is_finite() && current_price > 0.0) {
        return Err(SimulationError::InvalidParameter(format!(
            "current price must be positive, got {}",
            current_price
        )));
    }
    Ok(terminal_prices
        .iter()
        .map(|p| (p - current_price) / current_price * 100.0)
        .collect())
}
