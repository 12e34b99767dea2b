//! End-to-end portfolio simulation: estimate -> simulate -> aggregate -> summarize.

use crate::config::SimulationConfig;
use crate::data::{PricePoint, PriceSeries};
use crate::ensemble::{PortfolioValueEnsemble, PricePathEnsemble};
use crate::error::{Result, SimulationError};
use crate::portfolio::{allocate, individual_returns_pct, PortfolioAggregator};
use crate::random::ShockGenerator;
use crate::returns::ReturnStatistics;
use crate::simulation::{Horizon, PathSimulator};
use crate::summary::{mean, DistributionSummary, RiskSummary};
use std::time::Instant;
use tracing::{debug, info};

/// Simulation output for one asset.
#[derive(Clone, Debug)]
pub struct AssetOutcome {
    pub symbol: String,
    pub weight: f64,
    /// Capital placed in this asset at day 0.
    pub allocation: f64,
    pub current_price: f64,
    /// Dated prices the statistics were estimated from.
    pub history: Vec<PricePoint>,
    pub stats: ReturnStatistics,
    pub terminal_prices: Vec<f64>,
    /// `(terminal - current) / current * 100` per trial.
    pub returns_pct: Vec<f64>,
    pub average_return_pct: f64,
    /// Terminal value of the allocated position per trial.
    pub position_values: DistributionSummary,
    /// Full price grid, kept only when `retain_paths` is set.
    pub paths: Option<PricePathEnsemble>,
}

/// Simulation output for the whole portfolio.
#[derive(Clone, Debug)]
pub struct PortfolioSimulation {
    pub horizon: Horizon,
    pub initial_investment: f64,
    pub seed: Option<u64>,
    pub assets: Vec<AssetOutcome>,
    pub portfolio: PortfolioValueEnsemble,
    pub terminal: DistributionSummary,
    pub risk: RiskSummary,
}

impl PortfolioSimulation {
    /// `(symbol, weight)` pairs in portfolio order.
    pub fn composition(&self) -> Vec<(String, f64)> {
        self.assets.iter().map(|a| (a.symbol.clone(), a.weight)).collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn simulate_asset<G: ShockGenerator>(
    simulator: &PathSimulator<'_, G>,
    series: &PriceSeries,
    index: usize,
    weight: f64,
    allocation: f64,
    horizon: Horizon,
    aggregator: &mut PortfolioAggregator,
    retain_paths: bool,
) -> Result<AssetOutcome> {
    let prices = series.prices();
    let stats = ReturnStatistics::estimate(&prices)?;
    let current_price = series
        .current_price()
        .ok_or(SimulationError::InsufficientData { required: 2, found: 0 })?;

    info!(
        "{}: {} returns, mean={:.6}, stdev={:.6}, drift={:.6} (annual drift {:.2}%, vol {:.2}%)",
        series.symbol(),
        stats.samples,
        stats.mean,
        stats.stdev,
        stats.drift,
        stats.annualized_drift() * 100.0,
        stats.annualized_volatility() * 100.0
    );

    let paths = simulator.simulate(&stats, current_price, horizon, index)?;
    aggregator.add(&paths, current_price, allocation)?;

    let terminal_prices = paths.terminal_values();
    let returns_pct = individual_returns_pct(&terminal_prices, current_price)?;
    let average_return_pct = mean(&returns_pct)?;
    let scale = allocation / current_price;
    let position_values = DistributionSummary::from_values(terminal_prices.iter().map(|p| p * scale).collect())?;

    info!(
        "{}: allocation {:.2}, mean terminal value {:.2}, average return {:+.2}%",
        series.symbol(),
        allocation,
        position_values.mean,
        average_return_pct
    );

    Ok(AssetOutcome {
        symbol: series.symbol().to_string(),
        weight,
        allocation,
        current_price,
        history: series.points().to_vec(),
        stats,
        terminal_prices,
        returns_pct,
        average_return_pct,
        position_values,
        paths: retain_paths.then_some(paths),
    })
}

/// Runs the full Monte Carlo pipeline over every asset.
///
/// `weights[i]` belongs to `assets[i]`; weights are validated, never
/// renormalized. Any per-asset failure aborts the run and names the asset.
pub fn run_simulation<G: ShockGenerator>(
    assets: &[PriceSeries],
    weights: &[f64],
    config: &SimulationConfig,
    shocks: &G,
    seed: Option<u64>,
) -> Result<PortfolioSimulation> {
    if assets.is_empty() {
        return Err(SimulationError::EmptyInput("portfolio has no assets".to_string()));
    }
    config.validate()?;
    let horizon = config.horizon()?;
    let allocations = allocate(weights, assets.len(), config.initial_investment)?;

    info!(
        "Simulating {} assets: {} trials x {} days, initial investment {:.2}",
        assets.len(),
        horizon.trials,
        horizon.days,
        config.initial_investment
    );
    let started = Instant::now();

    let simulator = PathSimulator::new(shocks);
    let mut aggregator = PortfolioAggregator::new(horizon.days, horizon.trials);
    let mut outcomes = Vec::with_capacity(assets.len());

    for (index, ((series, &weight), &allocation)) in assets.iter().zip(weights).zip(&allocations).enumerate() {
        let outcome = simulate_asset(
            &simulator,
            series,
            index,
            weight,
            allocation,
            horizon,
            &mut aggregator,
            config.retain_paths,
        )
        .map_err(|e| e.for_asset(series.symbol()))?;
        outcomes.push(outcome);
    }

    debug!(
        "Allocated {:.2} of {:.2} initial investment",
        aggregator.total_allocation(),
        config.initial_investment
    );
    let portfolio = aggregator.finish()?;
    let terminal = DistributionSummary::from_values(portfolio.terminal_values())?;
    let risk = RiskSummary::from_values(&terminal.values, config.initial_investment)?;

    info!(
        "Simulation finished in {:.2?}: mean terminal value {:.2} (P5 {:.2}, P95 {:.2}), P(loss) {:.1}%",
        started.elapsed(),
        terminal.mean,
        terminal.p5,
        terminal.p95,
        risk.probability_of_loss * 100.0
    );

    Ok(PortfolioSimulation {
        horizon,
        initial_investment: config.initial_investment,
        seed,
        assets: outcomes,
        portfolio,
        terminal,
        risk,
    })
}
