use crate::config::HISTOGRAM_BINS;
use crate::data::PricePoint;
use crate::engine::{AssetOutcome, PortfolioSimulation};
use crate::returns::ReturnStatistics;
use crate::simulation::Horizon;
use crate::summary::{percentile_band, DistributionSummary, Histogram, RiskSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

// ──────────────────────────────────────────────────────────────────────────────
// Serializable report
// ──────────────────────────────────────────────────────────────────────────────

/// Per-day percentile paths of an ensemble.
#[derive(Clone, Debug, Serialize)]
pub struct PercentileBands {
    pub p10: Vec<f64>,
    pub p50: Vec<f64>,
    pub p90: Vec<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AssetReport {
    pub symbol: String,
    pub weight: f64,
    pub allocation: f64,
    pub current_price: f64,
    pub history: Vec<PricePoint>,
    pub statistics: ReturnStatistics,
    pub average_return_pct: f64,
    pub terminal_prices: DistributionSummary,
    pub position_values: DistributionSummary,
    pub position_histogram: Histogram,
    pub price_bands: Option<PercentileBands>,
}

/// Everything a presentation layer needs, detached from the raw grids.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub horizon: Horizon,
    pub initial_investment: f64,
    pub seed: Option<u64>,
    pub composition: Vec<(String, f64)>,
    pub terminal_values: DistributionSummary,
    pub terminal_histogram: Histogram,
    pub risk: RiskSummary,
    pub value_bands: PercentileBands,
    pub assets: Vec<AssetReport>,
}

fn bands(ensemble: &crate::ensemble::Ensemble) -> PercentileBands {
    PercentileBands {
        p10: percentile_band(ensemble, 10.0),
        p50: percentile_band(ensemble, 50.0),
        p90: percentile_band(ensemble, 90.0),
    }
}

impl AssetReport {
    fn from_outcome(asset: &AssetOutcome) -> Result<Self> {
        Ok(Self {
            symbol: asset.symbol.clone(),
            weight: asset.weight,
            allocation: asset.allocation,
            current_price: asset.current_price,
            history: asset.history.clone(),
            statistics: asset.stats,
            average_return_pct: asset.average_return_pct,
            terminal_prices: DistributionSummary::from_values(asset.terminal_prices.clone())?,
            position_values: asset.position_values.clone(),
            position_histogram: Histogram::from_values(&asset.position_values.values, HISTOGRAM_BINS)?,
            price_bands: asset.paths.as_ref().map(bands),
        })
    }
}

impl SimulationReport {
    pub fn from_simulation(sim: &PortfolioSimulation) -> Result<Self> {
        let assets = sim
            .assets
            .iter()
            .map(AssetReport::from_outcome)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            horizon: sim.horizon,
            initial_investment: sim.initial_investment,
            seed: sim.seed,
            composition: sim.composition(),
            terminal_values: sim.terminal.clone(),
            terminal_histogram: Histogram::from_values(&sim.terminal.values, HISTOGRAM_BINS)?,
            risk: sim.risk,
            value_bands: bands(&sim.portfolio),
            assets,
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Terminal report
// ──────────────────────────────────────────────────────────────────────────────

/// Pretty-prints the simulation outcome to stdout.
pub fn print_report(sim: &PortfolioSimulation) {
    let t = &sim.terminal;
    let change = (t.mean / sim.initial_investment - 1.0) * 100.0;

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║           Monte Carlo Portfolio Simulation                 ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!(
        "║  Trials x Days          : {:>7} x {:<5}                    ║",
        sim.horizon.trials, sim.horizon.days
    );
    match sim.seed {
        Some(seed) => println!("║  Seed                   : {:<20}             ║", seed),
        None => println!("║  Seed                   : {:<20}             ║", "custom source"),
    }
    println!("║  Initial Investment     : {:>12.2}                     ║", sim.initial_investment);
    println!(
        "║  Mean Final Value       : {:>12.2} ({:>+7.2}%)           ║",
        t.mean, change
    );
    println!("║  Median Final Value     : {:>12.2}                     ║", t.p50);
    println!("║  P5 / P95               : {:>10.2} / {:<10.2}           ║", t.p5, t.p95);
    println!(
        "║  P(loss)                : {:>7.2}%                         ║",
        sim.risk.probability_of_loss * 100.0
    );
    println!("║  VaR 95% / CVaR 95%     : {:>6.2}% / {:<6.2}%               ║", sim.risk.var_95, sim.risk.cvar_95);
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Symbol    Weight   Price     Ann.Drift  Ann.Vol  Avg.Ret  ║");
    println!("╠════════════════════════════════════════════════════════════╣");

    for a in &sim.assets {
        println!(
            "║  {:<8} {:>6.1}%  {:>8.2}  {:>+8.2}%  {:>6.2}%  {:>+6.2}% ║",
            a.symbol,
            a.weight * 100.0,
            a.current_price,
            a.stats.annualized_drift() * 100.0,
            a.stats.annualized_volatility() * 100.0,
            a.average_return_pct
        );
    }

    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Position Values at Horizon:                               ║");
    for a in &sim.assets {
        let pv = &a.position_values;
        println!(
            "║    {:<8} {:>9.2} -> P5={:>9.2} P50={:>9.2} P95={:>9.2} ║",
            a.symbol, a.allocation, pv.p5, pv.p50, pv.p95
        );
    }
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::data::PriceSeries;
    use crate::engine::run_simulation;
    use crate::random::{NormalMethod, SeededShocks};

    fn simulation(retain_paths: bool) -> PortfolioSimulation {
        let a = PriceSeries::from_prices("AAA", &[100.0, 102.0, 101.0, 105.0, 104.0]).unwrap();
        let b = PriceSeries::from_prices("BBB", &[20.0, 19.5, 20.5, 21.0, 20.8]).unwrap();
        let config = SimulationConfig {
            days: 15,
            trials: 40,
            retain_paths,
            ..SimulationConfig::default()
        };
        let shocks = SeededShocks::new(21, NormalMethod::InverseCdf);
        run_simulation(&[a, b], &[0.6, 0.4], &config, &shocks, Some(21)).unwrap()
    }

    #[test]
    fn test_report_from_simulation() {
        let sim = simulation(true);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        assert_eq!(report.assets.len(), 2);
        assert_eq!(report.composition, vec![("AAA".to_string(), 0.6), ("BBB".to_string(), 0.4)]);
        assert_eq!(report.value_bands.p50.len(), 15);
        assert!((report.value_bands.p50[0] - 1000.0).abs() < 1e-9);
        assert_eq!(report.terminal_histogram.counts.iter().sum::<usize>(), 40);
        let bands = report.assets[0].price_bands.as_ref().unwrap();
        assert_eq!(bands.p10[0], 104.0);
        assert!(bands.p10.iter().zip(&bands.p90).all(|(lo, hi)| lo <= hi));
        assert_eq!(report.assets[0].history.len(), 5);
        assert_eq!(report.assets[0].history.last().map(|p| p.price), Some(104.0));
    }

    #[test]
    fn test_report_without_paths_serializes() {
        let sim = simulation(false);
        let report = SimulationReport::from_simulation(&sim).unwrap();
        assert!(report.assets.iter().all(|a| a.price_bands.is_none()));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seed"], 21);
        assert_eq!(json["assets"][1]["symbol"], "BBB");
        assert_eq!(json["assets"][0]["history"][0]["date"], "2000-01-01");
        assert!(json["terminal_values"]["values"].as_array().unwrap().len() == 40);
    }
}
