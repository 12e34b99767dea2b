use crate::error::SimulationError;
use crate::random::NormalMethod;
use crate::simulation::Horizon;
use anyhow::Context;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

static RAYON_INIT: OnceLock<()> = OnceLock::new();

/// Trading days per year, for annualizing daily statistics.
pub const TRADING_DAYS: f64 = 252.0;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

pub const DEFAULT_TRIALS: usize = 100;
pub const DEFAULT_DAYS: usize = 365;
pub const DEFAULT_INITIAL_INVESTMENT: f64 = 1000.0;
pub const DEFAULT_PRICE_COLUMN: &str = "Open";

/// Bins used for terminal-value histograms.
pub const HISTOGRAM_BINS: usize = 30;

/// Upper bound on individual paths drawn in the dashboard.
pub const MAX_DISPLAYED_PATHS: usize = 25;

/// Builds the global Rayon pool once. `threads = None` uses every logical core.
pub fn init_cpu_parallelism(threads: Option<usize>) {
    RAYON_INIT.get_or_init(|| {
        let num_threads = threads.unwrap_or_else(num_cpus::get).max(1);
        match ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
            Ok(_) => info!("Initialized Rayon thread pool with {} threads", num_threads),
            Err(e) => warn!(
                "Rayon thread pool already initialized or unavailable ({}). Using existing configuration.",
                e
            ),
        }
    });
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

fn default_days() -> usize {
    DEFAULT_DAYS
}

fn default_initial_investment() -> f64 {
    DEFAULT_INITIAL_INVESTMENT
}

fn default_retain_paths() -> bool {
    true
}

fn default_price_column() -> String {
    DEFAULT_PRICE_COLUMN.to_string()
}

/// Run-wide simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Simulated days including day 0.
    #[serde(default = "default_days")]
    pub days: usize,
    #[serde(default = "default_initial_investment")]
    pub initial_investment: f64,
    /// Fixed seed; a random one is drawn (and reported) when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub normal_method: NormalMethod,
    /// Keep every asset's full price grid after aggregation.
    #[serde(default = "default_retain_paths")]
    pub retain_paths: bool,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            days: DEFAULT_DAYS,
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            seed: None,
            normal_method: NormalMethod::default(),
            retain_paths: true,
            threads: None,
        }
    }
}

impl SimulationConfig {
    pub fn horizon(&self) -> Result<Horizon, SimulationError> {
        Horizon::new(self.days, self.trials)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        self.horizon()?;
        if !(self.initial_investment.is_finite() && self.initial_investment > 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "initial investment must be positive, got {}",
                self.initial_investment
            )));
        }
        if self.threads == Some(0) {
            return Err(SimulationError::InvalidParameter("threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// One asset entry of a portfolio file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Defaults to the file stem of `path`.
    #[serde(default)]
    pub symbol: Option<String>,
    pub path: PathBuf,
    pub weight: f64,
}

/// JSON portfolio definition: simulation parameters plus the asset list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioFile {
    #[serde(flatten)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    pub assets: Vec<AssetSpec>,
}

impl PortfolioFile {
    /// Reads a portfolio file; relative asset paths resolve against its directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut portfolio: PortfolioFile = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;

        if let Some(base) = path.parent() {
            for asset in portfolio.assets.iter_mut() {
                if asset.path.is_relative() {
                    asset.path = base.join(&asset.path);
                }
            }
        }

        info!("Loaded portfolio file {} ({} assets)", path.display(), portfolio.assets.len());
        Ok(portfolio)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.assets.iter().map(|a| a.weight).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.trials, 100);
        assert_eq!(cfg.days, 365);
        assert_eq!(cfg.initial_investment, 1000.0);
        assert!(cfg.retain_paths);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_portfolio_file_parsing_with_defaults() {
        let json = r#"{
            "trials": 500,
            "seed": 42,
            "normal_method": "ziggurat",
            "assets": [
                { "path": "SAF.PA.csv", "weight": 0.4 },
                { "symbol": "AIR", "path": "AIR.PA.csv", "weight": 0.3 },
                { "path": "UBS.csv", "weight": 0.3 }
            ]
        }"#;
        let file: PortfolioFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.simulation.trials, 500);
        assert_eq!(file.simulation.days, DEFAULT_DAYS);
        assert_eq!(file.simulation.seed, Some(42));
        assert_eq!(file.simulation.normal_method, NormalMethod::Ziggurat);
        assert_eq!(file.price_column, "Open");
        assert_eq!(file.assets.len(), 3);
        assert_eq!(file.assets[1].symbol.as_deref(), Some("AIR"));
        assert_eq!(file.weights(), vec![0.4, 0.3, 0.3]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = SimulationConfig::default();
        cfg.trials = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.initial_investment = -5.0;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.threads = Some(0);
        assert!(cfg.validate().is_err());
    }
}
