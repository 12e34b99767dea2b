use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use portfolio_montecarlo::app::App;
use portfolio_montecarlo::config::{self, PortfolioFile, SimulationConfig, DEFAULT_PRICE_COLUMN};
use portfolio_montecarlo::data::{load_price_csv, PriceSeries};
use portfolio_montecarlo::engine::{run_simulation, PortfolioSimulation};
use portfolio_montecarlo::random::{NormalMethod, SeededShocks};
use portfolio_montecarlo::report::{print_report, SimulationReport};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NormalChoice {
    InverseCdf,
    Ziggurat,
}

impl From<NormalChoice> for NormalMethod {
    fn from(choice: NormalChoice) -> Self {
        match choice {
            NormalChoice::InverseCdf => NormalMethod::InverseCdf,
            NormalChoice::Ziggurat => NormalMethod::Ziggurat,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Monte Carlo portfolio simulation driven by historical daily prices",
    after_help = "EXAMPLES:
    # Three assets from CSV files, weights in the same order
    portfolio-montecarlo --files SAF.PA.csv,AIR.PA.csv,UBS.csv --weights 0.4,0.3,0.3

    # Portfolio file with a fixed seed, report only
    portfolio-montecarlo --config portfolio.json --seed 42 --no-tui

    # Larger run exported to JSON
    portfolio-montecarlo --config portfolio.json --trials 10000 --days 252 --no-paths --output run.json"
)]
struct Args {
    /// JSON portfolio file (simulation parameters plus asset list)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated price CSV files, one per asset
    #[arg(long, value_delimiter = ',')]
    files: Vec<PathBuf>,

    /// Comma-separated weights matching --files, summing to 1
    #[arg(long, value_delimiter = ',')]
    weights: Vec<f64>,

    /// Number of simulated trials (default: 100)
    #[arg(long)]
    trials: Option<usize>,

    /// Simulated days including day 0 (default: 365)
    #[arg(long)]
    days: Option<usize>,

    /// Initial investment (default: 1000)
    #[arg(long)]
    investment: Option<f64>,

    /// Seed for reproducible runs; a random seed is drawn and reported otherwise
    #[arg(long)]
    seed: Option<u64>,

    /// Standard normal sampling method
    #[arg(long, value_enum)]
    normal: Option<NormalChoice>,

    /// CSV column holding the price (default: Open)
    #[arg(long)]
    price_column: Option<String>,

    /// Worker threads for path generation (default: all logical cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the report and exit without opening the dashboard
    #[arg(long)]
    no_tui: bool,

    /// Drop per-asset price grids after aggregation to save memory
    #[arg(long)]
    no_paths: bool,
}

/// Resolved run inputs: simulation parameters, loaded series, weights.
struct RunInputs {
    config: SimulationConfig,
    series: Vec<PriceSeries>,
    weights: Vec<f64>,
}

fn resolve_inputs(args: &Args) -> Result<RunInputs> {
    let (mut config, price_column, assets) = match &args.config {
        Some(path) => {
            let file = PortfolioFile::load(path)?;
            let assets: Vec<(Option<String>, PathBuf, f64)> = file
                .assets
                .into_iter()
                .map(|a| (a.symbol, a.path, a.weight))
                .collect();
            (file.simulation, file.price_column, assets)
        }
        None => {
            if args.files.is_empty() {
                bail!("no assets given: pass --config <portfolio.json> or --files a.csv,b.csv --weights 0.5,0.5");
            }
            if args.files.len() != args.weights.len() {
                bail!(
                    "{} files but {} weights; every file needs exactly one weight",
                    args.files.len(),
                    args.weights.len()
                );
            }
            let assets = args
                .files
                .iter()
                .cloned()
                .zip(args.weights.iter().copied())
                .map(|(path, weight)| (None, path, weight))
                .collect();
            (SimulationConfig::default(), DEFAULT_PRICE_COLUMN.to_string(), assets)
        }
    };

    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if let Some(days) = args.days {
        config.days = days;
    }
    if let Some(investment) = args.investment {
        config.initial_investment = investment;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(normal) = args.normal {
        config.normal_method = normal.into();
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.no_paths {
        config.retain_paths = false;
    }
    let price_column = args.price_column.clone().unwrap_or(price_column);

    let mut series = Vec::with_capacity(assets.len());
    let mut weights = Vec::with_capacity(assets.len());
    for (symbol, path, weight) in assets {
        let loaded = load_price_csv(&path, symbol.as_deref(), &price_column)
            .with_context(|| format!("loading prices from {}", path.display()))?;
        info!(
            "Loaded {} prices for {} ({} rows skipped)",
            loaded.series.len(),
            loaded.series.symbol(),
            loaded.skipped_rows
        );
        series.push(loaded.series);
        weights.push(weight);
    }

    Ok(RunInputs { config, series, weights })
}

/// Presentation failures are logged; the simulation result is never discarded.
fn build_report(simulation: &PortfolioSimulation) -> Option<SimulationReport> {
    match SimulationReport::from_simulation(simulation) {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Failed to build simulation report, skipping export and dashboard: {:#}", e);
            None
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_montecarlo=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let inputs = resolve_inputs(&args)?;
    inputs.config.validate()?;
    config::init_cpu_parallelism(inputs.config.threads);

    let shocks = match inputs.config.seed {
        Some(seed) => SeededShocks::new(seed, inputs.config.normal_method),
        None => SeededShocks::from_entropy(inputs.config.normal_method),
    };
    info!("Using seed {} ({} normals)", shocks.seed(), shocks.method().as_str());

    let simulation = run_simulation(
        &inputs.series,
        &inputs.weights,
        &inputs.config,
        &shocks,
        Some(shocks.seed()),
    )?;
    drop(inputs);

    print_report(&simulation);

    let Some(report) = build_report(&simulation) else {
        return Ok(());
    };

    if let Some(path) = &args.output {
        match report.write_json(path) {
            Ok(()) => info!("Wrote JSON report to {}", path.display()),
            Err(e) => error!("Failed to write JSON report: {:#}", e),
        }
    }

    if args.no_tui {
        return Ok(());
    }

    let mut terminal = ratatui::init();
    let mut app = App::new(&simulation, &report);
    let res = app.run(&mut terminal);

    ratatui::restore();

    if let Err(e) = res {
        error!("Dashboard error: {:?}", e);
    }

    Ok(())
}
