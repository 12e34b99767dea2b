use thiserror::Error;

/// Failures raised by the simulation core. All of them are reported at the
/// point of violation; nothing is retried or silently repaired.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Insufficient data: need at least {required} prices, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Price at index {index} must be positive and finite, got {price}")]
    NonPositivePrice { index: usize, price: f64 },

    #[error("Weight mismatch: {0}")]
    WeightMismatch(String),

    #[error(
        "Shape mismatch: expected {expected_days} days x {expected_trials} trials, got {found_days} x {found_trials}"
    )]
    ShapeMismatch {
        expected_days: usize,
        expected_trials: usize,
        found_days: usize,
        found_trials: usize,
    },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("{symbol}: {source}")]
    Asset {
        symbol: String,
        #[source]
        source: Box<SimulationError>,
    },
}

impl SimulationError {
    /// Attaches the asset symbol to an error raised while processing that asset.
    pub fn for_asset(self, symbol: &str) -> Self {
        SimulationError::Asset {
            symbol: symbol.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
