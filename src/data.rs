use crate::error::{Result, SimulationError};
use anyhow::Context;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub const DATE_COLUMN: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Chronologically ordered, strictly positive price history for one asset.
#[derive(Clone, Debug, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, rejecting non-positive prices and out-of-order dates.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self> {
        for (index, point) in points.iter().enumerate() {
            if !(point.price.is_finite() && point.price > 0.0) {
                return Err(SimulationError::NonPositivePrice { index, price: point.price });
            }
        }

        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SimulationError::InvalidParameter(format!(
                "price dates must be strictly increasing ({} follows {})",
                w[1].date, w[0].date
            )));
        }

        Ok(Self { symbol: symbol.into(), points })
    }

    /// Builds a series from bare prices, stamping consecutive calendar days
    /// starting at 2000-01-01.
    pub fn from_prices(symbol: impl Into<String>, prices: &[f64]) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1)
            .ok_or_else(|| SimulationError::InvalidParameter("invalid base date".to_string()))?;
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint { date: start + Duration::days(i as i64), price })
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Last known price, used as the simulation anchor.
    pub fn current_price(&self) -> Option<f64> {
        self.points.last().map(|p| p.price)
    }
}

/// A series read from CSV together with the number of rows dropped as empty.
#[derive(Debug)]
pub struct LoadedSeries {
    pub series: PriceSeries,
    pub skipped_rows: usize,
}

/// Derives a symbol from a data file name, e.g. `data/SAF.PA.csv` -> `SAF.PA`.
pub fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Treats blank, `null` and zero cells as missing observations.
fn parse_price_cell(cell: &str) -> anyhow::Result<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .with_context(|| format!("invalid price '{}'", trimmed))?;
    if value == 0.0 {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Reads a `Date,<price column>,...` CSV into a price series.
///
/// Rows whose price cell is blank, `null` or zero are skipped. Dates are
/// kept as given; gaps left by skipped rows are not re-aligned.
pub fn read_price_csv<R: Read>(reader: R, symbol: &str, price_column: &str) -> anyhow::Result<LoadedSeries> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = csv_reader.headers().context("reading CSV header")?.clone();
    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| anyhow::anyhow!("{}: missing '{}' column", symbol, DATE_COLUMN))?;
    let price_idx = headers
        .iter()
        .position(|h| h == price_column)
        .ok_or_else(|| anyhow::anyhow!("{}: missing '{}' column", symbol, price_column))?;

    let mut points = Vec::new();
    let mut skipped_rows = 0;

    for (row, record) in csv_reader.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = record.with_context(|| format!("{}: reading line {}", symbol, line))?;

        let price_cell = record.get(price_idx).unwrap_or("");
        let price = match parse_price_cell(price_cell).with_context(|| format!("{}: line {}", symbol, line))? {
            Some(price) => price,
            None => {
                skipped_rows += 1;
                continue;
            }
        };

        let date_cell = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(date_cell, DATE_FORMAT)
            .with_context(|| format!("{}: line {}: invalid date '{}'", symbol, line, date_cell))?;

        points.push(PricePoint { date, price });
    }

    if skipped_rows > 0 {
        warn!("{}: skipped {} rows with empty, null or zero '{}'", symbol, skipped_rows, price_column);
    }
    debug!("{}: loaded {} prices", symbol, points.len());

    let series = PriceSeries::new(symbol, points).with_context(|| format!("{}: invalid price history", symbol))?;
    Ok(LoadedSeries { series, skipped_rows })
}

pub fn load_price_csv(path: &Path, symbol: Option<&str>, price_column: &str) -> anyhow::Result<LoadedSeries> {
    let symbol = symbol.map(str::to_string).unwrap_or_else(|| symbol_from_path(path));
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_price_csv(file, &symbol, price_column).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2023-01-02,100.0,101.0,99.0,100.5,100.5,1000
2023-01-03,null,null,null,null,null,null
2023-01-04,102.0,103.0,101.0,102.5,102.5,1200
2023-01-05,,,,,,
2023-01-06,0,0,0,0,0,0
2023-01-09,101.0,102.0,100.0,101.5,101.5,900
2023-01-10,105.0,106.0,104.0,105.5,105.5,1500
";

    #[test]
    fn test_read_price_csv_skips_missing_rows() {
        let loaded = read_price_csv(SAMPLE.as_bytes(), "TEST", "Open").unwrap();
        assert_eq!(loaded.skipped_rows, 3);
        assert_eq!(loaded.series.prices(), vec![100.0, 102.0, 101.0, 105.0]);
        assert_eq!(loaded.series.symbol(), "TEST");
        assert_eq!(loaded.series.current_price(), Some(105.0));
        assert_eq!(
            loaded.series.points()[1].date,
            NaiveDate::from_ymd_opt(2023, 1, 4).unwrap()
        );
    }

    #[test]
    fn test_read_price_csv_other_column() {
        let loaded = read_price_csv(SAMPLE.as_bytes(), "TEST", "Close").unwrap();
        assert_eq!(loaded.series.prices(), vec![100.5, 102.5, 101.5, 105.5]);
    }

    #[test]
    fn test_read_price_csv_missing_column() {
        let err = read_price_csv(SAMPLE.as_bytes(), "TEST", "Settle").unwrap_err();
        assert!(err.to_string().contains("Settle"));
    }

    #[test]
    fn test_read_price_csv_rejects_garbage_price() {
        let data = "Date,Open\n2023-01-02,abc\n";
        assert!(read_price_csv(data.as_bytes(), "TEST", "Open").is_err());
    }

    #[test]
    fn test_read_price_csv_rejects_unordered_dates() {
        let data = "Date,Open\n2023-01-03,10\n2023-01-02,11\n";
        assert!(read_price_csv(data.as_bytes(), "TEST", "Open").is_err());
    }

    #[test]
    fn test_price_series_rejects_negative_price() {
        let err = PriceSeries::from_prices("X", &[10.0, -1.0]).unwrap_err();
        assert_eq!(err, SimulationError::NonPositivePrice { index: 1, price: -1.0 });
    }

    #[test]
    fn test_symbol_from_path() {
        assert_eq!(symbol_from_path(Path::new("data/SAF.PA.csv")), "SAF.PA");
        assert_eq!(symbol_from_path(Path::new("UBS.csv")), "UBS");
    }
}
