use crate::ensemble::Ensemble;
use crate::error::{Result, SimulationError};
use serde::Serialize;

/// Distribution of one per-trial quantity (terminal price, position value, ...).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    /// The per-trial values themselves, in trial order.
    pub values: Vec<f64>,
}

/// Nearest-rank percentile on already sorted data, `p` in `[0, 100]`.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let idx = ((p / 100.0) * (n as f64 - 1.0)).round() as usize;
    sorted[idx.min(n - 1)]
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

impl DistributionSummary {
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(SimulationError::EmptyInput("cannot summarize an empty sequence".to_string()));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let sorted = sorted_copy(&values);

        Ok(Self {
            count: values.len(),
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p5: percentile_sorted(&sorted, 5.0),
            p50: percentile_sorted(&sorted, 50.0),
            p95: percentile_sorted(&sorted, 95.0),
            values,
        })
    }
}

/// Arithmetic mean, rejecting empty input.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(SimulationError::EmptyInput("cannot average an empty sequence".to_string()));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

// ──────────────────────────────────────────────────────────────────────────────
// Histogram
// ──────────────────────────────────────────────────────────────────────────────

/// Equal-width histogram normalised as a probability density.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub densities: Vec<f64>,
}

impl Histogram {
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(SimulationError::EmptyInput("cannot bin an empty sequence".to_string()));
        }
        if bins == 0 {
            return Err(SimulationError::InvalidParameter("histogram needs at least one bin".to_string()));
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if max <= min {
            // Every value identical: one unit-width bin centred on it.
            return Ok(Self {
                edges: vec![min - 0.5, min + 0.5],
                counts: vec![values.len()],
                densities: vec![1.0],
            });
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0usize; bins];
        for &v in values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let total = values.len() as f64;
        let edges = (0..=bins).map(|i| min + width * i as f64).collect();
        let densities = counts.iter().map(|&c| c as f64 / (total * width)).collect();

        Ok(Self { edges, counts, densities })
    }

    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    pub fn bin_centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Risk
// ──────────────────────────────────────────────────────────────────────────────

/// Downside figures of a terminal-value distribution against a reference value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RiskSummary {
    pub reference: f64,
    /// Share of trials ending below the reference.
    pub probability_of_loss: f64,
    /// Loss at the 5th percentile, in percent of the reference (>= 0).
    pub var_95: f64,
    /// Mean loss over the worst 5% of trials, in percent of the reference (>= 0).
    pub cvar_95: f64,
}

impl RiskSummary {
    pub fn from_values(values: &[f64], reference: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(SimulationError::EmptyInput("cannot assess risk of an empty sequence".to_string()));
        }
        if !(reference.is_finite() && reference > 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "risk reference must be positive, got {}",
                reference
            )));
        }

        let sorted = sorted_copy(values);
        let n = sorted.len();
        let losses = sorted.iter().filter(|&&v| v < reference).count();

        let p5_idx = ((0.05 * (n as f64 - 1.0)).round() as usize).min(n - 1);
        let var_95 = ((reference - sorted[p5_idx]) / reference * 100.0).max(0.0);

        let tail = &sorted[..=p5_idx];
        let tail_mean = tail.iter().sum::<f64>() / tail.len() as f64;
        let cvar_95 = ((reference - tail_mean) / reference * 100.0).max(0.0);

        Ok(Self {
            reference,
            probability_of_loss: losses as f64 / n as f64,
            var_95,
            cvar_95,
        })
    }
}

/// Per-day percentile of an ensemble across trials.
pub fn percentile_band(ensemble: &Ensemble, p: f64) -> Vec<f64> {
    (0..ensemble.days())
        .map(|day| percentile_sorted(&sorted_copy(&ensemble.day(day)), p.clamp(0.0, 100.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_basic() {
        let s = DistributionSummary::from_values(vec![3.0, 1.0, 2.0, 4.0, 5.0]).unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.mean, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert_eq!(s.p50, 3.0);
        assert!((s.std_dev - 2f64.sqrt()).abs() < 1e-12);
        // Values stay in trial order.
        assert_eq!(s.values, vec![3.0, 1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_summary_single_value() {
        let s = DistributionSummary::from_values(vec![7.5]).unwrap();
        assert_eq!(s.mean, 7.5);
        assert_eq!(s.p5, 7.5);
        assert_eq!(s.p95, 7.5);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(DistributionSummary::from_values(vec![]).is_err());
        assert!(mean(&[]).is_err());
        assert!(Histogram::from_values(&[], 10).is_err());
        assert!(RiskSummary::from_values(&[], 1.0).is_err());
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.37).sin() * 10.0).collect();
        let h = Histogram::from_values(&values, 30).unwrap();
        assert_eq!(h.counts.len(), 30);
        assert_eq!(h.edges.len(), 31);
        assert_eq!(h.counts.iter().sum::<usize>(), 1000);
        let area: f64 = h.densities.iter().map(|d| d * h.bin_width()).sum();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_degenerate() {
        let h = Histogram::from_values(&[1000.0; 4], 30).unwrap();
        assert_eq!(h.counts, vec![4]);
        assert_eq!(h.bin_centers(), vec![1000.0]);
    }

    #[test]
    fn test_risk_summary() {
        let values: Vec<f64> = (1..=100).map(|v| v as f64 * 20.0).collect(); // 20..2000
        let risk = RiskSummary::from_values(&values, 1000.0).unwrap();
        assert!((risk.probability_of_loss - 0.49).abs() < 1e-12);
        // idx = round(0.05 * 99) = 5 -> 120.0
        assert!((risk.var_95 - 88.0).abs() < 1e-9);
        // tail = 20..120 -> mean 70
        assert!((risk.cvar_95 - 93.0).abs() < 1e-9);
    }

    #[test]
    fn test_risk_never_negative() {
        let risk = RiskSummary::from_values(&[1500.0, 1600.0], 1000.0).unwrap();
        assert_eq!(risk.probability_of_loss, 0.0);
        assert_eq!(risk.var_95, 0.0);
        assert_eq!(risk.cvar_95, 0.0);
    }

    #[test]
    fn test_percentile_band() {
        let e = Ensemble::from_values(2, 3, vec![10.0, 12.0, 10.0, 8.0, 10.0, 11.0]);
        assert_eq!(percentile_band(&e, 50.0), vec![10.0, 11.0]);
        assert_eq!(percentile_band(&e, 0.0), vec![10.0, 8.0]);
        assert_eq!(percentile_band(&e, 100.0), vec![10.0, 12.0]);
    }
}
