use serde::Serialize;

/// Dense `[days x trials]` grid of simulated values.
///
/// Storage is trial-major: each trial's path is contiguous, which lets the
/// simulator hand whole paths to worker threads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ensemble {
    days: usize,
    trials: usize,
    values: Vec<f64>,
}

/// Simulated prices of one asset.
pub type PricePathEnsemble = Ensemble;

/// Summed value of all allocated positions.
pub type PortfolioValueEnsemble = Ensemble;

impl Ensemble {
    pub fn zeros(days: usize, trials: usize) -> Self {
        Self { days, trials, values: vec![0.0; days * trials] }
    }

    pub(crate) fn from_values(days: usize, trials: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), days * trials);
        Self { days, trials, values }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.days, self.trials)
    }

    pub fn get(&self, day: usize, trial: usize) -> f64 {
        self.values[trial * self.days + day]
    }

    /// Full path of one trial, day 0 first.
    pub fn path(&self, trial: usize) -> &[f64] {
        let start = trial * self.days;
        &self.values[start..start + self.days]
    }

    pub fn paths(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.days.max(1)).take(self.trials)
    }

    /// Values of every trial on one day.
    pub fn day(&self, day: usize) -> Vec<f64> {
        self.paths().map(|p| p[day]).collect()
    }

    /// Last row of the grid.
    pub fn terminal_values(&self) -> Vec<f64> {
        match self.days {
            0 => Vec::new(),
            d => self.day(d - 1),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            days: self.days,
            trials: self.trials,
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Ensemble {
        // 3 days x 2 trials, trial-major.
        Ensemble::from_values(3, 2, vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0])
    }

    #[test]
    fn test_indexing() {
        let e = grid();
        assert_eq!(e.shape(), (3, 2));
        assert_eq!(e.get(0, 1), 10.0);
        assert_eq!(e.get(2, 0), 3.0);
        assert_eq!(e.path(1), &[10.0, 20.0, 30.0]);
        assert_eq!(e.day(1), vec![2.0, 20.0]);
        assert_eq!(e.terminal_values(), vec![3.0, 30.0]);
        assert_eq!(e.paths().count(), 2);
    }

    #[test]
    fn test_scaled() {
        let e = grid().scaled(0.5);
        assert_eq!(e.path(0), &[0.5, 1.0, 1.5]);
    }
}
