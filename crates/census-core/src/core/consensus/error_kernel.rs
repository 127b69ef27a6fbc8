//! Bias-correcting consensus over an error-transition matrix.
//!
//! Detected orders are related to the true order by integer ratios: a true 2-fold domain
//! reported as 4-fold is one doubling step away, one reported as 8-fold is three steps away
//! (`8 / 2 - 1`). The one-step kernel is the calibration matrix split into its strict upper
//! triangle (true order reported too large) and strict lower triangle (true order reported
//! too small). An `m`-step transition is the `m`-th power of the matching half.
//!
//! For a candidate true order `i` and an observed order `j`, the fraction of the `j` votes
//! that belongs to `i` is moved into the corrected score of `i`: added when `i < j`,
//! subtracted when `i > j`. The asymmetric sign is the historical behaviour of this decider
//! and is kept so that census results stay comparable across releases.

use super::calibration::TransitionMatrix;
use super::histogram::VoteHistogram;
use super::{OrderDecider, argmax_order};
use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub struct ErrorKernelDecider {
    max_order: u32,
    /// `upper_powers[m - 1]` is the strict upper triangle raised to the power `m`.
    upper_powers: Vec<DMatrix<f64>>,
    lower_powers: Vec<DMatrix<f64>>,
}

impl ErrorKernelDecider {
    pub fn new(calibration: &TransitionMatrix) -> Self {
        let matrix = calibration.as_matrix();
        let size = matrix.nrows();
        let upper = DMatrix::from_fn(size, size, |i, j| if i < j { matrix[(i, j)] } else { 0.0 });
        let lower = DMatrix::from_fn(size, size, |i, j| if i > j { matrix[(i, j)] } else { 0.0 });

        // The largest step count between two orders in 1..=K is K / 1 - 1.
        let max_steps = size.saturating_sub(1);
        Self {
            max_order: size as u32,
            upper_powers: successive_powers(&upper, max_steps),
            lower_powers: successive_powers(&lower, max_steps),
        }
    }

    /// Corrected score per candidate true order, index 0 being order 1.
    pub fn corrected_scores(&self, histogram: &VoteHistogram) -> Vec<f64> {
        let k = self.max_order;
        let votes: Vec<f64> = (1..=k).map(|order| histogram.count(order) as f64).collect();
        let mut scores = votes.clone();

        for i in 1..=k {
            for j in (1..=k).filter(|&j| j != i) {
                let steps = (i.max(j) / i.min(j)) as usize - 1;
                if steps == 0 {
                    continue;
                }
                let (row, col) = (i as usize - 1, j as usize - 1);
                let observed = votes[col];
                if i < j {
                    scores[row] += self.upper_powers[steps - 1][(row, col)] * observed;
                } else {
                    scores[row] -= self.lower_powers[steps - 1][(row, col)] * observed;
                }
            }
        }
        scores
    }
}

impl OrderDecider for ErrorKernelDecider {
    fn max_order(&self) -> u32 {
        self.max_order
    }

    fn decide(&self, histogram: &VoteHistogram) -> u32 {
        if histogram.is_empty() {
            return 1;
        }
        argmax_order(&self.corrected_scores(histogram))
    }
}

/// `[base, base^2, ..., base^count]`.
fn successive_powers(base: &DMatrix<f64>, count: usize) -> Vec<DMatrix<f64>> {
    let mut powers: Vec<DMatrix<f64>> = Vec::with_capacity(count);
    for _ in 0..count {
        let next = match powers.last() {
            Some(previous) => previous * base,
            None => base.clone(),
        };
        powers.push(next);
    }
    powers
}
