//! # Consensus Module
//!
//! Turns per-domain putative orders into one consensus order for a group of related
//! domains.
//!
//! - [`histogram`] - Vote counts per order, capped at a maximum order
//! - [`calibration`] - The empirically measured error-transition matrix
//! - [`error_kernel`] - The bias-correcting decider built on that matrix
//! - [`voting`] - Plain majority and divisor-tolerant deciders
//!
//! Every decider returns an order in `1..=K` and answers 1 for an empty histogram.

pub mod calibration;
pub mod error_kernel;
pub mod histogram;
pub mod voting;

use histogram::VoteHistogram;

pub trait OrderDecider: Send + Sync {
    /// The largest order this decider can return.
    fn max_order(&self) -> u32;

    fn decide(&self, histogram: &VoteHistogram) -> u32;
}

/// 1-indexed position of the largest score; the first maximum wins ties.
///
/// NaN scores never win. An empty or all-NaN slice yields 1.
pub(crate) fn argmax_order(scores: &[f64]) -> u32 {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map_or(1, |(idx, _)| idx as u32 + 1)
}
