use super::histogram::VoteHistogram;
use super::{OrderDecider, argmax_order};

/// Weight a vote for order `j` lends to each proper divisor of `j`.
const DIVISOR_WEIGHT: f64 = 0.5;

/// Picks the order with the most votes, without any bias correction.
#[derive(Debug, Clone, Copy)]
pub struct MajorityDecider {
    max_order: u32,
}

impl MajorityDecider {
    pub fn new(max_order: u32) -> Self {
        Self {
            max_order: max_order.max(1),
        }
    }
}

impl OrderDecider for MajorityDecider {
    fn max_order(&self) -> u32 {
        self.max_order
    }

    fn decide(&self, histogram: &VoteHistogram) -> u32 {
        let scores: Vec<f64> = (1..=self.max_order)
            .map(|order| histogram.count(order) as f64)
            .collect();
        if scores.iter().all(|&s| s == 0.0) {
            return 1;
        }
        argmax_order(&scores)
    }
}

/// Majority vote that tolerates detectors reporting a multiple of the true order.
///
/// A vote for order `j` counts fully for `j` and with half weight for every divisor `d` of
/// `j` with `1 < d < j`. Order 1 receives only its own votes.
#[derive(Debug, Clone, Copy)]
pub struct DivisorDecider {
    max_order: u32,
}

impl DivisorDecider {
    pub fn new(max_order: u32) -> Self {
        Self {
            max_order: max_order.max(1),
        }
    }
}

impl OrderDecider for DivisorDecider {
    fn max_order(&self) -> u32 {
        self.max_order
    }

    fn decide(&self, histogram: &VoteHistogram) -> u32 {
        let k = self.max_order;
        let mut scores = vec![0.0; k as usize];
        for observed in 1..=k {
            let votes = histogram.count(observed) as f64;
            if votes == 0.0 {
                continue;
            }
            scores[observed as usize - 1] += votes;
            for divisor in (2..observed).filter(|d| observed % d == 0) {
                scores[divisor as usize - 1] += DIVISOR_WEIGHT * votes;
            }
        }
        if scores.iter().all(|&s| s == 0.0) {
            return 1;
        }
        argmax_order(&scores)
    }
}
