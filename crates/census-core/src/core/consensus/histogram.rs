use serde::{Deserialize, Serialize};

/// What to do with a vote for an order above the histogram's cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Count the vote towards the maximum order.
    Clamp,
    /// Drop the vote.
    #[default]
    Exclude,
}

/// Vote counts for orders `1..=max_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteHistogram {
    counts: Vec<u64>,
}

impl VoteHistogram {
    pub fn new(max_order: u32) -> Self {
        Self {
            counts: vec![0; max_order.max(1) as usize],
        }
    }

    /// Builds a histogram from `(order, count)` pairs. Orders outside `1..=max_order` are
    /// dropped.
    pub fn from_counts(max_order: u32, counts: impl IntoIterator<Item = (u32, u64)>) -> Self {
        let mut histogram = Self::new(max_order);
        for (order, count) in counts {
            if (1..=histogram.max_order()).contains(&order) {
                histogram.counts[order as usize - 1] += count;
            }
        }
        histogram
    }

    pub fn max_order(&self) -> u32 {
        self.counts.len() as u32
    }

    /// Records one vote. Returns the order the vote was counted under, or `None` when the
    /// vote was dropped.
    pub fn add_vote(&mut self, order: u32, overflow: OverflowPolicy) -> Option<u32> {
        let order = order.max(1);
        let counted = if order <= self.max_order() {
            order
        } else {
            match overflow {
                OverflowPolicy::Clamp => self.max_order(),
                OverflowPolicy::Exclude => return None,
            }
        };
        self.counts[counted as usize - 1] += 1;
        Some(counted)
    }

    /// Votes for the given order; zero outside the histogram's range.
    pub fn count(&self, order: u32) -> u64 {
        if order == 0 {
            return 0;
        }
        self.counts.get(order as usize - 1).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
