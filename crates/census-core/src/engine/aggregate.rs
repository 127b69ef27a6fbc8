use super::collaborators::GroupLookup;
use super::config::AggregationConfig;
use crate::core::consensus::OrderDecider;
use crate::core::consensus::histogram::VoteHistogram;
use crate::core::models::record::ResultRecord;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// The consensus reached for one classification group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub group: String,
    pub histogram: VoteHistogram,
    pub consensus: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationReport {
    /// Groups with at least one vote, sorted by group key.
    pub groups: Vec<GroupOutcome>,
    /// Groups whose records were all filtered out. Not part of the tally.
    pub empty_groups: Vec<String>,
    /// Consensus order to number of groups.
    pub tally: BTreeMap<u32, usize>,
    pub unclassified: usize,
    pub below_threshold: usize,
    pub failed: usize,
    /// Votes above the decider's maximum order, whether clamped or dropped.
    pub overflowed: usize,
}

impl AggregationReport {
    pub fn voters(&self) -> u64 {
        self.groups.iter().map(|g| g.histogram.total()).sum()
    }
}

/// Buckets census records by classification group and decides each group's order.
pub struct GroupAggregator<'a> {
    lookup: &'a dyn GroupLookup,
    decider: &'a dyn OrderDecider,
    config: AggregationConfig,
}

impl<'a> GroupAggregator<'a> {
    pub fn new(
        lookup: &'a dyn GroupLookup,
        decider: &'a dyn OrderDecider,
        config: AggregationConfig,
    ) -> Self {
        Self {
            lookup,
            decider,
            config,
        }
    }

    pub fn aggregate(&self, records: &[ResultRecord]) -> AggregationReport {
        let max_order = self.decider.max_order();
        let mut report = AggregationReport::default();
        let mut seen = BTreeSet::new();
        let mut histograms: BTreeMap<String, VoteHistogram> = BTreeMap::new();

        for record in records {
            let Some(group) = self.lookup.lookup_group(record.id()) else {
                warn!(id = record.id(), "No classification group for record; skipping.");
                report.unclassified += 1;
                continue;
            };
            seen.insert(group.clone());

            let Some(order) = record.effective_order() else {
                report.failed += 1;
                continue;
            };
            if !self.passes_tm_cutoff(record) {
                report.below_threshold += 1;
                continue;
            }

            if order > max_order {
                report.overflowed += 1;
                warn!(
                    id = record.id(),
                    order,
                    max_order,
                    policy = ?self.config.overflow,
                    "Order above the consensus range."
                );
            }
            let histogram = histograms
                .entry(group)
                .or_insert_with(|| VoteHistogram::new(max_order));
            histogram.add_vote(order, self.config.overflow);
        }

        for group in seen {
            match histograms.remove(&group) {
                Some(histogram) if !histogram.is_empty() => {
                    let consensus = self.decider.decide(&histogram);
                    debug!(group = %group, votes = histogram.total(), consensus, "Group decided.");
                    *report.tally.entry(consensus).or_insert(0) += 1;
                    report.groups.push(GroupOutcome {
                        group,
                        histogram,
                        consensus,
                    });
                }
                _ => report.empty_groups.push(group),
            }
        }
        report
    }

    // Inclusive; a missing TM-score fails any configured cutoff.
    fn passes_tm_cutoff(&self, record: &ResultRecord) -> bool {
        match self.config.min_tm_score {
            Some(min) => record.scores().tm_score.is_some_and(|tm| tm >= min),
            None => true,
        }
    }
}
