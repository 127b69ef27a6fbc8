use crate::core::consensus::histogram::OverflowPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// What the runner does with a job that could not be completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave the item out of the store; a later run retries it.
    Skip,
    /// Store a failure-marked placeholder; a later run treats the item as done.
    #[default]
    Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CensusConfig {
    /// Number of processed items between two checkpoints.
    pub checkpoint_interval: usize,
    /// Wall-clock budget for aligning and detecting the order of one item.
    pub item_timeout: Duration,
    pub failure_policy: FailurePolicy,
    /// Treat an order-detection failure as order 1 instead of a failed item.
    pub tolerate_order_failure: bool,
}

#[derive(Default)]
pub struct CensusConfigBuilder {
    checkpoint_interval: Option<usize>,
    item_timeout: Option<Duration>,
    failure_policy: Option<FailurePolicy>,
    tolerate_order_failure: Option<bool>,
}

impl CensusConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }
    pub fn item_timeout(mut self, timeout: Duration) -> Self {
        self.item_timeout = Some(timeout);
        self
    }
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }
    pub fn tolerate_order_failure(mut self, tolerate: bool) -> Self {
        self.tolerate_order_failure = Some(tolerate);
        self
    }

    pub fn build(self) -> Result<CensusConfig, ConfigError> {
        let checkpoint_interval = self
            .checkpoint_interval
            .ok_or(ConfigError::MissingParameter("checkpoint_interval"))?;
        if checkpoint_interval == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "checkpoint_interval",
                reason: "must be at least 1".to_string(),
            });
        }
        let item_timeout = self
            .item_timeout
            .ok_or(ConfigError::MissingParameter("item_timeout"))?;
        if item_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                parameter: "item_timeout",
                reason: "must be positive".to_string(),
            });
        }
        Ok(CensusConfig {
            checkpoint_interval,
            item_timeout,
            failure_policy: self
                .failure_policy
                .ok_or(ConfigError::MissingParameter("failure_policy"))?,
            tolerate_order_failure: self
                .tolerate_order_failure
                .ok_or(ConfigError::MissingParameter("tolerate_order_failure"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeciderKind {
    /// Bias-corrected consensus; the maximum order is the calibration matrix size.
    ErrorKernel { calibration_path: PathBuf },
    Majority { max_order: u32 },
    Divisor { max_order: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// Records with a TM-score below this cutoff do not vote. Inclusive.
    pub min_tm_score: Option<f64>,
    pub overflow: OverflowPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldOrderConfig {
    pub decider: DeciderKind,
    pub aggregation: AggregationConfig,
}

#[derive(Default)]
pub struct FoldOrderConfigBuilder {
    decider: Option<DeciderKind>,
    min_tm_score: Option<f64>,
    overflow: Option<OverflowPolicy>,
}

impl FoldOrderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decider(mut self, decider: DeciderKind) -> Self {
        self.decider = Some(decider);
        self
    }
    pub fn min_tm_score(mut self, cutoff: Option<f64>) -> Self {
        self.min_tm_score = cutoff;
        self
    }
    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = Some(overflow);
        self
    }

    pub fn build(self) -> Result<FoldOrderConfig, ConfigError> {
        let decider = self
            .decider
            .ok_or(ConfigError::MissingParameter("decider"))?;
        if let DeciderKind::Majority { max_order: 0 } | DeciderKind::Divisor { max_order: 0 } =
            decider
        {
            return Err(ConfigError::InvalidValue {
                parameter: "max_order",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(FoldOrderConfig {
            decider,
            aggregation: AggregationConfig {
                min_tm_score: self.min_tm_score,
                overflow: self
                    .overflow
                    .ok_or(ConfigError::MissingParameter("overflow"))?,
            },
        })
    }
}
