use super::models::DeciderMethod;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use symcensus::core::consensus::histogram::OverflowPolicy;
use symcensus::core::significance::{
    AllOf, AnyOf, Not, SignificancePredicate, SymmetricRefined, TmScoreThreshold, UltraLiberal,
    ZScoreThreshold,
};
use symcensus::engine::config::FailurePolicy;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCensusConfig {
    pub checkpoint_interval: Option<usize>,
    pub item_timeout_seconds: Option<f64>,
    pub failure_policy: Option<FailurePolicy>,
    pub tolerate_order_failure: Option<bool>,
    pub max_order: Option<u32>,
    pub detection_tolerance: Option<f64>,
}

/// A significance predicate as written in the configuration file, e.g.
///
/// ```toml
/// [significance]
/// type = "all-of"
/// [[significance.of]]
/// type = "tm-score"
/// min = 0.4
/// [[significance.of]]
/// type = "symmetric-refined"
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum SignificanceSpec {
    UltraLiberal,
    TmScore {
        min: f64,
    },
    ZScore {
        min: f64,
    },
    SymmetricRefined {
        #[serde(rename = "angle-tolerance")]
        angle_tolerance: Option<f64>,
    },
    AllOf {
        of: Vec<SignificanceSpec>,
    },
    AnyOf {
        of: Vec<SignificanceSpec>,
    },
    Not {
        of: Box<SignificanceSpec>,
    },
}

impl SignificanceSpec {
    /// `default_tolerance` fills in a `symmetric-refined` predicate without its own tolerance.
    pub fn into_predicate(self, default_tolerance: f64) -> Box<dyn SignificancePredicate> {
        let build = |specs: Vec<SignificanceSpec>| -> Vec<Box<dyn SignificancePredicate>> {
            specs
                .into_iter()
                .map(|s| s.into_predicate(default_tolerance))
                .collect()
        };
        match self {
            Self::UltraLiberal => Box::new(UltraLiberal),
            Self::TmScore { min } => Box::new(TmScoreThreshold { min }),
            Self::ZScore { min } => Box::new(ZScoreThreshold { min }),
            Self::SymmetricRefined { angle_tolerance } => Box::new(SymmetricRefined {
                angle_tolerance: angle_tolerance.unwrap_or(default_tolerance),
            }),
            Self::AllOf { of } => Box::new(AllOf(build(of))),
            Self::AnyOf { of } => Box::new(AnyOf(build(of))),
            Self::Not { of } => Box::new(Not(of.into_predicate(default_tolerance))),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConsensusConfig {
    pub method: Option<DeciderMethod>,
    pub calibration: Option<PathBuf>,
    pub max_order: Option<u32>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAggregationConfig {
    pub min_tm_score: Option<f64>,
    pub overflow: Option<OverflowPolicy>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub census: Option<FileCensusConfig>,
    pub significance: Option<SignificanceSpec>,
    pub consensus: Option<FileConsensusConfig>,
    pub aggregation: Option<FileAggregationConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
