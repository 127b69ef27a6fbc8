use super::file::SignificanceSpec;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;
use symcensus::engine::config as core_config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DeciderMethod {
    /// Bias-corrected consensus from a calibration matrix.
    ErrorKernel,
    /// Plain majority vote.
    Majority,
    /// Majority vote that also credits divisors of each voted order.
    Divisor,
}

pub struct RunAppConfig {
    pub item_files: Vec<PathBuf>,
    pub alignment_table: PathBuf,
    pub output: PathBuf,
    pub max_order: u32,
    pub detection_tolerance: f64,
    pub significance: SignificanceSpec,
    pub core_config: core_config::CensusConfig,
}

pub struct FoldOrderAppConfig {
    pub store: PathBuf,
    pub groups: PathBuf,
    pub report: Option<PathBuf>,
    pub core_config: core_config::FoldOrderConfig,
}
