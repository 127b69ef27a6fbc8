use crate::config::models::DeciderMethod;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "census - run resumable protein symmetry censuses and decide consensus orders for structural families.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel alignment jobs.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run or resume a census over the domains listed in one or more item files.
    Run(RunArgs),
    /// Concatenate result stores from independent runs into one store.
    Merge(MergeArgs),
    /// Decide a consensus order for every classification group in a result store.
    FoldOrder(FoldOrderArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Result store to create or resume.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Table of precomputed self-alignments (TSV with a header row).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub alignments: PathBuf,

    /// Files listing one domain identifier per line.
    #[arg(required = true, num_args = 1.., value_name = "ITEMS")]
    pub items: Vec<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the number of items processed between checkpoints.
    #[arg(long, value_name = "INT")]
    pub checkpoint_interval: Option<usize>,

    /// Override the per-item time budget, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Override the largest order the detector reports.
    #[arg(long, value_name = "INT")]
    pub max_order: Option<u32>,

    /// Leave failed items out of the store so a later run retries them.
    #[arg(long)]
    pub skip_failures: bool,

    /// Treat order-detection failures as failed items instead of order 1.
    #[arg(long)]
    pub strict_detection: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S census.checkpoint-interval=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Merged store to write.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Stores to concatenate, in order.
    #[arg(required = true, num_args = 1.., value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Drop residue alignments from the merged records.
    #[arg(long)]
    pub strip_alignments: bool,

    /// Drop rotation axes from the merged records.
    #[arg(long)]
    pub strip_axes: bool,
}

/// Arguments for the `fold-order` subcommand.
#[derive(Args, Debug)]
pub struct FoldOrderArgs {
    /// Result store to aggregate.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Classification table mapping domain identifiers to groups.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub groups: PathBuf,

    /// Calibration (error-transition) matrix for the error-kernel method.
    #[arg(short = 'm', long, value_name = "PATH")]
    pub matrix: Option<PathBuf>,

    /// Consensus method. Defaults to error-kernel when a matrix is given, majority otherwise.
    #[arg(long, value_enum)]
    pub method: Option<DeciderMethod>,

    /// Override the largest order for the majority and divisor methods.
    #[arg(long, value_name = "INT")]
    pub max_order: Option<u32>,

    /// Ignore records whose TM-score is below this cutoff.
    #[arg(long, value_name = "FLOAT")]
    pub min_tm_score: Option<f64>,

    /// Count orders above the maximum as the maximum instead of dropping them.
    #[arg(long)]
    pub clamp_overflow: bool,

    /// Write the per-group report to this TSV file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S aggregation.min-tm-score=0.4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
