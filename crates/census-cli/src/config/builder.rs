use super::defaults::DefaultsConfig;
use super::file::{FileConfig, SignificanceSpec};
use super::models::{DeciderMethod, FoldOrderAppConfig, RunAppConfig};
use crate::cli::{FoldOrderArgs, RunArgs};
use crate::error::{CliError, Result};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use symcensus::core::consensus::histogram::OverflowPolicy;
use symcensus::engine::config as core_config;

fn load_file_config(path: Option<&Path>, set_values: &[String]) -> Result<FileConfig> {
    let file_config = match path {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, set_values)
}

pub fn build_run_config(args: &RunArgs) -> Result<RunAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.config.as_deref(), &args.set_values)?;
    let census_file = file_config.census.take().unwrap_or_default();

    let checkpoint_interval = args
        .checkpoint_interval
        .or(census_file.checkpoint_interval)
        .unwrap_or(defaults.checkpoint_interval);
    let timeout_seconds = args
        .timeout
        .or(census_file.item_timeout_seconds)
        .unwrap_or(defaults.item_timeout_seconds);
    if !timeout_seconds.is_finite() || timeout_seconds <= 0.0 {
        return Err(CliError::Config(format!(
            "The item timeout must be a positive number of seconds, got {}",
            timeout_seconds
        )));
    }
    let item_timeout = Duration::try_from_secs_f64(timeout_seconds).map_err(|e| {
        CliError::Config(format!(
            "The item timeout of {} seconds is out of range: {}",
            timeout_seconds, e
        ))
    })?;
    let failure_policy = if args.skip_failures {
        core_config::FailurePolicy::Skip
    } else {
        census_file
            .failure_policy
            .unwrap_or(defaults.failure_policy)
    };
    let tolerate_order_failure = if args.strict_detection {
        false
    } else {
        census_file
            .tolerate_order_failure
            .unwrap_or(defaults.tolerate_order_failure)
    };

    let core_config = core_config::CensusConfigBuilder::new()
        .checkpoint_interval(checkpoint_interval)
        .item_timeout(item_timeout)
        .failure_policy(failure_policy)
        .tolerate_order_failure(tolerate_order_failure)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(RunAppConfig {
        item_files: args.items.clone(),
        alignment_table: args.alignments.clone(),
        output: args.output.clone(),
        max_order: args
            .max_order
            .or(census_file.max_order)
            .unwrap_or(defaults.max_order),
        detection_tolerance: census_file
            .detection_tolerance
            .unwrap_or(defaults.detection_tolerance),
        significance: file_config
            .significance
            .unwrap_or(SignificanceSpec::SymmetricRefined {
                angle_tolerance: Some(defaults.angle_tolerance),
            }),
        core_config,
    })
}

pub fn build_fold_order_config(args: &FoldOrderArgs) -> Result<FoldOrderAppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = load_file_config(args.config.as_deref(), &args.set_values)?;
    let consensus_file = file_config.consensus.take().unwrap_or_default();
    let aggregation_file = file_config.aggregation.take().unwrap_or_default();

    let calibration = args.matrix.clone().or(consensus_file.calibration);
    let method = args.method.or(consensus_file.method).unwrap_or(
        if calibration.is_some() {
            defaults.method_with_matrix
        } else {
            defaults.method_without_matrix
        },
    );
    let max_order = args
        .max_order
        .or(consensus_file.max_order)
        .unwrap_or(defaults.max_order);

    let decider = match method {
        DeciderMethod::ErrorKernel => core_config::DeciderKind::ErrorKernel {
            calibration_path: calibration.ok_or_else(|| {
                CliError::Config(
                    "The error-kernel method requires a calibration matrix (-m or `consensus.calibration`)."
                        .to_string(),
                )
            })?,
        },
        DeciderMethod::Majority => core_config::DeciderKind::Majority { max_order },
        DeciderMethod::Divisor => core_config::DeciderKind::Divisor { max_order },
    };

    let overflow = if args.clamp_overflow {
        OverflowPolicy::Clamp
    } else {
        aggregation_file.overflow.unwrap_or(defaults.overflow)
    };

    let core_config = core_config::FoldOrderConfigBuilder::new()
        .decider(decider)
        .min_tm_score(args.min_tm_score.or(aggregation_file.min_tm_score))
        .overflow(overflow)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(FoldOrderAppConfig {
        store: args.input.clone(),
        groups: args.groups.clone(),
        report: args.output.clone(),
        core_config,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        match key {
            "census.checkpoint-interval" => {
                config
                    .census
                    .get_or_insert_with(Default::default)
                    .checkpoint_interval = Some(parse_value(key, value)?);
            }
            "census.item-timeout-seconds" => {
                config
                    .census
                    .get_or_insert_with(Default::default)
                    .item_timeout_seconds = Some(parse_value(key, value)?);
            }
            "census.max-order" => {
                config
                    .census
                    .get_or_insert_with(Default::default)
                    .max_order = Some(parse_value(key, value)?);
            }
            "census.detection-tolerance" => {
                config
                    .census
                    .get_or_insert_with(Default::default)
                    .detection_tolerance = Some(parse_value(key, value)?);
            }
            "consensus.max-order" => {
                config
                    .consensus
                    .get_or_insert_with(Default::default)
                    .max_order = Some(parse_value(key, value)?);
            }
            "aggregation.min-tm-score" => {
                config
                    .aggregation
                    .get_or_insert_with(Default::default)
                    .min_tm_score = Some(parse_value(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_run_args() -> RunArgs {
        RunArgs {
            output: PathBuf::from("census.json"),
            alignments: PathBuf::from("alignments.tsv"),
            items: vec![PathBuf::from("items.txt")],
            config: None,
            checkpoint_interval: None,
            timeout: None,
            max_order: None,
            skip_failures: false,
            strict_detection: false,
            set_values: vec![],
        }
    }

    fn base_fold_args() -> FoldOrderArgs {
        FoldOrderArgs {
            input: PathBuf::from("census.json"),
            groups: PathBuf::from("groups.tsv"),
            matrix: None,
            method: None,
            max_order: None,
            min_tm_score: None,
            clamp_overflow: false,
            output: None,
            config: None,
            set_values: vec![],
        }
    }

    #[test]
    fn run_config_uses_defaults_without_file() {
        let app = build_run_config(&base_run_args()).unwrap();
        let defaults = DefaultsConfig::default();

        assert_eq!(
            app.core_config.checkpoint_interval,
            defaults.checkpoint_interval
        );
        assert_eq!(
            app.core_config.item_timeout,
            Duration::from_secs_f64(defaults.item_timeout_seconds)
        );
        assert_eq!(app.core_config.failure_policy, defaults.failure_policy);
        assert!(app.core_config.tolerate_order_failure);
        assert_eq!(app.max_order, defaults.max_order);
        assert!(matches!(
            app.significance,
            SignificanceSpec::SymmetricRefined { .. }
        ));
    }

    #[test]
    fn run_config_prefers_cli_over_file_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("census.toml");
        fs::write(
            &path,
            r#"
            [census]
            checkpoint-interval = 10
            item-timeout-seconds = 30.0
            max-order = 6
            failure-policy = "record"

            [significance]
            type = "z-score"
            min = 8.0
            "#,
        )
        .unwrap();

        let mut args = base_run_args();
        args.config = Some(path);
        args.checkpoint_interval = Some(3);
        args.skip_failures = true;
        args.strict_detection = true;

        let app = build_run_config(&args).unwrap();
        assert_eq!(app.core_config.checkpoint_interval, 3);
        assert_eq!(app.core_config.item_timeout, Duration::from_secs(30));
        assert_eq!(
            app.core_config.failure_policy,
            core_config::FailurePolicy::Skip
        );
        assert!(!app.core_config.tolerate_order_failure);
        assert_eq!(app.max_order, 6);
        assert_eq!(app.significance, SignificanceSpec::ZScore { min: 8.0 });
    }

    #[test]
    fn run_config_rejects_bad_timeout_and_interval() {
        let mut args = base_run_args();
        args.timeout = Some(-1.0);
        assert!(matches!(build_run_config(&args), Err(CliError::Config(_))));

        let mut args = base_run_args();
        args.checkpoint_interval = Some(0);
        assert!(matches!(build_run_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn run_config_rejects_timeout_too_large_for_a_duration() {
        let mut args = base_run_args();
        args.timeout = Some(1e30);
        match build_run_config(&args) {
            Err(CliError::Config(message)) => assert!(message.contains("out of range")),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }

        let mut args = base_run_args();
        args.timeout = Some(86_400.0);
        let app = build_run_config(&args).unwrap();
        assert_eq!(app.core_config.item_timeout, Duration::from_secs(86_400));
    }

    #[test]
    fn set_values_override_file_values() {
        let mut args = base_run_args();
        args.set_values = vec![
            "census.checkpoint-interval=7".to_string(),
            "census.detection-tolerance=2.5".to_string(),
        ];
        let app = build_run_config(&args).unwrap();
        assert_eq!(app.core_config.checkpoint_interval, 7);
        assert_eq!(app.detection_tolerance, 2.5);
    }

    #[test]
    fn set_values_reject_unknown_keys_and_bad_values() {
        let mut args = base_run_args();
        args.set_values = vec!["census.colour=blue".to_string()];
        assert!(matches!(build_run_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["census.max-order=many".to_string()];
        assert!(matches!(build_run_config(&args), Err(CliError::Config(_))));

        args.set_values = vec!["census.max-order".to_string()];
        assert!(matches!(build_run_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn fold_order_defaults_to_majority_without_matrix() {
        let app = build_fold_order_config(&base_fold_args()).unwrap();
        assert_eq!(
            app.core_config.decider,
            core_config::DeciderKind::Majority { max_order: 8 }
        );
        assert_eq!(app.core_config.aggregation.overflow, OverflowPolicy::Exclude);
        assert_eq!(app.core_config.aggregation.min_tm_score, None);
    }

    #[test]
    fn fold_order_defaults_to_error_kernel_with_matrix() {
        let mut args = base_fold_args();
        args.matrix = Some(PathBuf::from("calibration.tsv"));
        args.clamp_overflow = true;
        let app = build_fold_order_config(&args).unwrap();
        assert_eq!(
            app.core_config.decider,
            core_config::DeciderKind::ErrorKernel {
                calibration_path: PathBuf::from("calibration.tsv")
            }
        );
        assert_eq!(app.core_config.aggregation.overflow, OverflowPolicy::Clamp);
    }

    #[test]
    fn fold_order_error_kernel_requires_matrix() {
        let mut args = base_fold_args();
        args.method = Some(DeciderMethod::ErrorKernel);
        assert!(matches!(
            build_fold_order_config(&args),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn fold_order_reads_consensus_and_aggregation_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("census.toml");
        fs::write(
            &path,
            r#"
            [consensus]
            method = "divisor"
            max-order = 12

            [aggregation]
            min-tm-score = 0.45
            overflow = "clamp"
            "#,
        )
        .unwrap();
        let mut args = base_fold_args();
        args.config = Some(path);
        args.set_values = vec!["aggregation.min-tm-score=0.5".to_string()];

        let app = build_fold_order_config(&args).unwrap();
        assert_eq!(
            app.core_config.decider,
            core_config::DeciderKind::Divisor { max_order: 12 }
        );
        assert_eq!(app.core_config.aggregation.min_tm_score, Some(0.5));
        assert_eq!(app.core_config.aggregation.overflow, OverflowPolicy::Clamp);
    }
}
