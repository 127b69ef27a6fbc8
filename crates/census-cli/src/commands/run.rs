use crate::cli::RunArgs;
use crate::config::builder::build_run_config;
use crate::config::defaults::DefaultsConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use symcensus::core::models::work::{WorkItem, enumerate_items, read_identifiers};
use symcensus::engine::progress::ProgressReporter;
use symcensus::engine::runner::CancelToken;
use symcensus::workflows::census::{self, CensusPlan};
use tracing::{info, warn};

pub async fn run(args: RunArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_run_config(&args)?;

    let items = load_work_items(&app_config.item_files)?;
    info!(
        items = items.len(),
        files = app_config.item_files.len(),
        "Work items loaded."
    );

    let cancel = CancelToken::new();
    let signal_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing the current checkpoint batch.");
                cancel.cancel();
            }
        })
    };

    let plan = CensusPlan {
        items,
        alignment_table: app_config.alignment_table,
        output: app_config.output,
        max_order: app_config.max_order,
        detection_tolerance: app_config.detection_tolerance,
    };
    let significance = Arc::from(
        app_config
            .significance
            .into_predicate(DefaultsConfig::default().angle_tolerance),
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting census of {} domain(s)...", plan.items.len());
    let summary = tokio::task::block_in_place(|| {
        census::run(
            &plan,
            significance,
            &app_config.core_config,
            cancel,
            &reporter,
        )
    });
    signal_task.abort();
    let summary = summary?;

    println!(
        "Processed {} item(s), {} already done, {} failed ({} left for retry). Store holds {} record(s).",
        summary.processed,
        summary.already_done,
        summary.failed,
        summary.dropped,
        summary.total_records
    );

    if summary.cancelled {
        return Err(CliError::Interrupted { path: plan.output });
    }
    Ok(())
}

/// Reads every item file in order; indices follow the concatenated listing.
fn load_work_items(paths: &[PathBuf]) -> Result<Vec<WorkItem>> {
    let mut ids = Vec::new();
    for path in paths {
        let file = File::open(path)?;
        let mut listed =
            read_identifiers(BufReader::new(file)).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
        if listed.is_empty() {
            warn!(path = %path.display(), "Item file lists no identifiers.");
        }
        ids.append(&mut listed);
    }
    Ok(enumerate_items(ids))
}
