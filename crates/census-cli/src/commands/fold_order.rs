use crate::cli::FoldOrderArgs;
use crate::config::builder::build_fold_order_config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use symcensus::engine::progress::ProgressReporter;
use symcensus::workflows::fold_order;
use tracing::info;

pub async fn run(args: FoldOrderArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = build_fold_order_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let report = tokio::task::block_in_place(|| {
        fold_order::run(
            &app_config.store,
            &app_config.groups,
            &app_config.core_config,
            app_config.report.as_deref(),
            &reporter,
        )
    })?;

    println!(
        "Decided {} group(s); {} group(s) had no usable votes.",
        report.groups.len(),
        report.empty_groups.len()
    );
    println!("order\tgroups");
    for (order, count) in &report.tally {
        println!("{order}\t{count}");
    }
    if report.unclassified > 0 {
        println!(
            "Warning: {} record(s) had no classification group.",
            report.unclassified
        );
    }
    if let Some(path) = &app_config.report {
        println!("Per-group report written to: {}", path.display());
    }
    Ok(())
}
