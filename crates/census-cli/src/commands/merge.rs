use crate::cli::MergeArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use symcensus::core::models::record::StripFields;
use symcensus::engine::progress::ProgressReporter;
use symcensus::workflows::merge;
use tracing::info;

pub async fn run(args: MergeArgs) -> Result<()> {
    let strip = StripFields {
        alignment: args.strip_alignments,
        axis: args.strip_axes,
    };
    info!(inputs = args.inputs.len(), "Merging result stores...");

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let summary = tokio::task::block_in_place(|| {
        merge::run(&args.inputs, &args.output, strip, &reporter)
    })?;

    println!(
        "Merged {} store(s) into {} ({} record(s)).",
        summary.inputs,
        args.output.display(),
        summary.records
    );
    if summary.duplicates > 0 {
        println!(
            "Warning: {} record(s) repeat an identifier from an earlier store.",
            summary.duplicates
        );
    }
    Ok(())
}
