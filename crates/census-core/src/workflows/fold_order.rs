use crate::core::consensus::OrderDecider;
use crate::core::consensus::calibration::TransitionMatrix;
use crate::core::consensus::error_kernel::ErrorKernelDecider;
use crate::core::consensus::voting::{DivisorDecider, MajorityDecider};
use crate::core::io::store::ResultStore;
use crate::core::io::tables::{ClassificationTable, TableError};
use crate::engine::aggregate::{AggregationReport, GroupAggregator};
use crate::engine::config::{DeciderKind, FoldOrderConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

pub fn build_decider(kind: &DeciderKind) -> Result<Box<dyn OrderDecider>, EngineError> {
    Ok(match kind {
        DeciderKind::ErrorKernel { calibration_path } => {
            let matrix = TransitionMatrix::load(calibration_path)?;
            info!(
                path = %calibration_path.display(),
                max_order = matrix.max_order(),
                "Loaded calibration matrix."
            );
            Box::new(ErrorKernelDecider::new(&matrix))
        }
        DeciderKind::Majority { max_order } => Box::new(MajorityDecider::new(*max_order)),
        DeciderKind::Divisor { max_order } => Box::new(DivisorDecider::new(*max_order)),
    })
}

/// Decides a consensus order for every classification group found in a result store.
///
/// When `report_path` is given, the per-group table is written there as TSV.
#[instrument(skip_all, name = "fold_order_workflow")]
pub fn run(
    store_path: &Path,
    groups_path: &Path,
    config: &FoldOrderConfig,
    report_path: Option<&Path>,
    reporter: &ProgressReporter,
) -> Result<AggregationReport, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Loading Inputs",
    });
    let decider = build_decider(&config.decider)?;
    let store = ResultStore::load(store_path)?;
    let groups = ClassificationTable::load(groups_path)?;
    info!(
        records = store.len(),
        classified = groups.len(),
        "Inputs loaded."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Deciding Group Orders",
    });
    let aggregator = GroupAggregator::new(&groups, decider.as_ref(), config.aggregation.clone());
    let report = aggregator.aggregate(store.entries());
    reporter.report(Progress::PhaseFinish);

    info!(
        groups = report.groups.len(),
        empty_groups = report.empty_groups.len(),
        unclassified = report.unclassified,
        below_threshold = report.below_threshold,
        failed = report.failed,
        overflowed = report.overflowed,
        "Aggregation complete."
    );
    for (order, count) in &report.tally {
        info!(order, groups = count, "Consensus tally.");
    }

    if let Some(path) = report_path {
        save_report(&report, decider.max_order(), path)?;
    }
    Ok(report)
}

/// Writes one TSV row per decided group: `group votes consensus n1 .. nK`.
pub fn write_report<W: Write>(
    report: &AggregationReport,
    max_order: u32,
    writer: W,
) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    let mut header = vec![
        "group".to_string(),
        "votes".to_string(),
        "consensus".to_string(),
    ];
    header.extend((1..=max_order).map(|order| format!("n{order}")));
    writer.write_record(&header)?;

    for outcome in &report.groups {
        let mut row = vec![
            outcome.group.clone(),
            outcome.histogram.total().to_string(),
            outcome.consensus.to_string(),
        ];
        row.extend((1..=max_order).map(|order| outcome.histogram.count(order).to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_report(
    report: &AggregationReport,
    max_order: u32,
    path: &Path,
) -> Result<(), EngineError> {
    let csv_err = |source: csv::Error| TableError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| csv_err(e.into()))?;
    write_report(report, max_order, std::io::BufWriter::new(file)).map_err(csv_err)?;
    info!(path = %path.display(), groups = report.groups.len(), "Fold order report written.");
    Ok(())
}
