use crate::core::io::tables::AlignmentTable;
use crate::core::models::work::WorkItem;
use crate::core::significance::SignificancePredicate;
use crate::engine::collaborators::AngleOrderDetector;
use crate::engine::config::CensusConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::{CancelToken, Census, CensusSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything a census run reads and writes.
#[derive(Debug, Clone)]
pub struct CensusPlan {
    pub items: Vec<WorkItem>,
    /// Precomputed self-alignments, one row per domain.
    pub alignment_table: PathBuf,
    /// Result store; created on the first run, resumed afterwards.
    pub output: PathBuf,
    /// Largest order the angle detector reports.
    pub max_order: u32,
    /// Degrees between the axis angle and a group rotation accepted by the detector.
    pub detection_tolerance: f64,
}

#[instrument(skip_all, name = "census_workflow")]
pub fn run(
    plan: &CensusPlan,
    significance: Arc<dyn SignificancePredicate>,
    config: &CensusConfig,
    cancel: CancelToken,
    reporter: &ProgressReporter,
) -> Result<CensusSummary, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Loading Alignments",
    });
    let table = AlignmentTable::load(&plan.alignment_table)?;
    info!(
        alignments = table.len(),
        items = plan.items.len(),
        "Alignment table loaded."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Census" });
    let census = Census::new(
        Arc::new(table),
        Arc::new(AngleOrderDetector::new(
            plan.max_order,
            plan.detection_tolerance,
        )),
        significance,
        config.clone(),
    )
    .with_cancellation(cancel);
    let summary = census.run(&plan.items, &plan.output, reporter)?;
    reporter.report(Progress::PhaseFinish);

    Ok(summary)
}
