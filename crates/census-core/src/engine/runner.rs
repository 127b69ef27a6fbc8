use super::collaborators::{AlignmentError, OrderDetectionError, OrderDetector, SelfAligner};
use super::config::{CensusConfig, FailurePolicy};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::io::store::ResultStore;
use crate::core::models::alignment::RawAlignment;
use crate::core::models::record::ResultRecord;
use crate::core::models::work::WorkItem;
use crate::core::significance::SignificancePredicate;
use crate::core::utils::geometry::axis_from_alignment;
use chrono::Utc;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Default per-item budget.
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(300);

/// A shared flag requesting that a running census stop between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a single item could not be completed. Never fatal to the run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ItemFailure {
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    #[error(transparent)]
    OrderDetection(#[from] OrderDetectionError),
    #[error("Timed out after {seconds:.1} s")]
    Timeout { seconds: f64 },
    #[error("Job aborted: {0}")]
    Aborted(String),
    #[error("Aligner reported a non-finite {0}")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CensusSummary {
    /// Items completed successfully in this run.
    pub processed: usize,
    /// Items skipped because the store already held a record for them.
    pub already_done: usize,
    /// Items that failed in this run, recorded or not.
    pub failed: usize,
    /// Failed items left out of the store under [`FailurePolicy::Skip`].
    pub dropped: usize,
    pub cancelled: bool,
    /// Records in the store after the final checkpoint.
    pub total_records: usize,
}

enum JobOutcome {
    Completed(ResultRecord),
    Failed {
        id: String,
        failure: ItemFailure,
        seconds: f64,
    },
}

/// The resumable census runner.
///
/// Each item is aligned, its order detected and its significance judged; the resulting
/// record is appended to the store at the output path. Items already in the store are
/// skipped, so an interrupted run is continued by running it again.
pub struct Census {
    aligner: Arc<dyn SelfAligner>,
    detector: Arc<dyn OrderDetector>,
    significance: Arc<dyn SignificancePredicate>,
    config: CensusConfig,
    cancel: CancelToken,
}

impl Census {
    pub fn new(
        aligner: Arc<dyn SelfAligner>,
        detector: Arc<dyn OrderDetector>,
        significance: Arc<dyn SignificancePredicate>,
        config: CensusConfig,
    ) -> Self {
        Self {
            aligner,
            detector,
            significance,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(
        &self,
        items: &[WorkItem],
        output: &Path,
        reporter: &ProgressReporter,
    ) -> Result<CensusSummary, EngineError> {
        let mut store = ResultStore::load_or_default(output)?;
        store.mark_started(Utc::now());

        let mut summary = CensusSummary::default();
        let pending = {
            let done = store.identifiers();
            let mut seen = HashSet::new();
            let mut pending = Vec::new();
            for item in items {
                if done.contains(item.id()) {
                    summary.already_done += 1;
                } else if seen.insert(item.id()) {
                    pending.push(item);
                } else {
                    debug!(id = item.id(), "Work item listed twice; running it once.");
                }
            }
            pending
        };
        info!(
            total = items.len(),
            pending = pending.len(),
            already_done = summary.already_done,
            "Starting census."
        );
        if summary.already_done > 0 {
            reporter.report(Progress::Message(format!(
                "Resuming: {} item(s) already in the store",
                summary.already_done
            )));
        }

        reporter.report(Progress::JobsStart {
            pending: pending.len() as u64,
        });
        for batch in pending.chunks(self.config.checkpoint_interval) {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            #[cfg(not(feature = "parallel"))]
            let outcomes: Vec<Option<JobOutcome>> =
                batch.iter().map(|item| self.process(item)).collect();
            #[cfg(feature = "parallel")]
            let outcomes: Vec<Option<JobOutcome>> =
                batch.par_iter().map(|item| self.process(item)).collect();

            for outcome in outcomes {
                match outcome {
                    Some(outcome) => self.absorb(outcome, &mut store, &mut summary, reporter),
                    None => summary.cancelled = true,
                }
            }

            store.save(output)?;
            reporter.report(Progress::Checkpoint {
                records: store.len(),
            });
            debug!(records = store.len(), "Checkpoint written.");
        }
        reporter.report(Progress::JobsFinish);

        if self.cancel.is_cancelled() {
            summary.cancelled = true;
        }
        store.save(output)?;
        summary.total_records = store.len();

        if summary.cancelled {
            warn!(
                processed = summary.processed,
                records = summary.total_records,
                "Census cancelled; completed work has been saved."
            );
        } else {
            info!(
                processed = summary.processed,
                failed = summary.failed,
                records = summary.total_records,
                "Census complete."
            );
        }
        Ok(summary)
    }

    fn absorb(
        &self,
        outcome: JobOutcome,
        store: &mut ResultStore,
        summary: &mut CensusSummary,
        reporter: &ProgressReporter,
    ) {
        match outcome {
            JobOutcome::Completed(record) => {
                summary.processed += 1;
                reporter.report(Progress::JobFinished {
                    id: record.id().to_string(),
                    succeeded: true,
                });
                store.append(record);
            }
            JobOutcome::Failed {
                id,
                failure,
                seconds,
            } => {
                summary.failed += 1;
                warn!(id = %id, error = %failure, "Census item failed.");
                reporter.report(Progress::JobFinished {
                    id: id.clone(),
                    succeeded: false,
                });
                match self.config.failure_policy {
                    FailurePolicy::Record => {
                        let placeholder =
                            ResultRecord::failed(id, failure.to_string()).with_seconds(seconds);
                        store.append(placeholder);
                    }
                    FailurePolicy::Skip => summary.dropped += 1,
                }
            }
        }
    }

    /// Runs one item to completion or failure. `None` means the item was not started
    /// because the run was cancelled.
    fn process(&self, item: &WorkItem) -> Option<JobOutcome> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let started = Instant::now();
        let result = self.align_and_detect(item);
        let seconds = started.elapsed().as_secs_f64();

        let failed = |failure| JobOutcome::Failed {
            id: item.id().to_string(),
            failure,
            seconds,
        };
        Some(match result {
            Ok((raw, order)) => {
                // Aligners that only expose coordinates get their axis recovered here.
                let axis = raw.axis.or_else(|| {
                    raw.mapping
                        .as_ref()
                        .and_then(|mapping| axis_from_alignment(&raw.ca_atoms, mapping))
                });
                let record = ResultRecord::new(item.id(), order, raw.scores)
                    .with_alignment(raw.mapping)
                    .with_axis(axis)
                    .with_seconds(seconds);
                if let Some(field) = record.non_finite_field() {
                    return Some(failed(ItemFailure::NonFinite(field)));
                }
                let significant = self.significance.is_significant(&record);
                JobOutcome::Completed(record.with_significance(significant))
            }
            Err(failure) => failed(failure),
        })
    }

    // The collaborators run on a dedicated thread so a hung or panicking aligner costs one
    // item. A timed-out thread is detached and its eventual result discarded.
    fn align_and_detect(&self, item: &WorkItem) -> Result<(RawAlignment, u32), ItemFailure> {
        let (sender, receiver) = mpsc::channel();
        let aligner = Arc::clone(&self.aligner);
        let detector = Arc::clone(&self.detector);
        let tolerate = self.config.tolerate_order_failure;
        let job_id = item.id().to_string();

        // Identifiers are arbitrary text, so the thread is named by position.
        thread::Builder::new()
            .name(format!("census-item-{}", item.index()))
            .spawn(move || {
                let result = run_job(aligner.as_ref(), detector.as_ref(), &job_id, tolerate);
                let _ = sender.send(result);
            })
            .map_err(|e| ItemFailure::Aborted(format!("could not start job thread: {e}")))?;

        match receiver.recv_timeout(self.config.item_timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ItemFailure::Timeout {
                seconds: self.config.item_timeout.as_secs_f64(),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(ItemFailure::Aborted(
                "collaborator panicked".to_string(),
            )),
        }
    }
}

fn run_job(
    aligner: &dyn SelfAligner,
    detector: &dyn OrderDetector,
    id: &str,
    tolerate_order_failure: bool,
) -> Result<(RawAlignment, u32), ItemFailure> {
    let raw = aligner.align(id)?;
    let order = match detector.detect(&raw) {
        Ok(order) => order,
        Err(e) if tolerate_order_failure => {
            debug!(id, error = %e, "Order detection failed; assuming no symmetry.");
            1
        }
        Err(e) => return Err(e.into()),
    };
    Ok((raw, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::record::{RotationAxis, ScoreBundle};
    use crate::core::models::work::enumerate_items;
    use crate::core::significance::{TmScoreThreshold, UltraLiberal};
    use crate::engine::config::CensusConfigBuilder;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Aligns every identifier, deriving a deterministic order from its last character
    /// (`n` yields a NaN angle).
    /// Identifiers in `fail` fail; `hook` runs before each alignment.
    struct ScriptedAligner {
        fail: HashSet<String>,
        slow: HashSet<String>,
        panics: HashSet<String>,
        hook: Option<Box<dyn Fn(&str) + Send + Sync>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedAligner {
        fn new() -> Self {
            Self {
                fail: HashSet::new(),
                slow: HashSet::new(),
                panics: HashSet::new(),
                hook: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, id: &str) -> Self {
            self.fail.insert(id.to_string());
            self
        }

        fn slow(mut self, id: &str) -> Self {
            self.slow.insert(id.to_string());
            self
        }

        fn panicking(mut self, id: &str) -> Self {
            self.panics.insert(id.to_string());
            self
        }

        fn with_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
            self.hook = Some(Box::new(hook));
            self
        }

        fn calls(&self) -> Vec<String> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }
    }

    impl SelfAligner for ScriptedAligner {
        fn align(&self, id: &str) -> Result<RawAlignment, AlignmentError> {
            self.calls.lock().unwrap().push(id.to_string());
            if let Some(hook) = &self.hook {
                hook(id);
            }
            if self.panics.contains(id) {
                panic!("aligner crashed on {id}");
            }
            if self.slow.contains(id) {
                thread::sleep(Duration::from_millis(500));
            }
            if self.fail.contains(id) {
                return Err(AlignmentError::StructureUnavailable(id.to_string()));
            }
            let angle = match id.chars().last() {
                Some('2') => 180.0,
                Some('3') => 120.0,
                Some('n') => f64::NAN,
                _ => 0.0,
            };
            Ok(RawAlignment::new(ScoreBundle {
                tm_score: Some(0.6),
                ..Default::default()
            })
            .with_axis(Some(RotationAxis::new([0.0, 0.0, 1.0], angle))))
        }
    }

    struct AxisDetector;

    impl OrderDetector for AxisDetector {
        fn detect(&self, alignment: &RawAlignment) -> Result<u32, OrderDetectionError> {
            match alignment.axis.map(|a| a.angle) {
                Some(a) if a == 180.0 => Ok(2),
                Some(a) if a == 120.0 => Ok(3),
                Some(_) => Ok(1),
                None => Err(OrderDetectionError("no axis".to_string())),
            }
        }
    }

    struct FailingDetector;

    impl OrderDetector for FailingDetector {
        fn detect(&self, _alignment: &RawAlignment) -> Result<u32, OrderDetectionError> {
            Err(OrderDetectionError("ambiguous".to_string()))
        }
    }

    fn config(interval: usize, policy: FailurePolicy) -> CensusConfig {
        CensusConfigBuilder::new()
            .checkpoint_interval(interval)
            .item_timeout(Duration::from_secs(5))
            .failure_policy(policy)
            .tolerate_order_failure(true)
            .build()
            .unwrap()
    }

    fn census(aligner: Arc<ScriptedAligner>, config: CensusConfig) -> Census {
        Census::new(
            aligner,
            Arc::new(AxisDetector),
            Arc::new(UltraLiberal),
            config,
        )
    }

    fn ids(store: &ResultStore) -> Vec<&str> {
        store.entries().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn run_appends_records_in_input_order() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["d1a3", "d1b2", "d1c1", "d1d3"]);
        let runner = census(
            Arc::new(ScriptedAligner::new()),
            config(3, FailurePolicy::Record),
        );

        let summary = runner.run(&items, &output, &ProgressReporter::new()).unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.total_records, 4);
        assert!(!summary.cancelled);

        let store = ResultStore::load(&output).unwrap();
        assert_eq!(ids(&store), vec!["d1a3", "d1b2", "d1c1", "d1d3"]);
        let orders: Vec<_> = store.entries().iter().map(|r| r.order()).collect();
        assert_eq!(orders, vec![Some(3), Some(2), Some(1), Some(3)]);
        assert!(store.entries().iter().all(|r| r.is_significant()));
        assert!(store.metadata().started.is_some());
    }

    #[test]
    fn rerun_on_complete_store_is_idempotent() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "b3", "c1"]);

        census(Arc::new(ScriptedAligner::new()), config(2, FailurePolicy::Record))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        let first = ResultStore::load(&output).unwrap();

        let aligner = Arc::new(ScriptedAligner::new());
        let summary = census(aligner.clone(), config(2, FailurePolicy::Record))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.already_done, 3);
        assert!(aligner.calls().is_empty());
        assert_eq!(ResultStore::load(&output).unwrap(), first);
    }

    #[test]
    fn resumed_run_matches_uninterrupted_run() {
        let dir = tempdir().unwrap();
        let items = enumerate_items(["a1", "b2", "c3", "d2", "e1"]);

        let reference = dir.path().join("reference.json");
        census(Arc::new(ScriptedAligner::new()), config(1, FailurePolicy::Record))
            .run(&items, &reference, &ProgressReporter::new())
            .unwrap();

        let resumed = dir.path().join("resumed.json");
        let token = CancelToken::new();
        let trigger = token.clone();
        let interrupted = ScriptedAligner::new().with_hook(move |id| {
            if id == "c3" {
                trigger.cancel();
            }
        });
        let summary = census(Arc::new(interrupted), config(1, FailurePolicy::Record))
            .with_cancellation(token)
            .run(&items, &resumed, &ProgressReporter::new())
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(ids(&ResultStore::load(&resumed).unwrap()), vec!["a1", "b2", "c3"]);

        let aligner = Arc::new(ScriptedAligner::new());
        let summary = census(aligner.clone(), config(1, FailurePolicy::Record))
            .run(&items, &resumed, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.already_done, 3);
        assert_eq!(aligner.calls(), vec!["d2", "e1"]);
        assert_eq!(
            ResultStore::load(&resumed).unwrap(),
            ResultStore::load(&reference).unwrap()
        );
    }

    #[test]
    fn record_policy_stores_failure_placeholders() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "b3", "c1"]);
        let aligner = Arc::new(ScriptedAligner::new().failing("b3"));

        let summary = census(aligner, config(10, FailurePolicy::Record))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.dropped, 0);

        let store = ResultStore::load(&output).unwrap();
        assert_eq!(ids(&store), vec!["a2", "b3", "c1"]);
        assert!(store.entries()[1].is_failure());
        assert_eq!(store.entries()[1].order(), None);

        // A failure-marked item counts as done on the next run.
        let retry = Arc::new(ScriptedAligner::new());
        census(retry.clone(), config(10, FailurePolicy::Record))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        assert!(retry.calls().is_empty());
    }

    #[test]
    fn skip_policy_leaves_failed_items_for_retry() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "b3", "c1"]);

        let summary = census(
            Arc::new(ScriptedAligner::new().failing("b3")),
            config(10, FailurePolicy::Skip),
        )
        .run(&items, &output, &ProgressReporter::new())
        .unwrap();
        assert_eq!(summary.dropped, 1);
        assert_eq!(ids(&ResultStore::load(&output).unwrap()), vec!["a2", "c1"]);

        let retry = Arc::new(ScriptedAligner::new());
        census(retry.clone(), config(10, FailurePolicy::Skip))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        assert_eq!(retry.calls(), vec!["b3"]);
        assert_eq!(
            ids(&ResultStore::load(&output).unwrap()),
            vec!["a2", "c1", "b3"]
        );
    }

    #[test]
    fn slow_item_times_out_without_stalling_the_run() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "b3"]);
        let mut config = config(10, FailurePolicy::Record);
        config.item_timeout = Duration::from_millis(50);

        let summary = census(Arc::new(ScriptedAligner::new().slow("a2")), config)
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.processed, 1);

        let store = ResultStore::load(&output).unwrap();
        assert!(store.entries()[0].failure().unwrap().contains("Timed out"));
        assert_eq!(store.entries()[1].order(), Some(3));
    }

    #[test]
    fn panicking_aligner_fails_only_its_item() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "b3", "c1"]);

        let summary = census(
            Arc::new(ScriptedAligner::new().panicking("b3")),
            config(10, FailurePolicy::Record),
        )
        .run(&items, &output, &ProgressReporter::new())
        .unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);

        let store = ResultStore::load(&output).unwrap();
        assert!(store.entries()[1].failure().unwrap().contains("panicked"));
    }

    #[test]
    fn order_detection_failure_is_tolerated_or_fatal_per_config() {
        let dir = tempdir().unwrap();
        let items = enumerate_items(["a2"]);

        let tolerant = dir.path().join("tolerant.json");
        Census::new(
            Arc::new(ScriptedAligner::new()),
            Arc::new(FailingDetector),
            Arc::new(UltraLiberal),
            config(1, FailurePolicy::Record),
        )
        .run(&items, &tolerant, &ProgressReporter::new())
        .unwrap();
        assert_eq!(
            ResultStore::load(&tolerant).unwrap().entries()[0].order(),
            Some(1)
        );

        let strict = dir.path().join("strict.json");
        let mut strict_config = config(1, FailurePolicy::Record);
        strict_config.tolerate_order_failure = false;
        let summary = Census::new(
            Arc::new(ScriptedAligner::new()),
            Arc::new(FailingDetector),
            Arc::new(UltraLiberal),
            strict_config,
        )
        .run(&items, &strict, &ProgressReporter::new())
        .unwrap();
        assert_eq!(summary.failed, 1);
        assert!(ResultStore::load(&strict).unwrap().entries()[0].is_failure());
    }

    #[test]
    fn significance_predicate_is_applied_to_each_record() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        Census::new(
            Arc::new(ScriptedAligner::new()),
            Arc::new(AxisDetector),
            Arc::new(TmScoreThreshold { min: 0.7 }),
            config(5, FailurePolicy::Record),
        )
        .run(&enumerate_items(["a3"]), &output, &ProgressReporter::new())
        .unwrap();

        let store = ResultStore::load(&output).unwrap();
        let record = &store.entries()[0];
        assert_eq!(record.order(), Some(3));
        assert!(!record.is_significant());
        assert_eq!(record.effective_order(), Some(1));
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("missing/census.json");
        let result = census(
            Arc::new(ScriptedAligner::new()),
            config(1, FailurePolicy::Record),
        )
        .run(&enumerate_items(["a1"]), &output, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Store { .. })));
    }

    #[test]
    fn corrupt_existing_store_is_fatal() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        std::fs::write(&output, "{ not json").unwrap();
        let aligner = Arc::new(ScriptedAligner::new());
        let result = census(aligner.clone(), config(1, FailurePolicy::Record)).run(
            &enumerate_items(["a1"]),
            &output,
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Store { .. })));
        assert!(aligner.calls().is_empty());
    }

    #[test]
    fn progress_reports_jobs_and_checkpoints() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        census(
            Arc::new(ScriptedAligner::new().failing("b1")),
            config(2, FailurePolicy::Record),
        )
        .run(&enumerate_items(["a1", "b1", "c1"]), &output, &reporter)
        .unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert_eq!(events[0], Progress::JobsStart { pending: 3 });
        let finished: HashMap<String, bool> = events
            .iter()
            .filter_map(|e| match e {
                Progress::JobFinished { id, succeeded } => Some((id.clone(), *succeeded)),
                _ => None,
            })
            .collect();
        assert_eq!(finished.len(), 3);
        assert!(!finished["b1"]);
        let checkpoints = events
            .iter()
            .filter(|e| matches!(e, Progress::Checkpoint { .. }))
            .count();
        assert_eq!(checkpoints, 2);
        assert_eq!(events.last(), Some(&Progress::JobsFinish));
        assert!(!events.iter().any(|e| matches!(e, Progress::Message(_))));
    }

    #[test]
    fn resumed_run_announces_stored_items() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a1", "b2"]);
        census(Arc::new(ScriptedAligner::new()), config(2, FailurePolicy::Record))
            .run(&items[..1], &output, &ProgressReporter::new())
            .unwrap();

        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        census(Arc::new(ScriptedAligner::new()), config(2, FailurePolicy::Record))
            .run(&items, &output, &reporter)
            .unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert_eq!(
            events[0],
            Progress::Message("Resuming: 1 item(s) already in the store".to_string())
        );
        assert_eq!(events[1], Progress::JobsStart { pending: 1 });
    }

    #[test]
    fn non_finite_alignment_fails_its_item_and_store_stays_loadable() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let items = enumerate_items(["a2", "bn", "c3"]);

        let summary = census(
            Arc::new(ScriptedAligner::new()),
            config(10, FailurePolicy::Record),
        )
        .run(&items, &output, &ProgressReporter::new())
        .unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);

        let store = ResultStore::load(&output).unwrap();
        assert_eq!(ids(&store), vec!["a2", "bn", "c3"]);
        assert_eq!(store.entries()[1].failure(), Some("Aligner reported a non-finite axis"));

        let rerun = Arc::new(ScriptedAligner::new());
        let summary = census(rerun.clone(), config(10, FailurePolicy::Record))
            .run(&items, &output, &ProgressReporter::new())
            .unwrap();
        assert_eq!(summary.already_done, 3);
        assert!(rerun.calls().is_empty());
    }

    #[test]
    fn identifiers_with_control_characters_are_processed() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let summary = census(
            Arc::new(ScriptedAligner::new()),
            config(2, FailurePolicy::Record),
        )
        .run(&enumerate_items(["d1\0x3", "d2\n2"]), &output, &ProgressReporter::new())
        .unwrap();
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 0);

        let store = ResultStore::load(&output).unwrap();
        assert_eq!(ids(&store), vec!["d1\0x3", "d2\n2"]);
        assert_eq!(store.entries()[0].order(), Some(3));
    }

    #[test]
    fn duplicate_work_items_run_once() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("census.json");
        let aligner = Arc::new(ScriptedAligner::new());
        census(aligner.clone(), config(4, FailurePolicy::Record))
            .run(
                &enumerate_items(["a1", "a1", "b2"]),
                &output,
                &ProgressReporter::new(),
            )
            .unwrap();
        assert_eq!(aligner.calls(), vec!["a1", "b2"]);
    }
}
