use crate::core::io::store::ResultStore;
use crate::core::models::record::StripFields;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub inputs: usize,
    pub records: usize,
    /// Records whose identifier also appears earlier in the merged store.
    pub duplicates: usize,
}

/// Concatenates the stores at `inputs`, in order, into a new store at `output`.
///
/// Inputs are never modified. `output` may be one of the inputs; it is only replaced once
/// every input has been read.
#[instrument(skip_all, name = "merge_workflow")]
pub fn run(
    inputs: &[PathBuf],
    output: &Path,
    strip: StripFields,
    reporter: &ProgressReporter,
) -> Result<MergeSummary, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Merging Stores",
    });
    let mut merged = ResultStore::merge_files(inputs)?;
    if strip != StripFields::default() {
        info!(
            alignment = strip.alignment,
            axis = strip.axis,
            "Stripping optional fields from merged records."
        );
        merged.strip(strip);
    }
    merged.save(output)?;
    reporter.report(Progress::PhaseFinish);

    let summary = MergeSummary {
        inputs: inputs.len(),
        records: merged.len(),
        duplicates: merged.len() - merged.identifiers().len(),
    };
    info!(
        inputs = summary.inputs,
        records = summary.records,
        duplicates = summary.duplicates,
        output = %output.display(),
        "Stores merged."
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::record::{ResultRecord, ScoreBundle};
    use tempfile::tempdir;

    fn save_store(path: &Path, ids: &[&str]) {
        let mut store = ResultStore::new();
        for id in ids {
            store.append(
                ResultRecord::new(*id, 2, ScoreBundle::default())
                    .with_alignment(Some("1=5,2=6".parse().unwrap())),
            );
        }
        store.save(path).unwrap();
    }

    #[test]
    fn merge_writes_concatenation_and_counts_duplicates() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        save_store(&first, &["d1", "d2"]);
        save_store(&second, &["d2", "d3"]);

        let output = dir.path().join("merged.json");
        let summary = run(
            &[first, second],
            &output,
            StripFields::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(
            summary,
            MergeSummary {
                inputs: 2,
                records: 4,
                duplicates: 1
            }
        );

        let merged = ResultStore::load(&output).unwrap();
        let ids: Vec<_> = merged.entries().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d2", "d3"]);
        assert!(merged.entries()[0].alignment().is_some());
    }

    #[test]
    fn merge_can_strip_alignments() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.json");
        save_store(&input, &["d1"]);

        let output = dir.path().join("merged.json");
        run(
            &[input.clone()],
            &output,
            StripFields {
                alignment: true,
                axis: true,
            },
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(ResultStore::load(&output).unwrap().entries()[0].alignment().is_none());
        assert!(ResultStore::load(&input).unwrap().entries()[0].alignment().is_some());
    }

    #[test]
    fn merge_fails_on_missing_input_without_writing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("merged.json");
        let result = run(
            &[dir.path().join("absent.json")],
            &output,
            StripFields::default(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Store { .. })));
        assert!(!output.exists());
    }
}
