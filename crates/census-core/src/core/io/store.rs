use crate::core::models::record::{ResultRecord, StripFields};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Store '{path}' declares {declared} records but contains {actual}")]
    SizeMismatch {
        path: String,
        declared: usize,
        actual: usize,
    },
    #[error("Record '{id}' in '{path}' has a non-finite {field}; JSON cannot represent it")]
    NonFinite {
        path: String,
        id: String,
        field: &'static str,
    },
}

/// Run-level bookkeeping. Never part of store equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StoreMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_seconds_per_job: Option<f64>,
}

#[derive(Serialize)]
struct PersistedStoreRef<'a> {
    size: usize,
    metadata: &'a StoreMetadata,
    records: &'a [ResultRecord],
}

#[derive(Deserialize)]
struct PersistedStore {
    size: usize,
    #[serde(default)]
    metadata: StoreMetadata,
    records: Vec<ResultRecord>,
}

/// An insertion-ordered collection of census results.
///
/// Identifiers are unique within one run, but merging stores concatenates them as they are;
/// duplicates across merged stores are reported, never removed.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    records: Vec<ResultRecord>,
    metadata: StoreMetadata,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// Appends every record of `other`, keeping both orders.
    pub fn merge(&mut self, other: ResultStore) {
        let existing: HashSet<&str> = self.records.iter().map(|r| r.id()).collect();
        let duplicates: Vec<String> = other
            .records
            .iter()
            .filter(|r| existing.contains(r.id()))
            .map(|r| r.id().to_string())
            .collect();
        for id in &duplicates {
            warn!(id = %id, "Duplicate identifier while merging result stores; keeping both.");
        }

        self.metadata.started = match (self.metadata.started, other.metadata.started) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.records.extend(other.records);
        self.refresh_mean_seconds();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entries(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn identifiers(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.id()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    /// Records the run start time unless one is already present.
    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.metadata.started.get_or_insert(at);
    }

    /// Drops optional payloads from every record to shrink the serialized store.
    pub fn strip(&mut self, fields: StripFields) {
        self.records = std::mem::take(&mut self.records)
            .into_iter()
            .map(|r| r.stripped(fields))
            .collect();
    }

    fn refresh_mean_seconds(&mut self) {
        let timings: Vec<f64> = self.records.iter().filter_map(|r| r.seconds()).collect();
        if !timings.is_empty() {
            self.metadata.mean_seconds_per_job =
                Some(timings.iter().sum::<f64>() / timings.len() as f64);
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let path_str = path.to_string_lossy().to_string();
        let file = File::open(path).map_err(|e| StoreError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let persisted: PersistedStore =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::Json {
                path: path_str.clone(),
                source: e,
            })?;
        if persisted.size != persisted.records.len() {
            return Err(StoreError::SizeMismatch {
                path: path_str,
                declared: persisted.size,
                actual: persisted.records.len(),
            });
        }
        debug!(path = %path.display(), records = persisted.size, "Loaded result store.");
        Ok(Self {
            records: persisted.records,
            metadata: persisted.metadata,
        })
    }

    /// Loads the store at `path`, or returns an empty store when no file exists yet.
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Loads several stores and concatenates them in the order given.
    pub fn merge_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StoreError> {
        let mut merged = Self::new();
        for path in paths {
            merged.merge(Self::load(path.as_ref())?);
        }
        Ok(merged)
    }

    /// Writes the whole store to a temporary file next to `path`, then renames it over
    /// `path`, so an interrupted save never leaves a truncated store behind.
    pub fn save(&mut self, path: &Path) -> Result<(), StoreError> {
        let path_str = path.to_string_lossy().to_string();
        if let Some((record, field)) = self
            .records
            .iter()
            .find_map(|r| r.non_finite_field().map(|field| (r, field)))
        {
            return Err(StoreError::NonFinite {
                path: path_str,
                id: record.id().to_string(),
                field,
            });
        }
        self.refresh_mean_seconds();
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path_str.clone(),
            source,
        };

        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
        let persisted = PersistedStoreRef {
            size: self.records.len(),
            metadata: &self.metadata,
            records: &self.records,
        };
        serde_json::to_writer_pretty(&mut tmp, &persisted).map_err(|e| StoreError::Json {
            path: path_str.clone(),
            source: e,
        })?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), records = self.records.len(), "Saved result store.");
        Ok(())
    }
}

// Metadata is bookkeeping; two stores are equal when they hold the same records in order.
impl PartialEq for ResultStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}
