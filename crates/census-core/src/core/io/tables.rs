//! Tab-separated tables exchanged with external tools.
//!
//! - Alignment tables replay the output of an external self-aligner, one domain per row.
//! - Classification tables map domain identifiers to group keys (fold, superfamily, ...).

use crate::core::models::alignment::RawAlignment;
use crate::core::models::record::{AlignmentMapping, RotationAxis, ScoreBundle};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid row in '{path}' at line {line}: {message}")]
    InvalidRow {
        path: String,
        line: u64,
        message: String,
    },
}

fn tsv_reader(has_headers: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(b'\t')
        .has_headers(has_headers)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(!has_headers);
    builder
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AlignmentRow {
    id: String,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    gaps: Option<f64>,
    #[serde(default)]
    identity: Option<f64>,
    #[serde(default)]
    similarity: Option<f64>,
    #[serde(default)]
    rmsd: Option<f64>,
    #[serde(default)]
    tm_score: Option<f64>,
    #[serde(default)]
    z_score: Option<f64>,
    #[serde(default)]
    alignment: Option<String>,
    #[serde(default)]
    axis_x: Option<f64>,
    #[serde(default)]
    axis_y: Option<f64>,
    #[serde(default)]
    axis_z: Option<f64>,
    #[serde(default)]
    angle: Option<f64>,
    #[serde(default)]
    coordinates: Option<String>,
    #[serde(default)]
    failure: Option<String>,
}

impl AlignmentRow {
    fn check_finite(&self) -> Result<(), String> {
        let cells = [
            ("length", self.length),
            ("gaps", self.gaps),
            ("identity", self.identity),
            ("similarity", self.similarity),
            ("rmsd", self.rmsd),
            ("tm-score", self.tm_score),
            ("z-score", self.z_score),
            ("axis-x", self.axis_x),
            ("axis-y", self.axis_y),
            ("axis-z", self.axis_z),
            ("angle", self.angle),
        ];
        match cells
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        {
            Some((column, _)) => Err(format!("column '{column}' must be a finite number")),
            None => Ok(()),
        }
    }
}

/// Reads Cα coordinates, one `x y z` triple per line in residue order. Blank lines and
/// `#` comments are skipped.
pub fn read_ca_coordinates(path: &Path) -> Result<Vec<Point3<f64>>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("cannot read coordinates '{}': {e}", path.display()))?;
    let mut atoms = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("{}:{}: {e}", path.display(), idx + 1))?;
        match values.as_slice() {
            [x, y, z] if values.iter().all(|v| v.is_finite()) => {
                atoms.push(Point3::new(*x, *y, *z))
            }
            _ => {
                return Err(format!(
                    "{}:{}: expected three finite coordinates",
                    path.display(),
                    idx + 1
                ));
            }
        }
    }
    Ok(atoms)
}

/// One replayed aligner outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEntry {
    Aligned(RawAlignment),
    Failed(String),
}

/// Precomputed self-alignments keyed by domain identifier.
#[derive(Debug, Clone, Default)]
pub struct AlignmentTable {
    entries: HashMap<String, TableEntry>,
}

impl AlignmentTable {
    /// Reads a headed TSV with the columns `id length gaps identity similarity rmsd tm-score
    /// z-score alignment axis-x axis-y axis-z angle coordinates failure`. Only `id` is
    /// required; empty cells are absent values. A non-empty `failure` cell marks an alignment
    /// that failed.
    ///
    /// `coordinates` names a Cα coordinate file (see [`read_ca_coordinates`]), relative to
    /// the table's directory. Numeric cells must be finite.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let path_str = path.to_string_lossy().to_string();
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let mut reader = tsv_reader(true)
            .from_path(path)
            .map_err(|e| TableError::Csv {
                path: path_str.clone(),
                source: e,
            })?;

        let csv_err = |source: csv::Error| TableError::Csv {
            path: path_str.clone(),
            source,
        };
        let headers = reader.headers().map_err(csv_err)?.clone();

        let mut entries = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(csv_err)?;
            let line = record.position().map_or(0, |p| p.line());
            let row: AlignmentRow = record.deserialize(Some(&headers)).map_err(csv_err)?;
            let id = row.id.clone();
            let entry = Self::entry_from_row(row, base_dir).map_err(|message| TableError::InvalidRow {
                path: path_str.clone(),
                line,
                message,
            })?;
            if entries.insert(id.clone(), entry).is_some() {
                warn!(id = %id, "Alignment table lists a domain twice; keeping the last row.");
            }
        }
        debug!(path = %path.display(), rows = entries.len(), "Loaded alignment table.");
        Ok(Self { entries })
    }

    fn entry_from_row(row: AlignmentRow, base_dir: &Path) -> Result<TableEntry, String> {
        if let Some(failure) = row.failure.clone().filter(|f| !f.is_empty()) {
            return Ok(TableEntry::Failed(failure));
        }
        row.check_finite()?;
        let mapping = match row.alignment.as_deref() {
            Some(text) if !text.is_empty() => {
                Some(text.parse::<AlignmentMapping>().map_err(|e| e.to_string())?)
            }
            _ => None,
        };
        let axis = match (row.axis_x, row.axis_y, row.axis_z, row.angle) {
            (Some(x), Some(y), Some(z), Some(angle)) => Some(RotationAxis::new([x, y, z], angle)),
            (None, None, None, None) => None,
            _ => return Err("axis columns must be all present or all empty".to_string()),
        };
        let scores = ScoreBundle {
            alignment_length: row.length,
            gap_length: row.gaps,
            identity: row.identity,
            similarity: row.similarity,
            rmsd: row.rmsd,
            tm_score: row.tm_score,
            z_score: row.z_score,
        };
        let ca_atoms = match row.coordinates.as_deref() {
            Some(file) if !file.is_empty() => read_ca_coordinates(&base_dir.join(file))?,
            _ => Vec::new(),
        };
        Ok(TableEntry::Aligned(
            RawAlignment::new(scores)
                .with_mapping(mapping)
                .with_axis(axis)
                .with_ca_atoms(ca_atoms),
        ))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, TableEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TableEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Domain identifier to group key, e.g. SCOP sunid or fold name.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTable {
    groups: HashMap<String, String>,
}

impl ClassificationTable {
    /// Reads a header-less TSV of `id<TAB>group` rows. Extra columns are ignored; rows with
    /// an empty group leave the domain unclassified.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let path_str = path.to_string_lossy().to_string();
        let mut reader = tsv_reader(false)
            .from_path(path)
            .map_err(|e| TableError::Csv {
                path: path_str.clone(),
                source: e,
            })?;

        let mut groups = HashMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| TableError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
            let line = record.position().map_or(0, |p| p.line());
            let id = record.get(0).unwrap_or_default();
            let group = record.get(1).ok_or_else(|| TableError::InvalidRow {
                path: path_str.clone(),
                line,
                message: "expected 'id<TAB>group'".to_string(),
            })?;
            if id.is_empty() || group.is_empty() {
                debug!(line, "Skipping classification row without id or group.");
                continue;
            }
            groups.insert(id.to_string(), group.to_string());
        }
        debug!(path = %path.display(), domains = groups.len(), "Loaded classification table.");
        Ok(Self { groups })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            groups: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn group_of(&self, id: &str) -> Option<&str> {
        self.groups.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
