use nalgebra::DMatrix;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const ROW_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Line {line}, column {column}: '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("Line {line}, column {column}: probability {value} is outside [0, 1]")]
    OutOfRange {
        line: usize,
        column: usize,
        value: f64,
    },
    #[error("Line {line} has {found} columns, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Calibration matrix must be square, found {rows} rows and {columns} columns")]
    NotSquare { rows: usize, columns: usize },
    #[error("Calibration matrix is empty")]
    Empty,
}

/// The error-transition ("confusion") matrix of an order detector.
///
/// Entry `(i, j)` (0-indexed) is the measured probability that a domain whose true order is
/// `i + 1` is reported with order `j + 1`. The matrix is read once and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    matrix: DMatrix<f64>,
}

impl TransitionMatrix {
    /// Reads a calibration file: one row per line, whitespace separated, no header.
    /// Blank lines and `#` comments are skipped.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let file = std::fs::File::open(path).map_err(|e| CalibrationError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let matrix = Self::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            CalibrationError::Io { source, .. } => CalibrationError::Io {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })?;
        debug!(
            path = %path.display(),
            max_order = matrix.max_order(),
            "Loaded calibration matrix."
        );
        Ok(matrix)
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, CalibrationError> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CalibrationError::Io {
                path: "<reader>".to_string(),
                source: e,
            })?;
            let line_no = line_idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let row = trimmed
                .split_whitespace()
                .enumerate()
                .map(|(col_idx, cell)| parse_probability(cell, line_no, col_idx + 1))
                .collect::<Result<Vec<f64>, _>>()?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(CalibrationError::RaggedRow {
                        line: line_no,
                        expected: first.len(),
                        found: row.len(),
                    });
                }
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, CalibrationError> {
        let size = rows.len();
        if size == 0 {
            return Err(CalibrationError::Empty);
        }
        if let Some(row) = rows.iter().find(|row| row.len() != size) {
            return Err(CalibrationError::NotSquare {
                rows: size,
                columns: row.len(),
            });
        }
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CalibrationError::OutOfRange {
                        line: i + 1,
                        column: j + 1,
                        value,
                    });
                }
            }
            let sum: f64 = row.iter().sum();
            if sum > 1.0 + ROW_SUM_TOLERANCE {
                warn!(
                    true_order = i + 1,
                    sum, "Calibration row carries more than unit probability mass."
                );
            }
        }
        let matrix = DMatrix::from_row_iterator(size, size, rows.into_iter().flatten());
        Ok(Self { matrix })
    }

    pub fn max_order(&self) -> u32 {
        self.matrix.nrows() as u32
    }

    /// Probability that true order `true_order` is observed as `observed` (both 1-indexed).
    pub fn probability(&self, true_order: u32, observed: u32) -> f64 {
        let (i, j) = (true_order as usize, observed as usize);
        if i == 0 || j == 0 || i > self.matrix.nrows() || j > self.matrix.ncols() {
            return 0.0;
        }
        self.matrix[(i - 1, j - 1)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

fn parse_probability(cell: &str, line: usize, column: usize) -> Result<f64, CalibrationError> {
    let value = cell
        .parse::<f64>()
        .map_err(|_| CalibrationError::InvalidNumber {
            line,
            column,
            value: cell.to_string(),
        })?;
    if !value.is_finite() {
        return Err(CalibrationError::InvalidNumber {
            line,
            column,
            value: cell.to_string(),
        });
    }
    Ok(value)
}
