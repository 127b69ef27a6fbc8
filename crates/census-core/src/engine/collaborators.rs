//! The boundary to external systems.
//!
//! The census never aligns structures, detects orders or looks up classifications by
//! itself; it calls these traits. Failures are ordinary return values so the runner can
//! decide per item how to continue.

use crate::core::io::tables::{AlignmentTable, ClassificationTable, TableEntry};
use crate::core::models::alignment::RawAlignment;
use crate::core::utils::geometry::axis_from_alignment;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlignmentError {
    #[error("Structure '{0}' is unavailable")]
    StructureUnavailable(String),
    #[error("Alignment did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
    #[error("Alignment failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Order detection failed: {0}")]
pub struct OrderDetectionError(pub String);

pub trait SelfAligner: Send + Sync {
    fn align(&self, id: &str) -> Result<RawAlignment, AlignmentError>;
}

pub trait OrderDetector: Send + Sync {
    /// Returns a positive rotational order for the alignment.
    fn detect(&self, alignment: &RawAlignment) -> Result<u32, OrderDetectionError>;
}

pub trait GroupLookup {
    fn lookup_group(&self, id: &str) -> Option<String>;
}

impl SelfAligner for AlignmentTable {
    fn align(&self, id: &str) -> Result<RawAlignment, AlignmentError> {
        match self.get(id) {
            Some(TableEntry::Aligned(raw)) => Ok(raw.clone()),
            Some(TableEntry::Failed(message)) => Err(AlignmentError::Failed(message.clone())),
            None => Err(AlignmentError::StructureUnavailable(id.to_string())),
        }
    }
}

impl GroupLookup for ClassificationTable {
    fn lookup_group(&self, id: &str) -> Option<String> {
        self.group_of(id).map(str::to_string)
    }
}

impl GroupLookup for HashMap<String, String> {
    fn lookup_group(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

/// Default tolerance, in degrees, between the axis angle and a group rotation.
pub const DEFAULT_DETECTION_TOLERANCE: f64 = 10.0;

/// Detects the order from the rotation angle of the symmetry axis.
///
/// The order is the smallest `n` in `1..=max_order` for which the axis angle lies within
/// `tolerance` degrees of a rotation `k * 360 / n`. When the aligner supplied no axis, one is
/// recovered by superposing the aligned Cα atoms.
#[derive(Debug, Clone, Copy)]
pub struct AngleOrderDetector {
    pub max_order: u32,
    pub tolerance: f64,
}

impl AngleOrderDetector {
    pub fn new(max_order: u32, tolerance: f64) -> Self {
        Self {
            max_order: max_order.max(1),
            tolerance,
        }
    }
}

impl OrderDetector for AngleOrderDetector {
    fn detect(&self, alignment: &RawAlignment) -> Result<u32, OrderDetectionError> {
        let axis = match (&alignment.axis, &alignment.mapping) {
            (Some(axis), _) => *axis,
            (None, Some(mapping)) => axis_from_alignment(&alignment.ca_atoms, mapping)
                .ok_or_else(|| {
                    OrderDetectionError("could not superpose the aligned residues".to_string())
                })?,
            (None, None) => {
                return Err(OrderDetectionError(
                    "alignment has neither a rotation axis nor a residue mapping".to_string(),
                ));
            }
        };

        (1..=self.max_order)
            .find(|&n| axis.deviation_from_order(n) <= self.tolerance)
            .ok_or_else(|| {
                OrderDetectionError(format!(
                    "rotation angle {:.1} matches no order up to {}",
                    axis.angle, self.max_order
                ))
            })
    }
}
