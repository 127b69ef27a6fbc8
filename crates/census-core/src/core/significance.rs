//! Predicates deciding whether a self-alignment is a real symmetry.
//!
//! All predicates are pure functions of a [`ResultRecord`]. A field the predicate needs but
//! the record lacks makes the record not significant. Thresholds are inclusive: a score
//! exactly at the cutoff passes.

use crate::core::models::record::ResultRecord;

/// Angular tolerance, in degrees, used by the production predicate.
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 5.0;

pub trait SignificancePredicate: Send + Sync {
    fn is_significant(&self, record: &ResultRecord) -> bool;
}

/// Accepts everything. Useful when inspecting raw detector output.
#[derive(Debug, Clone, Copy, Default)]
pub struct UltraLiberal;

impl SignificancePredicate for UltraLiberal {
    fn is_significant(&self, _record: &ResultRecord) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TmScoreThreshold {
    pub min: f64,
}

impl SignificancePredicate for TmScoreThreshold {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        record.scores().tm_score.is_some_and(|tm| tm >= self.min)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZScoreThreshold {
    pub min: f64,
}

impl SignificancePredicate for ZScoreThreshold {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        record.scores().z_score.is_some_and(|z| z >= self.min)
    }
}

/// The production default: a detected order of at least 2 whose alignment is backed by
/// geometry.
///
/// The geometric check requires an alignment mapping and a rotation axis whose angle lies
/// within `angle_tolerance` degrees of a rotation of the cyclic group of the detected order.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricRefined {
    pub angle_tolerance: f64,
}

impl Default for SymmetricRefined {
    fn default() -> Self {
        Self {
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
        }
    }
}

impl SymmetricRefined {
    fn passes_geometric_check(&self, record: &ResultRecord, order: u32) -> bool {
        let has_mapping = record.alignment().is_some_and(|m| !m.is_empty());
        let axis_fits = record
            .axis()
            .is_some_and(|axis| axis.deviation_from_order(order) <= self.angle_tolerance);
        has_mapping && axis_fits
    }
}

impl SignificancePredicate for SymmetricRefined {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        match record.order() {
            Some(order) if order >= 2 => self.passes_geometric_check(record, order),
            _ => false,
        }
    }
}

/// Significant when every inner predicate is. An empty conjunction accepts everything.
pub struct AllOf(pub Vec<Box<dyn SignificancePredicate>>);

impl SignificancePredicate for AllOf {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        self.0.iter().all(|p| p.is_significant(record))
    }
}

/// Significant when any inner predicate is. An empty disjunction rejects everything.
pub struct AnyOf(pub Vec<Box<dyn SignificancePredicate>>);

impl SignificancePredicate for AnyOf {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        self.0.iter().any(|p| p.is_significant(record))
    }
}

pub struct Not(pub Box<dyn SignificancePredicate>);

impl SignificancePredicate for Not {
    fn is_significant(&self, record: &ResultRecord) -> bool {
        !self.0.is_significant(record)
    }
}
