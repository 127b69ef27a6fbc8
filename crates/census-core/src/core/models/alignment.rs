use super::record::{AlignmentMapping, RotationAxis, ScoreBundle};
use nalgebra::Point3;

/// A self-alignment as produced by an external aligner, before order detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAlignment {
    pub scores: ScoreBundle,
    pub mapping: Option<AlignmentMapping>,
    pub axis: Option<RotationAxis>,
    /// Cα coordinates of the aligned structure, in residue order. May be empty when the
    /// aligner does not expose coordinates.
    pub ca_atoms: Vec<Point3<f64>>,
}

impl RawAlignment {
    pub fn new(scores: ScoreBundle) -> Self {
        Self {
            scores,
            ..Default::default()
        }
    }

    pub fn with_mapping(mut self, mapping: Option<AlignmentMapping>) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_axis(mut self, axis: Option<RotationAxis>) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_ca_atoms(mut self, atoms: Vec<Point3<f64>>) -> Self {
        self.ca_atoms = atoms;
        self
    }
}
