use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality scores of one self-alignment.
///
/// Every field is optional: aligners differ in what they report, and a failure-marked
/// record carries none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoreBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmsd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tm_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_score: Option<f64>,
}

impl ScoreBundle {
    /// Name of the first score that is NaN or infinite, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("alignment-length", self.alignment_length),
            ("gap-length", self.gap_length),
            ("identity", self.identity),
            ("similarity", self.similarity),
            ("rmsd", self.rmsd),
            ("tm-score", self.tm_score),
            ("z-score", self.z_score),
        ]
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Malformed alignment pair '{0}'. Expected 'position=position'.")]
    MalformedPair(String),
    #[error("Residue position {0} is aligned more than once")]
    DuplicateSource(i64),
    #[error("Residue position {0} is the target of more than one aligned position")]
    DuplicateTarget(i64),
}

/// A residue-to-residue correspondence: a partial injective function over residue positions.
///
/// Serialized compactly as `"1=12,2=13,5=17"`, sorted by source position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AlignmentMapping {
    pairs: BTreeMap<i64, i64>,
}

impl AlignmentMapping {
    /// Builds a mapping, rejecting any pair that would break injectivity.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, i64)>) -> Result<Self, MappingError> {
        let mut forward = BTreeMap::new();
        let mut targets = std::collections::HashSet::new();
        for (source, target) in pairs {
            if forward.insert(source, target).is_some() {
                return Err(MappingError::DuplicateSource(source));
            }
            if !targets.insert(target) {
                return Err(MappingError::DuplicateTarget(target));
            }
        }
        Ok(Self { pairs: forward })
    }

    pub fn get(&self, source: i64) -> Option<i64> {
        self.pairs.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.pairs.iter().map(|(s, t)| (*s, *t))
    }
}

impl fmt::Display for AlignmentMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.pairs.iter().map(|(s, t)| format!("{s}={t}")).join(",")
        )
    }
}

impl FromStr for AlignmentMapping {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let pairs = trimmed
            .split(',')
            .map(|pair| {
                let (source, target) = pair
                    .split_once('=')
                    .ok_or_else(|| MappingError::MalformedPair(pair.to_string()))?;
                let source = source
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| MappingError::MalformedPair(pair.to_string()))?;
                let target = target
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| MappingError::MalformedPair(pair.to_string()))?;
                Ok((source, target))
            })
            .collect::<Result<Vec<_>, MappingError>>()?;
        Self::from_pairs(pairs)
    }
}

impl From<AlignmentMapping> for String {
    fn from(mapping: AlignmentMapping) -> Self {
        mapping.to_string()
    }
}

impl TryFrom<String> for AlignmentMapping {
    type Error = MappingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The symmetry axis recovered from a self-alignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RotationAxis {
    pub direction: [f64; 3],
    /// Rotation angle about the axis, in degrees.
    pub angle: f64,
}

impl RotationAxis {
    pub fn new(direction: [f64; 3], angle: f64) -> Self {
        Self { direction, angle }
    }

    pub fn is_finite(&self) -> bool {
        self.angle.is_finite() && self.direction.iter().all(|c| c.is_finite())
    }

    /// Angular distance, in degrees, between this rotation and the closest non-trivial
    /// rotation of a cyclic group of the given order.
    ///
    /// Order 1 has no non-trivial rotation, so the distance is measured to 0/360 degrees.
    pub fn deviation_from_order(&self, order: u32) -> f64 {
        let angle = self.angle.rem_euclid(360.0);
        if order <= 1 {
            return angle.min(360.0 - angle);
        }
        let step = 360.0 / order as f64;
        (1..order)
            .map(|k| (angle - step * k as f64).abs())
            .fold(f64::INFINITY, f64::min)
    }
}

/// Which optional payloads to drop when shrinking a record for serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripFields {
    pub alignment: bool,
    pub axis: bool,
}

/// The outcome of one self-alignment job.
///
/// A record is immutable once built. A successful record carries a detected order; a
/// failure-marked placeholder carries only the identifier and the failure message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResultRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order: Option<u32>,
    #[serde(default)]
    significant: bool,
    #[serde(default)]
    scores: ScoreBundle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alignment: Option<AlignmentMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    axis: Option<RotationAxis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seconds: Option<f64>,
}

impl ResultRecord {
    /// A successful result. Orders below 1 are raised to 1.
    pub fn new(id: impl Into<String>, order: u32, scores: ScoreBundle) -> Self {
        Self {
            id: id.into(),
            order: Some(order.max(1)),
            significant: false,
            scores,
            alignment: None,
            axis: None,
            failure: None,
            seconds: None,
        }
    }

    /// A placeholder for a job that could not be completed.
    pub fn failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order: None,
            significant: false,
            scores: ScoreBundle::default(),
            alignment: None,
            axis: None,
            failure: Some(message.into()),
            seconds: None,
        }
    }

    pub fn with_alignment(mut self, alignment: Option<AlignmentMapping>) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_axis(mut self, axis: Option<RotationAxis>) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_significance(mut self, significant: bool) -> Self {
        self.significant = significant;
        self
    }

    pub fn with_seconds(mut self, seconds: f64) -> Self {
        self.seconds = Some(seconds);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn is_significant(&self) -> bool {
        self.significant
    }

    pub fn scores(&self) -> &ScoreBundle {
        &self.scores
    }

    pub fn alignment(&self) -> Option<&AlignmentMapping> {
        self.alignment.as_ref()
    }

    pub fn axis(&self) -> Option<&RotationAxis> {
        self.axis.as_ref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn seconds(&self) -> Option<f64> {
        self.seconds
    }

    /// The order this record votes with during aggregation.
    ///
    /// An order that is not significant is not trusted and counts as no symmetry.
    /// Failure-marked records do not vote at all.
    pub fn effective_order(&self) -> Option<u32> {
        match (self.order, self.significant) {
            (Some(order), true) => Some(order),
            (Some(_), false) => Some(1),
            (None, _) => None,
        }
    }

    /// Name of the first field holding a NaN or infinite value. JSON has no such numbers,
    /// so a record for which this is `Some` cannot be stored.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        if let Some(field) = self.scores.non_finite_field() {
            return Some(field);
        }
        if self.axis.is_some_and(|axis| !axis.is_finite()) {
            return Some("axis");
        }
        if self.seconds.is_some_and(|s| !s.is_finite()) {
            return Some("seconds");
        }
        None
    }

    pub fn stripped(mut self, fields: StripFields) -> Self {
        if fields.alignment {
            self.alignment = None;
        }
        if fields.axis {
            self.axis = None;
        }
        self
    }
}

// Timing is run metadata and takes no part in equality.
impl PartialEq for ResultRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.order == other.order
            && self.significant == other.significant
            && self.scores == other.scores
            && self.alignment == other.alignment
            && self.axis == other.axis
            && self.failure == other.failure
    }
}
