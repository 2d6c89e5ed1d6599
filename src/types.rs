//! Shared data structures for the vibration monitoring pipeline
//!
//! This module defines the core types that flow through each tick:
//! - Ingestion: RawSample, RawBatch, SampleEvent
//! - Extraction: FeatureVector with its named (Descriptor, Axis) layout
//! - Decision: FaultLabel, Confidence, ModelVotes
//! - Output: ClassificationResult (with the feature-derived AxisSummary)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::defaults::{AXIS_COUNT, DESCRIPTOR_COUNT, FEATURE_COUNT};

// ============================================================================
// Ingestion
// ============================================================================

/// Stable identifier of a physical machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct MachineId(pub u32);

impl std::fmt::Display for MachineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// One triaxial accelerometer reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RawSample {
    /// Acquisition time (s)
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RawSample {
    pub fn new(time: f64, x: f64, y: f64, z: f64) -> Self {
        Self { time, x, y, z }
    }
}

/// One acquisition event: the samples captured together, in arrival order.
pub type RawBatch = Vec<RawSample>;

/// Unit of work on the ingestion channel.
#[derive(Debug, Clone)]
pub struct SampleEvent {
    pub machine_id: MachineId,
    pub batch: RawBatch,
    /// Ground-truth condition reported by the source (evaluation only)
    pub expected_label: FaultLabel,
}

// ============================================================================
// Labels
// ============================================================================

/// Machine condition.
///
/// Models only ever produce the first four variants. `Suspicious` is
/// reserved for an ensemble vote with no majority.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FaultLabel {
    Normal,
    Misalignment,
    Unbalance,
    BearingFault,
    Suspicious,
}

impl FaultLabel {
    /// The four labels a model may return, indexed by their integer code.
    pub const MODEL_LABELS: [FaultLabel; 4] = [
        FaultLabel::Normal,
        FaultLabel::Misalignment,
        FaultLabel::Unbalance,
        FaultLabel::BearingFault,
    ];

    /// Map a model's integer output (0..=3) to a label.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::MODEL_LABELS.get(code as usize).copied()
    }

    /// Integer code used by the models; `None` for `Suspicious`.
    pub fn code(self) -> Option<u8> {
        match self {
            FaultLabel::Normal => Some(0),
            FaultLabel::Misalignment => Some(1),
            FaultLabel::Unbalance => Some(2),
            FaultLabel::BearingFault => Some(3),
            FaultLabel::Suspicious => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaultLabel::Normal => "normal",
            FaultLabel::Misalignment => "misalignment",
            FaultLabel::Unbalance => "unbalance",
            FaultLabel::BearingFault => "bearing_fault",
            FaultLabel::Suspicious => "suspicious",
        }
    }
}

impl std::fmt::Display for FaultLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FaultLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FaultLabel::Normal),
            "misalignment" => Ok(FaultLabel::Misalignment),
            "unbalance" => Ok(FaultLabel::Unbalance),
            "bearing" | "bearing_fault" => Ok(FaultLabel::BearingFault),
            "suspicious" => Ok(FaultLabel::Suspicious),
            other => Err(format!("unknown fault label '{other}'")),
        }
    }
}

/// Coarse agreement tier of the ensemble vote (not a probability).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// Individual labels returned by the three ensemble members.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelVotes {
    pub svm: FaultLabel,
    pub knn: FaultLabel,
    pub gnb: FaultLabel,
}

impl ModelVotes {
    pub fn as_array(&self) -> [FaultLabel; 3] {
        [self.svm, self.knn, self.gnb]
    }
}

// ============================================================================
// Feature Layout
// ============================================================================

/// Accelerometer axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Statistical descriptor computed over a normalized spectrum.
///
/// Declaration order is the order the models were trained on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Descriptor {
    Mean,
    Std,
    ShapeFactor,
    Rms,
    ImpulseFactor,
    PeakToPeak,
    Kurtosis,
    CrestFactor,
    Skewness,
}

impl Descriptor {
    pub const ALL: [Descriptor; DESCRIPTOR_COUNT] = [
        Descriptor::Mean,
        Descriptor::Std,
        Descriptor::ShapeFactor,
        Descriptor::Rms,
        Descriptor::ImpulseFactor,
        Descriptor::PeakToPeak,
        Descriptor::Kurtosis,
        Descriptor::CrestFactor,
        Descriptor::Skewness,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short column name, e.g. `shapef`, used when labelling feature columns.
    pub fn column_name(self) -> &'static str {
        match self {
            Descriptor::Mean => "mean",
            Descriptor::Std => "std",
            Descriptor::ShapeFactor => "shapef",
            Descriptor::Rms => "rms",
            Descriptor::ImpulseFactor => "impulsef",
            Descriptor::PeakToPeak => "pp",
            Descriptor::Kurtosis => "kurtosis",
            Descriptor::CrestFactor => "crestf",
            Descriptor::Skewness => "skew",
        }
    }
}

/// Fixed-length model input: 9 descriptors × 3 axes, descriptor-major.
///
/// `[mean_x, mean_y, mean_z, std_x, std_y, std_z, ..., skew_x, skew_y, skew_z]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build from per-axis descriptor rows (`rows[axis][descriptor]`).
    pub fn from_axis_rows(rows: &[[f64; DESCRIPTOR_COUNT]; AXIS_COUNT]) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for descriptor in Descriptor::ALL {
            for axis in Axis::ALL {
                values[Self::offset(descriptor, axis)] = rows[axis.index()][descriptor.index()];
            }
        }
        Self(values)
    }

    /// Position of a (descriptor, axis) pair in the flat layout.
    pub const fn offset(descriptor: Descriptor, axis: Axis) -> usize {
        descriptor as usize * AXIS_COUNT + axis as usize
    }

    pub fn get(&self, descriptor: Descriptor, axis: Axis) -> f64 {
        self.0[Self::offset(descriptor, axis)]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn all_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Column names in layout order, e.g. `mean_x`, `shapef_z`.
    pub fn column_names() -> Vec<String> {
        Descriptor::ALL
            .iter()
            .flat_map(|d| {
                Axis::ALL.iter().map(move |a| {
                    let axis = match a {
                        Axis::X => "x",
                        Axis::Y => "y",
                        Axis::Z => "z",
                    };
                    format!("{}_{}", d.column_name(), axis)
                })
            })
            .collect()
    }
}

// ============================================================================
// Output
// ============================================================================

/// Per-axis summary shown on the dashboard, read from the feature vector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AxisSummary {
    pub rms: f64,
    pub kurtosis: f64,
    pub pp: f64,
    pub crestf: f64,
}

/// Dashboard summary for all three axes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeatureSummary {
    pub x: AxisSummary,
    pub y: AxisSummary,
    pub z: AxisSummary,
}

impl FeatureSummary {
    pub fn from_features(features: &FeatureVector) -> Self {
        let axis = |a: Axis| AxisSummary {
            rms: features.get(Descriptor::Rms, a),
            kurtosis: features.get(Descriptor::Kurtosis, a),
            pp: features.get(Descriptor::PeakToPeak, a),
            crestf: features.get(Descriptor::CrestFactor, a),
        };
        Self {
            x: axis(Axis::X),
            y: axis(Axis::Y),
            z: axis(Axis::Z),
        }
    }
}

/// One completed tick for one machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub machine_id: MachineId,
    /// Ground truth from the source, carried for evaluation only
    pub expected_label: FaultLabel,
    pub predicted_label: FaultLabel,
    pub confidence: Confidence,
    pub models: ModelVotes,
    pub summary: FeatureSummary,
    pub produced_at: DateTime<Utc>,
}

impl ClassificationResult {
    /// Whether the ensemble matched the source's ground truth.
    pub fn is_correct(&self) -> bool {
        self.expected_label == self.predicted_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_layout_is_descriptor_major() {
        assert_eq!(FeatureVector::offset(Descriptor::Mean, Axis::X), 0);
        assert_eq!(FeatureVector::offset(Descriptor::Mean, Axis::Z), 2);
        assert_eq!(FeatureVector::offset(Descriptor::Std, Axis::X), 3);
        assert_eq!(FeatureVector::offset(Descriptor::Rms, Axis::Y), 10);
        assert_eq!(FeatureVector::offset(Descriptor::Skewness, Axis::Z), 26);

        let names = FeatureVector::column_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "mean_x");
        assert_eq!(names[8], "shapef_z");
        assert_eq!(names[15], "pp_x");
        assert_eq!(names[26], "skew_z");
    }

    #[test]
    fn test_from_axis_rows() {
        let mut rows = [[0.0; DESCRIPTOR_COUNT]; AXIS_COUNT];
        for (a, row) in rows.iter_mut().enumerate() {
            for (d, v) in row.iter_mut().enumerate() {
                *v = (d * 10 + a) as f64;
            }
        }
        let fv = FeatureVector::from_axis_rows(&rows);
        assert_eq!(fv.get(Descriptor::Kurtosis, Axis::Y), 61.0);
        assert_eq!(fv.as_slice()[FeatureVector::offset(Descriptor::CrestFactor, Axis::Z)], 72.0);
    }

    #[test]
    fn test_label_codes() {
        for (code, label) in FaultLabel::MODEL_LABELS.iter().enumerate() {
            assert_eq!(FaultLabel::from_code(code as u8), Some(*label));
            assert_eq!(label.code(), Some(code as u8));
        }
        assert_eq!(FaultLabel::from_code(4), None);
        assert_eq!(FaultLabel::Suspicious.code(), None);
        assert_eq!("bearing".parse::<FaultLabel>(), Ok(FaultLabel::BearingFault));
    }

    #[test]
    fn test_feature_vector_json_shape() {
        let fv = FeatureVector::from_array([0.5; FEATURE_COUNT]);
        let json = serde_json::to_string(&fv).expect("serialize");
        let back: FeatureVector = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, fv);
        assert!(serde_json::from_str::<FeatureVector>("[1.0, 2.0]").is_err());
        assert_eq!(
            serde_json::to_string(&FaultLabel::BearingFault).expect("serialize"),
            "\"bearing_fault\""
        );
    }

    #[test]
    fn test_summary_reads_named_features() {
        let mut values = [0.0; FEATURE_COUNT];
        values[FeatureVector::offset(Descriptor::Rms, Axis::Y)] = 0.25;
        values[FeatureVector::offset(Descriptor::CrestFactor, Axis::Z)] = 3.5;
        let summary = FeatureSummary::from_features(&FeatureVector::from_array(values));
        assert_eq!(summary.y.rms, 0.25);
        assert_eq!(summary.z.crestf, 3.5);
        assert_eq!(summary.x.pp, 0.0);
    }
}
