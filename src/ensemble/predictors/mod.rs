//! Predictor trait and the three inference-only model implementations
//!
//! Each model is deserialized from JSON exported by the training pipeline
//! and validated once at load. All three skip input dimensions whose value
//! is NaN (shape / impulse factor on a silent axis) instead of failing.

pub mod gnb;
pub mod knn;
pub mod svm;

pub use gnb::GaussianNb;
pub use knn::KNearest;
pub use svm::LinearSvm;

use super::ModelError;
use crate::config::defaults::FEATURE_COUNT;
use crate::types::{FaultLabel, FeatureVector};

/// A black-box classifier over the 27-feature vector.
///
/// Implementations must only return one of the four model labels, never
/// `Suspicious`.
pub trait Predictor: Send + Sync {
    /// Model name (e.g., "svm", "knn", "gnb")
    fn name(&self) -> &str;

    /// Classify one feature vector
    fn classify(&self, features: &FeatureVector) -> Result<FaultLabel, ModelError>;
}

/// Map an integer class code to a label, rejecting anything outside 0..=3.
pub(crate) fn label_for(model: &str, code: u8) -> Result<FaultLabel, ModelError> {
    FaultLabel::from_code(code).ok_or_else(|| ModelError::InvalidOutput {
        model: model.to_string(),
        output: format!("class code {code}"),
    })
}

/// Shared load-time checks for per-class rows.
pub(crate) fn validate_classes(model: &str, classes: &[u8]) -> Result<(), ModelError> {
    if classes.is_empty() {
        return Err(ModelError::invalid(model, "no classes"));
    }
    if let Some(bad) = classes.iter().find(|&&c| FaultLabel::from_code(c).is_none()) {
        return Err(ModelError::invalid(model, format!("class code {bad} outside 0..=3")));
    }
    Ok(())
}

pub(crate) fn validate_rows(model: &str, what: &str, rows: &[Vec<f64>]) -> Result<(), ModelError> {
    for (i, row) in rows.iter().enumerate() {
        if row.len() != FEATURE_COUNT {
            return Err(ModelError::invalid(
                model,
                format!("{what}[{i}] has {} values, expected {FEATURE_COUNT}", row.len()),
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::invalid(model, format!("{what}[{i}] contains non-finite values")));
        }
    }
    Ok(())
}

/// Index of the largest finite score. `None` if no score is finite.
pub(crate) fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
