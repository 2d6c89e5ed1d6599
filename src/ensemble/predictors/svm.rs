//! Linear SVM (one-vs-rest) - highest decision value wins

use serde::{Deserialize, Serialize};

use super::{argmax, label_for, validate_classes, validate_rows, Predictor};
use crate::ensemble::ModelError;
use crate::types::{FaultLabel, FeatureVector};

/// Exported one-vs-rest linear SVM: one weight row and intercept per class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    pub classes: Vec<u8>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearSvm {
    pub const NAME: &'static str = "svm";

    pub fn validate(&self) -> Result<(), ModelError> {
        validate_classes(Self::NAME, &self.classes)?;
        if self.classes.len() < 2 {
            return Err(ModelError::invalid(Self::NAME, "need at least 2 classes"));
        }
        if self.coef.len() != self.classes.len() || self.intercept.len() != self.classes.len() {
            return Err(ModelError::invalid(
                Self::NAME,
                format!(
                    "{} classes but {} coef rows and {} intercepts",
                    self.classes.len(),
                    self.coef.len(),
                    self.intercept.len()
                ),
            ));
        }
        validate_rows(Self::NAME, "coef", &self.coef)?;
        if self.intercept.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::invalid(Self::NAME, "non-finite intercept"));
        }
        Ok(())
    }

    /// Decision value per class; NaN inputs contribute nothing.
    pub fn decision_function(&self, features: &FeatureVector) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| {
                w.iter()
                    .zip(features.as_slice())
                    .filter(|(_, x)| !x.is_nan())
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + b
            })
            .collect()
    }
}

impl Predictor for LinearSvm {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn classify(&self, features: &FeatureVector) -> Result<FaultLabel, ModelError> {
        let scores = self.decision_function(features);
        let best = argmax(&scores)
            .ok_or_else(|| ModelError::unavailable(Self::NAME, "no finite decision value"))?;
        label_for(Self::NAME, self.classes[best])
    }
}
