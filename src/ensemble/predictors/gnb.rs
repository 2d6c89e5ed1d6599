//! Gaussian naive Bayes - highest joint log-likelihood wins

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{argmax, label_for, validate_classes, validate_rows, Predictor};
use crate::ensemble::ModelError;
use crate::types::{FaultLabel, FeatureVector};

/// Exported Gaussian NB: per-class prior, feature means and variances.
///
/// Variances are used as stored (any smoothing was applied at training time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNb {
    pub classes: Vec<u8>,
    pub priors: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub variances: Vec<Vec<f64>>,
}

impl GaussianNb {
    pub const NAME: &'static str = "gnb";

    pub fn validate(&self) -> Result<(), ModelError> {
        validate_classes(Self::NAME, &self.classes)?;
        let n = self.classes.len();
        if self.priors.len() != n || self.means.len() != n || self.variances.len() != n {
            return Err(ModelError::invalid(
                Self::NAME,
                format!(
                    "{n} classes but {} priors, {} mean rows, {} variance rows",
                    self.priors.len(),
                    self.means.len(),
                    self.variances.len()
                ),
            ));
        }
        if self.priors.iter().any(|&p| !(p > 0.0 && p <= 1.0)) {
            return Err(ModelError::invalid(Self::NAME, "priors must be in (0, 1]"));
        }
        validate_rows(Self::NAME, "means", &self.means)?;
        validate_rows(Self::NAME, "variances", &self.variances)?;
        if self.variances.iter().flatten().any(|&v| v <= 0.0) {
            return Err(ModelError::invalid(Self::NAME, "variances must be > 0"));
        }
        Ok(())
    }

    /// `ln P(c) + Σ ln N(x_i | μ_ci, σ²_ci)` per class, NaN inputs skipped.
    pub fn joint_log_likelihood(&self, features: &FeatureVector) -> Vec<f64> {
        self.priors
            .iter()
            .zip(self.means.iter().zip(&self.variances))
            .map(|(prior, (mean, var))| {
                let log_likelihood: f64 = features
                    .as_slice()
                    .iter()
                    .zip(mean.iter().zip(var))
                    .filter(|(x, _)| !x.is_nan())
                    .map(|(x, (mu, v))| -0.5 * ((2.0 * PI * v).ln() + (x - mu).powi(2) / v))
                    .sum();
                prior.ln() + log_likelihood
            })
            .collect()
    }
}

impl Predictor for GaussianNb {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn classify(&self, features: &FeatureVector) -> Result<FaultLabel, ModelError> {
        let scores = self.joint_log_likelihood(features);
        let best = argmax(&scores)
            .ok_or_else(|| ModelError::unavailable(Self::NAME, "no finite log-likelihood"))?;
        label_for(Self::NAME, self.classes[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::FEATURE_COUNT;

    fn model() -> GaussianNb {
        GaussianNb {
            classes: vec![0, 1],
            priors: vec![0.5, 0.5],
            means: vec![vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]],
            variances: vec![vec![0.1; FEATURE_COUNT], vec![0.1; FEATURE_COUNT]],
        }
    }

    #[test]
    fn test_closest_mean_wins() {
        let gnb = model();
        gnb.validate().expect("valid");
        let q = FeatureVector::from_array([0.9; FEATURE_COUNT]);
        assert_eq!(gnb.classify(&q).ok(), Some(FaultLabel::Misalignment));
        let q = FeatureVector::from_array([0.2; FEATURE_COUNT]);
        assert_eq!(gnb.classify(&q).ok(), Some(FaultLabel::Normal));
    }

    #[test]
    fn test_prior_breaks_symmetry() {
        let mut gnb = model();
        gnb.priors = vec![0.9, 0.1];
        let q = FeatureVector::from_array([0.5; FEATURE_COUNT]);
        assert_eq!(gnb.classify(&q).ok(), Some(FaultLabel::Normal));
    }

    #[test]
    fn test_all_nan_input_falls_back_to_prior() {
        let mut gnb = model();
        gnb.priors = vec![0.2, 0.8];
        let q = FeatureVector::from_array([f64::NAN; FEATURE_COUNT]);
        assert_eq!(gnb.classify(&q).ok(), Some(FaultLabel::Misalignment));
    }

    #[test]
    fn test_validate_rejects_zero_variance() {
        let mut gnb = model();
        gnb.variances[0][3] = 0.0;
        assert!(gnb.validate().is_err());
    }
}
