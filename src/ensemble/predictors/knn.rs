//! k-nearest neighbours over stored reference feature vectors

use serde::{Deserialize, Serialize};

use super::{label_for, validate_classes, validate_rows, Predictor};
use crate::ensemble::ModelError;
use crate::types::{FaultLabel, FeatureVector};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearest {
    pub k: usize,
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl KNearest {
    pub const NAME: &'static str = "knn";

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.samples.is_empty() {
            return Err(ModelError::invalid(Self::NAME, "no reference samples"));
        }
        if self.samples.len() != self.labels.len() {
            return Err(ModelError::invalid(
                Self::NAME,
                format!("{} samples but {} labels", self.samples.len(), self.labels.len()),
            ));
        }
        if self.k == 0 || self.k > self.samples.len() {
            return Err(ModelError::invalid(
                Self::NAME,
                format!("k = {} must be in 1..={}", self.k, self.samples.len()),
            ));
        }
        validate_classes(Self::NAME, &self.labels)?;
        validate_rows(Self::NAME, "samples", &self.samples)
    }

    /// Squared Euclidean distance over the dimensions where the query is not NaN.
    fn distance(query: &FeatureVector, reference: &[f64]) -> f64 {
        query
            .as_slice()
            .iter()
            .zip(reference)
            .filter(|(q, _)| !q.is_nan())
            .map(|(q, r)| (q - r) * (q - r))
            .sum()
    }
}

impl Predictor for KNearest {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// Majority label among the k nearest; ties go to the lowest class code.
    fn classify(&self, features: &FeatureVector) -> Result<FaultLabel, ModelError> {
        let mut ranked: Vec<(f64, u8)> = self
            .samples
            .iter()
            .zip(&self.labels)
            .map(|(s, &l)| (Self::distance(features, s), l))
            .collect();

        if ranked.iter().any(|(d, _)| d.is_nan()) {
            return Err(ModelError::unavailable(Self::NAME, "distance is NaN"));
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut tally = [0usize; FaultLabel::MODEL_LABELS.len()];
        for &(_, code) in ranked.iter().take(self.k) {
            label_for(Self::NAME, code)?;
            tally[usize::from(code)] += 1;
        }

        let best = tally
            .iter()
            .enumerate()
            .fold((0usize, 0usize), |acc, (code, &n)| if n > acc.1 { (code, n) } else { acc });
        label_for(Self::NAME, best.0 as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::FEATURE_COUNT;

    fn point(v: f64) -> Vec<f64> {
        vec![v; FEATURE_COUNT]
    }

    fn model(k: usize) -> KNearest {
        KNearest {
            k,
            samples: vec![point(0.0), point(0.1), point(1.0), point(1.1), point(5.0)],
            labels: vec![0, 0, 2, 2, 3],
        }
    }

    #[test]
    fn test_majority_of_neighbours() {
        let knn = model(3);
        knn.validate().expect("valid");
        let q = FeatureVector::from_array([0.05; FEATURE_COUNT]);
        assert_eq!(knn.classify(&q).ok(), Some(FaultLabel::Normal));
        let q = FeatureVector::from_array([1.2; FEATURE_COUNT]);
        assert_eq!(knn.classify(&q).ok(), Some(FaultLabel::Unbalance));
    }

    #[test]
    fn test_tie_goes_to_lowest_code() {
        let knn = model(4);
        // Nearest four: two class 2, two class 0
        let q = FeatureVector::from_array([0.55; FEATURE_COUNT]);
        assert_eq!(knn.classify(&q).ok(), Some(FaultLabel::Normal));
    }

    #[test]
    fn test_nan_query_dimensions_are_ignored() {
        let knn = model(1);
        let mut x = [4.9; FEATURE_COUNT];
        x[2] = f64::NAN;
        x[4] = f64::NAN;
        assert_eq!(knn.classify(&FeatureVector::from_array(x)).ok(), Some(FaultLabel::BearingFault));
    }

    #[test]
    fn test_validate_k_range() {
        assert!(model(0).validate().is_err());
        assert!(model(6).validate().is_err());
        let mut bad = model(1);
        bad.labels[0] = 7;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_unvalidated_out_of_range_label_is_invalid_output() {
        let mut knn = model(1);
        knn.labels[0] = 4;
        let q = FeatureVector::from_array([0.0; FEATURE_COUNT]);
        match knn.classify(&q) {
            Err(ModelError::InvalidOutput { model, output }) => {
                assert_eq!(model, "knn");
                assert!(output.contains('4'), "{output}");
            }
            other => panic!("expected InvalidOutput, got {other:?}"),
        }
    }
}
