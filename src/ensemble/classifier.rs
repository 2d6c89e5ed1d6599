//! EnsembleClassifier - 2-of-3 majority vote over injected predictors

use tracing::debug;

use super::{ModelError, Predictor};
use crate::types::{Confidence, FaultLabel, FeatureVector, ModelVotes};

/// Outcome of one ensemble prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsembleDecision {
    pub predicted_label: FaultLabel,
    pub confidence: Confidence,
    pub votes: ModelVotes,
}

/// Majority vote over the three model labels.
///
/// A label with ≥ 2 votes wins with `High`; a 1-1-1 split is `Suspicious`
/// with `Low`.
pub fn vote(votes: &ModelVotes) -> (FaultLabel, Confidence) {
    let mut tally = [0u8; FaultLabel::MODEL_LABELS.len()];
    for label in votes.as_array() {
        if let Some(code) = label.code() {
            tally[code as usize] += 1;
        }
    }

    tally
        .iter()
        .position(|&count| count >= 2)
        .map_or((FaultLabel::Suspicious, Confidence::Low), |code| {
            (FaultLabel::MODEL_LABELS[code], Confidence::High)
        })
}

/// Three predictors in fixed roles, loaded once and shared by all workers.
pub struct EnsembleClassifier {
    svm: Box<dyn Predictor>,
    knn: Box<dyn Predictor>,
    gnb: Box<dyn Predictor>,
}

impl EnsembleClassifier {
    pub fn new(svm: Box<dyn Predictor>, knn: Box<dyn Predictor>, gnb: Box<dyn Predictor>) -> Self {
        Self { svm, knn, gnb }
    }

    /// Names of the members in svm / knn / gnb order.
    pub fn member_names(&self) -> [&str; 3] {
        [self.svm.name(), self.knn.name(), self.gnb.name()]
    }

    /// Classify a feature vector.
    ///
    /// Fails as a whole if any member fails or returns `Suspicious`.
    pub fn predict(&self, features: &FeatureVector) -> Result<EnsembleDecision, ModelError> {
        let votes = ModelVotes {
            svm: Self::ask(self.svm.as_ref(), features)?,
            knn: Self::ask(self.knn.as_ref(), features)?,
            gnb: Self::ask(self.gnb.as_ref(), features)?,
        };

        let (predicted_label, confidence) = vote(&votes);

        debug!(
            svm = %votes.svm,
            knn = %votes.knn,
            gnb = %votes.gnb,
            predicted = %predicted_label,
            confidence = %confidence,
            "Ensemble vote complete"
        );

        Ok(EnsembleDecision {
            predicted_label,
            confidence,
            votes,
        })
    }

    fn ask(predictor: &dyn Predictor, features: &FeatureVector) -> Result<FaultLabel, ModelError> {
        let label = predictor.classify(features)?;
        if label == FaultLabel::Suspicious {
            return Err(ModelError::InvalidOutput {
                model: predictor.name().to_string(),
                output: label.to_string(),
            });
        }
        Ok(label)
    }
}
