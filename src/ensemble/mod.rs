//! Ensemble Classification
//!
//! Three independently trained predictors vote on the machine condition:
//!
//! 1. **svm** - linear one-vs-rest support vector machine
//! 2. **knn** - k-nearest neighbours over stored reference windows
//! 3. **gnb** - Gaussian naive Bayes
//!
//! ## Voting Rules
//!
//! - A label with at least 2 of 3 votes wins with `high` confidence
//! - A three-way split yields `suspicious` with `low` confidence
//! - Any predictor failing fails the whole prediction (no 2-model vote)

mod classifier;
pub mod predictors;
pub mod store;

pub use classifier::{vote, EnsembleClassifier, EnsembleDecision};
pub use predictors::Predictor;
pub use store::ModelStore;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or running a predictor
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model '{model}' unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    #[error("Model '{model}' produced invalid output: {output}")]
    InvalidOutput { model: String, output: String },

    #[error("Model '{model}' is invalid: {reason}")]
    Invalid { model: String, reason: String },

    #[error("Failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ModelError {
    pub fn unavailable(model: &str, reason: impl Into<String>) -> Self {
        ModelError::Unavailable {
            model: model.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid(model: &str, reason: impl Into<String>) -> Self {
        ModelError::Invalid {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}
