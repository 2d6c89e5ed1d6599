//! Model directory loading
//!
//! Reads the three exported models from a directory, validates them and
//! assembles the ensemble. Called once at startup; any failure is fatal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::predictors::{GaussianNb, KNearest, LinearSvm};
use super::{EnsembleClassifier, ModelError};
use crate::config::defaults::{GNB_MODEL_FILE, KNN_MODEL_FILE, SVM_MODEL_FILE};

/// Loader for `svm.json`, `knn.json` and `gnb.json` in one directory.
pub struct ModelStore;

impl ModelStore {
    /// Load and validate all three models, returning the assembled ensemble.
    pub fn load(dir: &Path) -> Result<EnsembleClassifier, ModelError> {
        let [svm_path, knn_path, gnb_path] = Self::model_paths(dir);

        let svm: LinearSvm = read_json(&svm_path)?;
        svm.validate()?;
        info!(classes = svm.classes.len(), "Loaded svm model");

        let knn: KNearest = read_json(&knn_path)?;
        knn.validate()?;
        info!(k = knn.k, references = knn.samples.len(), "Loaded knn model");

        let gnb: GaussianNb = read_json(&gnb_path)?;
        gnb.validate()?;
        info!(classes = gnb.classes.len(), "Loaded gnb model");

        info!(dir = %dir.display(), "Ensemble ready");
        Ok(EnsembleClassifier::new(Box::new(svm), Box::new(knn), Box::new(gnb)))
    }

    /// Write the three models into `dir`, creating it if needed.
    ///
    /// Used by tooling and tests that produce model directories.
    pub fn save(dir: &Path, svm: &LinearSvm, knn: &KNearest, gnb: &GaussianNb) -> Result<(), ModelError> {
        std::fs::create_dir_all(dir).map_err(|source| ModelError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let [svm_path, knn_path, gnb_path] = Self::model_paths(dir);
        write_json(&svm_path, svm)?;
        write_json(&knn_path, knn)?;
        write_json(&gnb_path, gnb)
    }

    /// Paths the store reads from `dir`, in svm / knn / gnb order.
    pub fn model_paths(dir: &Path) -> [PathBuf; 3] {
        [
            dir.join(SVM_MODEL_FILE),
            dir.join(KNN_MODEL_FILE),
            dir.join(GNB_MODEL_FILE),
        ]
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ModelError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, content).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::FEATURE_COUNT;
    use crate::types::{FaultLabel, FeatureVector};
    use tempfile::TempDir;

    fn models() -> (LinearSvm, KNearest, GaussianNb) {
        let svm = LinearSvm {
            classes: vec![0, 1],
            coef: vec![vec![-1.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]],
            intercept: vec![0.0, 0.0],
        };
        let knn = KNearest {
            k: 1,
            samples: vec![vec![-1.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]],
            labels: vec![0, 1],
        };
        let gnb = GaussianNb {
            classes: vec![0, 1],
            priors: vec![0.5, 0.5],
            means: vec![vec![-1.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]],
            variances: vec![vec![1.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]],
        };
        (svm, knn, gnb)
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().expect("tempdir");
        let (svm, knn, gnb) = models();
        ModelStore::save(dir.path(), &svm, &knn, &gnb).expect("save");

        let ensemble = ModelStore::load(dir.path()).expect("load");
        let decision = ensemble
            .predict(&FeatureVector::from_array([0.8; FEATURE_COUNT]))
            .expect("predict");
        assert_eq!(decision.predicted_label, FaultLabel::Misalignment);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let (svm, _, _) = models();
        write_json(&dir.path().join(SVM_MODEL_FILE), &svm).expect("write");

        match ModelStore::load(dir.path()) {
            Err(ModelError::Io { path, .. }) => assert!(path.ends_with(KNN_MODEL_FILE)),
            other => panic!("expected Io error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(SVM_MODEL_FILE), "{ not json").expect("write");
        assert!(matches!(ModelStore::load(dir.path()), Err(ModelError::Parse { .. })));
    }
}
