//! Model Store Tests
//!
//! Model directories written to disk are loaded back into a working ensemble,
//! and malformed exports are rejected at load time.

use tempfile::TempDir;
use tokio_test::assert_ok;
use vibewatch::config::defaults::{FEATURE_COUNT, GNB_MODEL_FILE, KNN_MODEL_FILE, SVM_MODEL_FILE};
use vibewatch::ensemble::predictors::{GaussianNb, KNearest, LinearSvm};
use vibewatch::types::{Axis, Descriptor};
use vibewatch::{
    Confidence, FaultLabel, FeatureExtractor, FeatureVector, ModelError, ModelStore, RawSample,
};

/// Four well-separated class centres along the diagonal.
fn centre(code: u8) -> Vec<f64> {
    vec![f64::from(code) * 10.0; FEATURE_COUNT]
}

fn four_class_models() -> (LinearSvm, KNearest, GaussianNb) {
    let classes = vec![0, 1, 2, 3];

    // w·x + b = 10c·Σx - 50c²·27, maximal for the nearest centre
    let svm = LinearSvm {
        classes: classes.clone(),
        coef: classes.iter().map(|&c| vec![f64::from(c) * 10.0; FEATURE_COUNT]).collect(),
        intercept: classes
            .iter()
            .map(|&c| -0.5 * (f64::from(c) * 10.0).powi(2) * FEATURE_COUNT as f64)
            .collect(),
    };
    let knn = KNearest {
        k: 3,
        samples: classes
            .iter()
            .flat_map(|&c| {
                let base = centre(c);
                [base.clone(), base.iter().map(|v| v + 0.5).collect(), base.iter().map(|v| v - 0.5).collect()]
            })
            .collect(),
        labels: classes.iter().flat_map(|&c| [c, c, c]).collect(),
    };
    let gnb = GaussianNb {
        classes: classes.clone(),
        priors: vec![0.25; 4],
        means: classes.iter().map(|&c| centre(c)).collect(),
        variances: vec![vec![4.0; FEATURE_COUNT]; 4],
    };
    (svm, knn, gnb)
}

#[test]
fn saved_models_load_and_agree() {
    let dir = TempDir::new().expect("tempdir");
    let (svm, knn, gnb) = four_class_models();
    assert_ok!(ModelStore::save(dir.path(), &svm, &knn, &gnb));

    let ensemble = ModelStore::load(dir.path()).expect("load");
    assert_eq!(ensemble.member_names(), ["svm", "knn", "gnb"]);

    for (code, label) in FaultLabel::MODEL_LABELS.iter().enumerate() {
        let query: Vec<f64> = centre(code as u8).iter().map(|v| v + 1.0).collect();
        let mut values = [0.0; FEATURE_COUNT];
        values.copy_from_slice(&query);

        let decision = ensemble.predict(&FeatureVector::from_array(values)).expect("predict");
        assert_eq!(decision.predicted_label, *label);
        assert_eq!(decision.confidence, Confidence::High);
        assert_eq!(decision.votes.svm, *label);
        assert_eq!(decision.votes.knn, *label);
        assert_eq!(decision.votes.gnb, *label);
    }
}

#[test]
fn model_with_wrong_feature_count_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let (svm, knn, mut gnb) = four_class_models();
    gnb.means[2].truncate(FEATURE_COUNT - 1);
    ModelStore::save(dir.path(), &svm, &knn, &gnb).expect("save");

    match ModelStore::load(dir.path()) {
        Err(ModelError::Invalid { model, reason }) => {
            assert_eq!(model, "gnb");
            assert!(reason.contains("means[2]"), "{reason}");
        }
        other => panic!("expected invalid gnb, got {:?}", other.err()),
    }
}

#[test]
fn knn_with_out_of_range_label_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let (svm, mut knn, gnb) = four_class_models();
    knn.labels[0] = 4;
    ModelStore::save(dir.path(), &svm, &knn, &gnb).expect("save");

    assert!(matches!(
        ModelStore::load(dir.path()),
        Err(ModelError::Invalid { ref model, .. }) if model == "knn"
    ));
}

#[test]
fn empty_directory_fails_on_first_model() {
    let dir = TempDir::new().expect("tempdir");
    let err = ModelStore::load(dir.path()).err().expect("must fail");
    match err {
        ModelError::Io { path, .. } => assert!(path.ends_with(SVM_MODEL_FILE)),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn json_with_missing_fields_is_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let (svm, knn, gnb) = four_class_models();
    assert_ok!(ModelStore::save(dir.path(), &svm, &knn, &gnb));
    std::fs::write(dir.path().join(KNN_MODEL_FILE), r#"{"k": 3}"#).expect("overwrite");
    assert!(dir.path().join(GNB_MODEL_FILE).exists());

    match ModelStore::load(dir.path()) {
        Err(ModelError::Parse { path, .. }) => assert!(path.ends_with(KNN_MODEL_FILE)),
        other => panic!("expected parse error, got {:?}", other.err()),
    }
}

#[test]
fn silent_window_classifies_through_loaded_models() {
    let dir = TempDir::new().expect("tempdir");
    let (svm, knn, gnb) = four_class_models();
    assert_ok!(ModelStore::save(dir.path(), &svm, &knn, &gnb));
    let ensemble = ModelStore::load(dir.path()).expect("load");

    let window: Vec<RawSample> = (0..500)
        .map(|i| RawSample::new(i as f64 / 20_000.0, 0.0, 0.0, 0.0))
        .collect();
    let features = FeatureExtractor::new().extract(&window).expect("features");
    for axis in Axis::ALL {
        assert!(features.get(Descriptor::ShapeFactor, axis).is_nan());
        assert!(features.get(Descriptor::ImpulseFactor, axis).is_nan());
    }

    // Remaining 21 features are all 0.0, nearest to the class 0 centre
    let decision = ensemble.predict(&features).expect("NaN features are skipped, not fatal");
    assert_eq!(decision.votes.svm, FaultLabel::Normal);
    assert_eq!(decision.votes.knn, FaultLabel::Normal);
    assert_eq!(decision.votes.gnb, FaultLabel::Normal);
    assert_eq!(decision.predicted_label, FaultLabel::Normal);
    assert_eq!(decision.confidence, Confidence::High);
}
