//! Integration test: cleaned table to persisted models

mod common;

use cardio_xai::artifacts::ModelStore;
use cardio_xai::data::{frame_to_dataset, load_csv, load_labels, load_matrix};
use cardio_xai::error::XaiError;
use cardio_xai::preprocessing::{Preprocessor, StandardScaler};
use cardio_xai::training::{Classifier, ModelKind, Trainer, TrainingReport};

fn trained(dir: &std::path::Path) -> (cardio_xai::config::PipelineConfig, TrainingReport) {
    let config = common::fast(common::pipeline_at(dir, 50, 2));
    Preprocessor::new(&config).run().unwrap();
    let report = Trainer::new(&config).run().unwrap();
    (config, report)
}

#[test]
fn test_training_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (config, report) = trained(dir.path());

    let store = ModelStore::new(&config.paths.models_dir);
    for kind in ModelKind::ALL {
        assert!(store.model_path(kind).exists(), "{} artifact", kind);
    }
    assert!(store.scaler_path().exists());
    assert!(store.report_path().exists());
    assert!(config.paths.test_features.exists());
    assert!(config.paths.test_labels.exists());

    assert_eq!(report.n_train + report.n_test, 50);
    assert_eq!(report.n_test, 10);
    assert_eq!(report.models.len(), 3);
}

#[test]
fn test_held_out_set_matches_report() {
    let dir = tempfile::tempdir().unwrap();
    let (config, report) = trained(dir.path());

    let (names, x_test) = load_matrix(&config.paths.test_features).unwrap();
    let y_test = load_labels(&config.paths.test_labels, "target").unwrap();

    assert_eq!(names, common::FEATURES.to_vec());
    assert_eq!(names, report.feature_names);
    assert_eq!(x_test.nrows(), report.n_test);
    assert_eq!(y_test.len(), report.n_test);
    // Stratified: 25 positives out of 50 rows
    assert_eq!(y_test.sum(), 5.0);
}

#[test]
fn test_persisted_models_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (config, report) = trained(dir.path());

    let store = ModelStore::new(&config.paths.models_dir);
    let (_, x_test) = load_matrix(&config.paths.test_features).unwrap();
    let y_test = load_labels(&config.paths.test_labels, "target").unwrap();

    for kind in ModelKind::ALL {
        let model = store.load_model(kind).unwrap();
        assert_eq!(model.kind(), kind);

        let accuracy = model.accuracy(&x_test, &y_test).unwrap();
        let reported = report.accuracy_of(kind).unwrap();
        assert!((accuracy - reported).abs() < 1e-12, "{}", kind);
        assert!(accuracy >= 0.9, "{} should separate on cp", kind);
    }
}

#[test]
fn test_scaler_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = trained(dir.path());

    let scaler = ModelStore::new(&config.paths.models_dir).load_scaler().unwrap();
    assert!(scaler.is_fitted());
    assert_eq!(scaler.params().len(), common::FEATURES.len());

    let (_, x_test) = load_matrix(&config.paths.test_features).unwrap();
    let raw = scaler.inverse_transform(&x_test).unwrap();
    let age_col = raw.column(0);
    assert!(age_col.iter().all(|&a| (40.0 - 1e-6..=68.0 + 1e-6).contains(&a)));
}

#[test]
fn test_training_is_reproducible() {
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let (config_a, _) = trained(dir_a.path());
    let (config_b, _) = trained(dir_b.path());

    let (_, xa) = load_matrix(&config_a.paths.test_features).unwrap();
    let (_, xb) = load_matrix(&config_b.paths.test_features).unwrap();
    assert_eq!(xa, xb);

    let rf_a = ModelStore::new(&config_a.paths.models_dir)
        .load_model(ModelKind::RandomForest)
        .unwrap();
    let rf_b = ModelStore::new(&config_b.paths.models_dir)
        .load_model(ModelKind::RandomForest)
        .unwrap();
    assert_eq!(rf_a.predict_proba(&xa).unwrap(), rf_b.predict_proba(&xb).unwrap());
}

#[test]
fn test_training_without_cleaned_data() {
    let dir = tempfile::tempdir().unwrap();
    let config = cardio_xai::config::PipelineConfig::rooted_at(dir.path());
    assert!(matches!(Trainer::new(&config).run().unwrap_err(), XaiError::MissingInput(_)));
}

#[test]
fn test_held_out_set_is_not_self_scaled() {
    let dir = tempfile::tempdir().unwrap();
    let (config, _) = trained(dir.path());

    let (_, x_test) = load_matrix(&config.paths.test_features).unwrap();
    let means: Vec<f64> = x_test.columns().into_iter().map(|c| c.mean().unwrap()).collect();
    assert!(
        means.iter().any(|m| m.abs() > 1e-6),
        "test columns look standardized on themselves: {:?}",
        means
    );
}

#[test]
fn test_scaler_matches_train_only_refit() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fast(common::pipeline_at(dir.path(), 50, 0));
    Preprocessor::new(&config).run().unwrap();

    let cleaned = load_csv(&config.paths.cleaned_data).unwrap();
    let dataset = frame_to_dataset(&cleaned, "target").unwrap();
    let output = Trainer::new(&config).train(&dataset).unwrap();

    let mut train_only = StandardScaler::new();
    train_only
        .fit(&dataset.select(&output.split.train_indices).features)
        .unwrap();
    let mut all_rows = StandardScaler::new();
    all_rows.fit(&dataset.features).unwrap();

    assert_eq!(output.scaler.params(), train_only.params());
    assert_ne!(output.scaler.params(), all_rows.params());
}
