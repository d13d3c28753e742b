//! Integration test: explanation stability under input noise

mod common;

use cardio_xai::artifacts::ModelStore;
use cardio_xai::config::{PipelineConfig, StabilityConfig};
use cardio_xai::data::load_matrix;
use cardio_xai::error::XaiError;
use cardio_xai::explainability::TreeExplainer;
use cardio_xai::preprocessing::Preprocessor;
use cardio_xai::stability::{spearman, StabilityScorer, StabilityStage, STABILITY_PLOT};
use cardio_xai::training::{ModelKind, Trainer};
use cardio_xai::visualization::{sidecar_path, ChartData};

fn prepared(dir: &std::path::Path) -> PipelineConfig {
    let config = common::fast(common::pipeline_at(dir, 50, 0));
    Preprocessor::new(&config).run().unwrap();
    Trainer::new(&config).run().unwrap();
    config
}

#[test]
fn test_stability_stage_scores_every_level() {
    let dir = tempfile::tempdir().unwrap();
    let config = prepared(dir.path());

    let report = StabilityStage::new(&config).run().unwrap();

    let scores = report.curve.scores();
    let levels: Vec<f64> = scores.iter().map(|(sigma, _)| *sigma).collect();
    assert_eq!(levels, vec![0.01, 0.05, 0.1, 0.2, 0.5]);
    for (_, rho) in &scores {
        assert!((-1.0..=1.0).contains(rho));
    }
    for point in &report.curve.points {
        assert_eq!(point.trial_correlations.len(), 5);
        let (lower, upper) = point.interval.unwrap();
        assert!(lower <= point.mean_correlation + 1e-12);
        assert!(point.mean_correlation <= upper + 1e-12);
    }

    assert!(report.plot.ends_with(format!("results/plots/stability/{}", STABILITY_PLOT)));
    assert!(report.plot.exists());
    let data: ChartData =
        serde_json::from_str(&std::fs::read_to_string(sidecar_path(&report.plot)).unwrap()).unwrap();
    assert_eq!(data.kind, "line");
    assert_eq!(data.series[0].values.len(), 5);
}

#[test]
fn test_stability_without_noise() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = prepared(dir.path());
    config.stability = config.stability.with_noise_levels(vec![0.0]);

    let report = StabilityStage::new(&config).run().unwrap();
    assert_eq!(report.curve.scores(), vec![(0.0, 1.0)]);
}

#[test]
fn test_stability_is_seeded() {
    let dir = tempfile::tempdir().unwrap();
    let config = prepared(dir.path());
    let (_, x) = load_matrix(&config.paths.test_features).unwrap();
    let rf = ModelStore::new(&config.paths.models_dir)
        .load_model(ModelKind::RandomForest)
        .unwrap();
    let explainer = TreeExplainer::for_model(&rf).unwrap();

    let run = |seed| {
        StabilityScorer::new(&explainer, config.stability.clone().with_seed(seed))
            .unwrap()
            .score(x.row(0))
            .unwrap()
            .scores()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn test_stability_requires_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::fast(common::pipeline_at(dir.path(), 50, 0));
    Preprocessor::new(&config).run().unwrap();

    let err = StabilityStage::new(&config).run().unwrap_err();
    assert!(matches!(err, XaiError::MissingInput(_)));
}

#[test]
fn test_spearman_reversed_ranking() {
    let rho = spearman(&[0.3, 0.1, -0.5, 0.9], &[-0.3, -0.1, 0.5, -0.9]).unwrap();
    assert!((rho + 1.0).abs() < 1e-12);
}

#[test]
fn test_stability_default_study() {
    let dir = tempfile::tempdir().unwrap();
    let fast = common::fast(common::pipeline_at(dir.path(), 50, 0));
    let config = fast.with_stability(StabilityConfig::default());
    Preprocessor::new(&config).run().unwrap();
    Trainer::new(&config).run().unwrap();

    let report = StabilityStage::new(&config).run().unwrap();

    let defaults = StabilityConfig::default();
    assert_eq!(report.curve.points.len(), defaults.noise_levels.len());
    for point in &report.curve.points {
        assert_eq!(point.trial_correlations.len(), defaults.trials);
        assert!((-1.0..=1.0).contains(&point.mean_correlation));
        let (lower, upper) = point.interval.unwrap();
        assert!(lower <= point.mean_correlation + 1e-12 && point.mean_correlation <= upper + 1e-12);
    }
    // Small noise barely moves the explanation
    assert!(report.curve.points[0].mean_correlation > 0.5);
}
