//! Shared fixtures for the integration tests

#![allow(dead_code)]

use cardio_xai::config::{LimeConfig, PipelineConfig};
use std::fmt::Write as _;
use std::path::Path;

pub const FEATURES: [&str; 5] = ["age", "sex", "cp", "chol", "thalach"];

/// Raw label of row `i`: even rows are healthy, odd rows cycle through 1..=4
pub fn raw_label(i: usize) -> i64 {
    if i % 2 == 0 {
        0
    } else {
        ((i / 2) % 4) as i64 + 1
    }
}

/// Heart-disease style table where only `cp` separates the classes.
///
/// `missing` extra rows carry a `?` in `chol` and are expected to be dropped.
pub fn heart_csv(complete: usize, missing: usize) -> String {
    let mut text = String::from("age,sex,cp,chol,thalach,target\n");
    for i in 0..complete + missing {
        let label = raw_label(i);
        let cp = if label > 0 { 3.0 + (i % 4) as f64 * 0.1 } else { 1.0 + (i % 3) as f64 * 0.1 };
        let age = 40 + (i * 37) % 29;
        let sex = (i / 3) % 2;
        let thalach = 130 + (i * 17) % 23;
        let chol = if i >= complete {
            "?".to_string()
        } else {
            (200 + (i * 53) % 41).to_string()
        };
        writeln!(text, "{},{},{:.1},{},{},{}", age, sex, cp, chol, thalach, label).unwrap();
    }
    text
}

/// Pipeline rooted at `root` with the raw table in place
pub fn pipeline_at(root: &Path, complete: usize, missing: usize) -> PipelineConfig {
    let config = PipelineConfig::rooted_at(root);
    let raw = &config.paths.raw_data;
    std::fs::create_dir_all(raw.parent().unwrap()).unwrap();
    std::fs::write(raw, heart_csv(complete, missing)).unwrap();
    config
}

/// Smaller ensembles for faster end-to-end runs
pub fn fast(config: PipelineConfig) -> PipelineConfig {
    let mut models = config.models.clone();
    models.forest.n_estimators = 30;
    models.boosting.n_estimators = 30;
    let lime = LimeConfig {
        num_samples: 1000,
        ..config.lime.clone()
    };
    let stability = config
        .stability
        .clone()
        .with_trials(5)
        .with_bootstrap_resamples(200);

    config.with_models(models).with_lime(lime).with_stability(stability)
}
