//! Training stage: split, scale, fit, persist

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::{
    Classifier, GradientBoostingClassifier, LogisticRegression, ModelKind, ModelMetrics,
    RandomForest, TrainedModel,
};
use crate::artifacts::ModelStore;
use crate::config::{ModelsConfig, PathsConfig, PipelineConfig, SplitConfig};
use crate::data::{frame_to_dataset, labels_to_frame, load_csv, matrix_to_frame, save_csv, Dataset};
use crate::error::Result;
use crate::preprocessing::{stratified_split, Split, StandardScaler};

/// Held-out evaluation of one model variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub name: String,
    pub metrics: ModelMetrics,
    pub training_time_secs: f64,
    pub hyperparameters: serde_json::Value,
}

/// Summary written to `training_report.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub test_fraction: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub models: Vec<ModelReport>,
}

impl TrainingReport {
    pub fn accuracy_of(&self, kind: ModelKind) -> Option<f64> {
        self.models
            .iter()
            .find(|m| m.name == kind.artifact_name())
            .map(|m| m.metrics.accuracy)
    }
}

/// Everything the stage produced, before persistence
#[derive(Debug, Clone)]
pub struct TrainingOutput {
    pub split: Split,
    pub scaler: StandardScaler,
    pub models: Vec<TrainedModel>,
    pub x_test_scaled: Array2<f64>,
    pub y_test: Array1<f64>,
    pub report: TrainingReport,
}

/// Cleaned table to persisted models
pub struct Trainer {
    paths: PathsConfig,
    split: SplitConfig,
    models: ModelsConfig,
}

impl Trainer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            paths: config.paths.clone(),
            split: config.split.clone(),
            models: config.models.clone(),
        }
    }

    /// Split, scale and fit every variant in memory
    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutput> {
        let split = stratified_split(&dataset.labels, self.split.test_fraction, self.split.seed)?;
        let train = dataset.select(&split.train_indices);
        let test = dataset.select(&split.test_indices);
        info!(train = train.n_samples(), test = test.n_samples(), "Data split");

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&train.features)?;
        let x_test = scaler.transform(&test.features)?;

        let mut models = Vec::with_capacity(ModelKind::ALL.len());
        let mut reports = Vec::with_capacity(ModelKind::ALL.len());

        for kind in ModelKind::ALL {
            let start = Instant::now();
            let (model, hyperparameters) = self.fit_one(kind, &x_train, &train.labels)?;
            let training_time_secs = start.elapsed().as_secs_f64();

            let proba = model.predict_proba(&x_test)?;
            let y_pred = model.predict(&x_test)?;
            let metrics = ModelMetrics::compute_classification(&test.labels, &y_pred, Some(&proba));
            info!(
                model = %kind,
                accuracy = %format!("{:.4}", metrics.accuracy),
                f1 = %format!("{:.4}", metrics.f1_score),
                "Model evaluated on test set"
            );
            debug!(model = %kind, secs = training_time_secs, "Training time");

            reports.push(ModelReport {
                name: kind.artifact_name().to_string(),
                metrics,
                training_time_secs,
                hyperparameters,
            });
            models.push(model);
        }

        let report = TrainingReport {
            created_at: Utc::now(),
            seed: self.split.seed,
            test_fraction: self.split.test_fraction,
            n_train: train.n_samples(),
            n_test: test.n_samples(),
            feature_names: dataset.feature_names.clone(),
            models: reports,
        };

        Ok(TrainingOutput {
            split,
            scaler,
            models,
            x_test_scaled: x_test,
            y_test: test.labels,
            report,
        })
    }

    fn fit_one(
        &self,
        kind: ModelKind,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(TrainedModel, serde_json::Value)> {
        Ok(match kind {
            ModelKind::LogisticRegression => {
                let mut model = LogisticRegression::from_config(self.models.logistic.clone());
                model.fit(x, y)?;
                debug!(iterations = model.n_iter, "Logistic regression converged");
                (
                    TrainedModel::LogisticRegression(model),
                    serde_json::to_value(&self.models.logistic)?,
                )
            }
            ModelKind::RandomForest => {
                let mut model = RandomForest::from_config(self.models.forest.clone());
                model.fit(x, y)?;
                (
                    TrainedModel::RandomForest(model),
                    serde_json::to_value(&self.models.forest)?,
                )
            }
            ModelKind::GradientBoosting => {
                let mut model = GradientBoostingClassifier::new(self.models.boosting.clone());
                model.fit(x, y)?;
                (
                    TrainedModel::GradientBoosting(model),
                    serde_json::to_value(&self.models.boosting)?,
                )
            }
        })
    }

    /// Load the cleaned CSV, train, and write every artifact
    pub fn run(&self) -> Result<TrainingReport> {
        let df = load_csv(&self.paths.cleaned_data)?;
        let dataset = frame_to_dataset(&df, &self.split.target_column)?;
        info!(rows = dataset.n_samples(), features = dataset.n_features(), "Cleaned data loaded");

        let output = self.train(&dataset)?;

        let store = ModelStore::new(&self.paths.models_dir);
        for model in &output.models {
            let path = store.save_model(model)?;
            debug!(path = %path.display(), "Model saved");
        }
        store.save_scaler(&output.scaler)?;

        let mut x_test = matrix_to_frame(&dataset.feature_names, &output.x_test_scaled)?;
        save_csv(&mut x_test, &self.paths.test_features)?;
        let mut y_test = labels_to_frame(&self.split.target_column, &output.y_test)?;
        save_csv(&mut y_test, &self.paths.test_labels)?;

        store.save_json(&output.report, &store.report_path())?;
        info!(dir = %self.paths.models_dir.display(), "Models and scaler saved");

        Ok(output.report)
    }
}
