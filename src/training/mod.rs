//! Model training module
//!
//! Native binary classifiers used by the pipeline:
//! - L2 logistic regression (batch gradient descent)
//! - Random forest of Gini trees
//! - Log-loss gradient boosting over regression trees
//!
//! The [`Trainer`] stage splits the cleaned table, scales it, fits every
//! variant and persists the artifacts the explanation stages consume.

pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
mod trainer;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::{LogisticConfig, LogisticRegression, RidgeRegression};
pub use metrics::ModelMetrics;
pub use random_forest::{ForestConfig, MaxFeatures, RandomForest};
pub use trainer::{ModelReport, Trainer, TrainingOutput, TrainingReport};

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classifier over dense feature rows
pub trait Classifier {
    /// Probability of class 1 for every row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard labels; a probability of exactly 0.5 maps to class 0
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }

    /// Fraction of rows whose predicted label matches `y`
    fn accuracy(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        if y.is_empty() {
            return Ok(0.0);
        }
        let correct = y_pred
            .iter()
            .zip(y.iter())
            .filter(|(pred, actual)| (*pred - *actual).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

/// The fixed set of classifier variants the pipeline trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::LogisticRegression,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
    ];

    /// Artifact key; the model is stored as `<name>.bin`
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic_Regression",
            ModelKind::RandomForest => "Random_Forest",
            ModelKind::GradientBoosting => "Gradient_Boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.artifact_name())
    }
}

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }
}

impl Classifier for TrainedModel {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LogisticRegression(m) => m.predict_proba(x),
            TrainedModel::RandomForest(m) => m.predict_proba(x),
            TrainedModel::GradientBoosting(m) => m.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_artifact_names() {
        let names: Vec<&str> = ModelKind::ALL.iter().map(|k| k.artifact_name()).collect();
        assert_eq!(names, vec!["Logistic_Regression", "Random_Forest", "Gradient_Boosting"]);
    }

    #[test]
    fn test_trained_model_delegates() {
        let x = array![[0.0], [1.0], [4.0], [5.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut lr = LogisticRegression::new().with_learning_rate(0.5);
        lr.fit(&x, &y).unwrap();
        let direct = lr.predict_proba(&x).unwrap();

        let model = TrainedModel::LogisticRegression(lr);
        assert_eq!(model.kind(), ModelKind::LogisticRegression);
        assert_eq!(model.predict_proba(&x).unwrap(), direct);
        assert_eq!(model.accuracy(&x, &y).unwrap(), 1.0);
    }
}
