//! Gradient Boosting implementation
//!
//! Binary log-loss boosting with shallow regression trees fitted to the
//! negative gradient. The ensemble output is a log-odds score:
//! `initial_log_odds + learning_rate * sum(tree(x))`.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::Classifier;
use crate::error::{Result, XaiError};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

#[inline]
pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
    feature_importances: Vec<f64>,
    n_features: usize,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            feature_importances: Vec::new(),
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit binary classification on {0, 1} labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(XaiError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(XaiError::TrainingError("no training samples".to_string()));
        }

        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        self.n_features = n_features;
        self.trees.clear();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            // Negative gradient of log loss
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - sigmoid(lo))
                .collect();

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let y_sub: Array1<f64> = sample_indices.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(rng.next_u64());
            tree.fit(&x_sub, &y_sub)?;

            // Every row moves, including the ones left out of this round's sample
            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);

            if let Some(tree_importance) = tree.feature_importances() {
                for (total, &imp) in self.feature_importances.iter_mut().zip(tree_importance.iter()) {
                    *total += imp;
                }
            }

            self.trees.push(tree);
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        Ok(self)
    }

    /// Raw ensemble score in log-odds space
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(XaiError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);
        }
        Ok(log_odds)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn initial_log_odds(&self) -> f64 {
        self.initial_log_odds
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * self.config.subsample).ceil() as usize).clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        if sample_size < n {
            indices.shuffle(rng);
            indices.truncate(sample_size);
            indices.sort();
        }
        indices
    }
}

impl Classifier for GradientBoostingClassifier {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}
