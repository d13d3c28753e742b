//! Local explanations and global attribution summaries

use ndarray::{ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Feature contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    /// Feature index
    pub feature_index: usize,
    pub feature_name: String,
    /// Feature value for this instance
    pub feature_value: f64,
    /// Contribution to prediction (SHAP value)
    pub contribution: f64,
}

/// Local explanation for a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    /// Instance index
    pub instance_index: usize,
    /// Base value (expected prediction)
    pub base_value: f64,
    /// Model output, equal to `base_value + sum(contributions)`
    pub prediction: f64,
    /// Feature contributions
    pub contributions: Vec<FeatureContribution>,
}

impl LocalExplanation {
    /// Get sum of contributions
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Get sorted contributions (by absolute value, descending)
    pub fn sorted_contributions(&self) -> Vec<&FeatureContribution> {
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Get top k contributors
    pub fn top_k_contributors(&self, k: usize) -> Vec<&FeatureContribution> {
        self.sorted_contributions().into_iter().take(k).collect()
    }

    /// Feature with the largest absolute contribution
    pub fn dominant_feature(&self) -> Option<&FeatureContribution> {
        self.sorted_contributions().into_iter().next()
    }
}

/// Summary of attributions across many instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub feature_names: Vec<String>,
    /// Mean absolute SHAP values per feature
    pub mean_abs_shap: Vec<f64>,
    /// Mean SHAP values per feature
    pub mean_shap: Vec<f64>,
    /// Standard deviation of SHAP values per feature
    pub std_shap: Vec<f64>,
    /// Min SHAP values per feature
    pub min_shap: Vec<f64>,
    /// Max SHAP values per feature
    pub max_shap: Vec<f64>,
}

impl AttributionSummary {
    /// Column statistics of an `(instances, features)` attribution matrix
    pub fn from_values(values: &ArrayView2<'_, f64>, feature_names: Vec<String>) -> Self {
        let columns = values.axis_iter(Axis(1));
        let n_instances = values.nrows();

        let mut summary = Self {
            feature_names,
            mean_abs_shap: Vec::with_capacity(values.ncols()),
            mean_shap: Vec::with_capacity(values.ncols()),
            std_shap: Vec::with_capacity(values.ncols()),
            min_shap: Vec::with_capacity(values.ncols()),
            max_shap: Vec::with_capacity(values.ncols()),
        };

        for col in columns {
            if n_instances == 0 {
                summary.mean_abs_shap.push(0.0);
                summary.mean_shap.push(0.0);
                summary.std_shap.push(0.0);
                summary.min_shap.push(0.0);
                summary.max_shap.push(0.0);
                continue;
            }
            summary.mean_abs_shap.push(col.mapv(f64::abs).mean().unwrap_or(0.0));
            summary.mean_shap.push(col.mean().unwrap_or(0.0));
            summary.std_shap.push(col.std(0.0));
            summary.min_shap.push(col.fold(f64::INFINITY, |a, &b| a.min(b)));
            summary.max_shap.push(col.fold(f64::NEG_INFINITY, |a, &b| a.max(b)));
        }

        summary
    }

    /// Get feature ranking by mean absolute SHAP
    pub fn feature_ranking(&self) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.mean_abs_shap.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed
    }

    /// Names of the `k` most important features, most important first
    pub fn top_features(&self, k: usize) -> Vec<&str> {
        self.feature_ranking()
            .into_iter()
            .take(k)
            .map(|(i, _)| self.feature_names[i].as_str())
            .collect()
    }
}
