//! Held-out evaluation metrics for binary classifiers

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for model evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelMetrics {
    pub accuracy: f64,
    /// Precision of the positive class
    pub precision: f64,
    /// Recall of the positive class
    pub recall: f64,
    pub f1_score: f64,
    /// Mean binary cross-entropy, if probabilities were supplied
    pub log_loss: Option<f64>,
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute classification metrics from {0, 1} labels and predictions
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: Option<&Array1<f64>>,
    ) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::default();
        }

        let (tp, fp, tn, fn_) = Self::confusion_counts(y_true, y_pred);

        let accuracy = (tp + tn) as f64 / n_samples as f64;
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let log_loss = y_prob.map(|prob| {
            let eps = 1e-15;
            y_true
                .iter()
                .zip(prob.iter())
                .map(|(&t, &p)| {
                    let p = p.clamp(eps, 1.0 - eps);
                    -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
                })
                .sum::<f64>()
                / n_samples as f64
        });

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            log_loss,
            n_samples,
        }
    }

    fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred, None);

        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert!((metrics.precision - 0.75).abs() < 1e-12);
        assert!((metrics.recall - 0.75).abs() < 1e-12);
        assert!(metrics.log_loss.is_none());
    }

    #[test]
    fn test_log_loss() {
        let y_true = array![1.0, 0.0];
        let y_pred = array![1.0, 0.0];
        let y_prob = array![0.5, 0.5];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred, Some(&y_prob));
        assert!((metrics.log_loss.unwrap() - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
