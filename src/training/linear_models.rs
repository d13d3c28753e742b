//! Linear model implementations

use super::gradient_boosting::sigmoid;
use super::Classifier;
use crate::error::{Result, XaiError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// A tiny diagonal ridge is added once when the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    cholesky_factor(a)
        .or_else(|| {
            let mut a_reg = a.clone();
            let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
            for k in 0..n {
                a_reg[[k, k]] += ridge;
            }
            cholesky_factor(&a_reg)
        })
        .map(|l| {
            // Forward substitution: L * y = b
            let mut y = Array1::zeros(n);
            for i in 0..n {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += l[[i, j]] * y[j];
                }
                y[i] = (b[i] - sum) / l[[i, i]];
            }

            // Backward substitution: L^T * x = y
            let mut x = Array1::zeros(n);
            for i in (0..n).rev() {
                let mut sum = 0.0;
                for j in (i + 1)..n {
                    sum += l[[j, i]] * x[j];
                }
                x[i] = (y[i] - sum) / l[[i, i]];
            }
            x
        })
}

/// Lower-triangular factor `L` with `A = L * L^T`
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Logistic regression hyperparameters
///
/// `c` is the inverse regularization strength: the penalty applied during
/// gradient descent is `||w||^2 / (2 * c * n_samples)` on top of the mean log loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    pub c: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Gradient-norm convergence tolerance
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

/// Logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    pub config: LogisticConfig,
    /// Iterations actually run by the last fit
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self::from_config(LogisticConfig::default())
    }

    pub fn from_config(config: LogisticConfig) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            config,
            n_iter: 0,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.config.learning_rate = lr;
        self
    }

    /// Fit the model using gradient descent
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
        if self.config.c <= 0.0 {
            return Err(XaiError::ConfigError(format!(
                "inverse regularization must be positive, got {}",
                self.config.c
            )));
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let alpha = 1.0 / (self.config.c * n_samples as f64);
        // Damped step; the penalty term alone contracts for any C
        let lr = self.config.learning_rate / (1.0 + self.config.learning_rate * alpha);
        self.n_iter = 0;

        for _ in 0..self.config.max_iter {
            self.n_iter += 1;
            let predictions = (x.dot(&weights) + bias).mapv(sigmoid);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.config.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;

            if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
                return Err(XaiError::TrainingError(format!(
                    "logistic regression diverged after {} iterations",
                    self.n_iter
                )));
            }
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);

        Ok(self)
    }

    /// Linear score `x . w + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(XaiError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let weights = Array1::ones(x.nrows());
        self.fit_weighted(x, y, &weights)
    }

    /// Minimize `sum_i w_i (y_i - x_i . b - b0)^2 + alpha ||b||^2`
    pub fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() || n_samples != sample_weight.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} targets and weights", n_samples),
                actual: format!("{} targets, {} weights", y.len(), sample_weight.len()),
            });
        }

        let total_weight = sample_weight.sum();
        if total_weight <= 0.0 {
            return Err(XaiError::TrainingError(
                "sample weights sum to zero".to_string(),
            ));
        }

        // Weighted centering absorbs the intercept
        let w_col = sample_weight.view().insert_axis(Axis(1));
        let x_mean = (&x.view() * &w_col).sum_axis(Axis(0)) / total_weight;
        let y_mean = sample_weight.dot(y) / total_weight;

        let x_c = x - &x_mean.view().insert_axis(Axis(0));
        let y_c = y - y_mean;
        let xw = &x_c * &w_col;

        let mut xtwx = xw.t().dot(&x_c);
        for i in 0..n_features {
            xtwx[[i, i]] += self.alpha;
        }
        let xtwy = xw.t().dot(&y_c);

        let coefficients = cholesky_solve(&xtwx, &xtwy)
            .ok_or_else(|| XaiError::TrainingError("Singular matrix".to_string()))?;

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(XaiError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Weighted coefficient of determination
    pub fn score_weighted(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
    ) -> Result<f64> {
        let p = self.predict(x)?;
        let total_weight = sample_weight.sum();
        let ym = sample_weight.dot(y) / total_weight;
        let ss_res = sample_weight.dot(&(&p - y).mapv(|v| v * v));
        let ss_tot = sample_weight.dot(&y.mapv(|v| (v - ym).powi(2)));
        Ok(if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert!((back[0] - 2.0).abs() < 1e-10);
        assert!((back[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_logistic_regression() {
        let x = array![
            [1.0, 1.0],
            [1.5, 1.5],
            [2.0, 2.0],
            [5.0, 5.0],
            [5.5, 5.5],
            [6.0, 6.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new()
            .with_max_iter(1000)
            .with_learning_rate(0.5);

        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());

        let accuracy = model.accuracy(&x, &y).unwrap();
        assert!(accuracy >= 0.8, "Accuracy should be >= 0.8, got {}", accuracy);
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [10.0, 10.0]];
        let y = array![0.0, 1.0];

        let mut model = LogisticRegression::new().with_max_iter(500);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[1] > 0.5);
    }

    #[test]
    fn test_stronger_penalty_shrinks_weights() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut loose = LogisticRegression::new().with_c(100.0);
        let mut tight = LogisticRegression::new().with_c(0.01);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let w_loose = loose.coefficients.as_ref().unwrap()[0];
        let w_tight = tight.coefficients.as_ref().unwrap()[0];
        assert!(w_loose > w_tight && w_tight > 0.0);
    }

    #[test]
    fn test_weights_shrink_monotonically_with_penalty() {
        let x = array![[-1.0], [-0.5], [0.5], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let weights: Vec<f64> = [100.0, 1.0, 0.1, 0.05, 0.01, 0.001]
            .iter()
            .map(|&c| {
                let mut model = LogisticRegression::new().with_c(c);
                model.fit(&x, &y).unwrap();
                model.coefficients.unwrap()[0]
            })
            .collect();

        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1], "{:?}", weights);
        }
        assert!(weights.iter().all(|w| w.is_finite() && *w > 0.0));
    }

    #[test]
    fn test_non_finite_input_is_a_training_error() {
        let x = array![[0.0], [f64::NAN], [1.0]];
        let y = array![0.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        let err = model.fit(&x, &y).unwrap_err();
        assert!(matches!(err, XaiError::TrainingError(_)));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let mut model = LogisticRegression::new().with_c(0.0);
        let err = model.fit(&array![[1.0]], &array![1.0]).unwrap_err();
        assert!(matches!(err, XaiError::ConfigError(_)));
    }

    #[test]
    fn test_ridge_regression() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let mut model = RidgeRegression::new(0.1);
        model.fit(&x, &y).unwrap();
        let r2 = model.score_weighted(&x, &y, &Array1::ones(4)).unwrap();
        assert!(r2 > 0.95, "Ridge R² = {}", r2);
    }

    #[test]
    fn test_weighted_ridge_ignores_zero_weight_rows() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 100.0];
        let w = array![1.0, 1.0, 1.0, 0.0];

        let mut model = RidgeRegression::new(1e-9);
        model.fit_weighted(&x, &y, &w).unwrap();

        let coef = model.coefficients.as_ref().unwrap()[0];
        assert!((coef - 2.0).abs() < 1e-6);
        assert!((model.intercept.unwrap() - 1.0).abs() < 1e-6);
    }
}
