//! Closed-form SHAP for linear models
//!
//! With independent features the Shapley value of a linear score is
//! `w_j * (x_j - E[x_j])`, so no sampling is involved.

use ndarray::{Array1, Array2, Axis};

use super::{default_feature_names, ClassAttributions, Explainer, OutputSpace};
use crate::error::{Result, XaiError};
use crate::training::LogisticRegression;

/// Linear SHAP against a background mean
#[derive(Debug, Clone)]
pub struct LinearExplainer {
    coefficients: Array1<f64>,
    intercept: f64,
    /// Per-feature mean of the background data
    background_mean: Array1<f64>,
    feature_names: Option<Vec<String>>,
}

impl LinearExplainer {
    pub fn new(coefficients: Array1<f64>, intercept: f64, background: &Array2<f64>) -> Result<Self> {
        if background.ncols() != coefficients.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", background.ncols()),
            });
        }
        let background_mean = background
            .mean_axis(Axis(0))
            .ok_or_else(|| XaiError::ExplainerError("empty background data".to_string()))?;

        Ok(Self {
            coefficients,
            intercept,
            background_mean,
            feature_names: None,
        })
    }

    /// Explain the decision function of a fitted logistic model
    pub fn for_logistic(model: &LogisticRegression, background: &Array2<f64>) -> Result<Self> {
        let coefficients = model.coefficients.clone().ok_or(XaiError::ModelNotFitted)?;
        Self::new(coefficients, model.intercept.unwrap_or(0.0), background)
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn background_mean(&self) -> &Array1<f64> {
        &self.background_mean
    }

    /// Linear score at the background mean
    pub fn expected_value(&self) -> f64 {
        self.intercept + self.coefficients.dot(&self.background_mean)
    }

    pub fn shap_values(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", self.coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let centered = x - &self.background_mean.view().insert_axis(Axis(0));
        Ok(centered * &self.coefficients.view().insert_axis(Axis(0)))
    }
}

impl Explainer for LinearExplainer {
    fn explain(&self, x: &Array2<f64>) -> Result<ClassAttributions> {
        let values = self.shap_values(x)?;
        let names = self
            .feature_names
            .clone()
            .unwrap_or_else(|| default_feature_names(self.coefficients.len()));
        ClassAttributions::from_positive_class(
            values,
            self.expected_value(),
            x.clone(),
            names,
            OutputSpace::LogOdds,
        )
    }

    fn output_space(&self) -> OutputSpace {
        OutputSpace::LogOdds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainability::POSITIVE_CLASS;
    use ndarray::array;

    #[test]
    fn test_matches_closed_form() {
        let background = array![[0.0, 1.0], [2.0, 3.0]];
        let explainer = LinearExplainer::new(array![0.5, -2.0], 0.25, &background).unwrap();

        let phi = explainer.shap_values(&array![[3.0, 0.0]]).unwrap();
        // means are [1, 2]
        assert_eq!(phi[[0, 0]], 0.5 * (3.0 - 1.0));
        assert_eq!(phi[[0, 1]], -2.0 * (0.0 - 2.0));
        assert_eq!(explainer.expected_value(), 0.25 + 0.5 - 4.0);
    }

    #[test]
    fn test_additivity_on_logistic() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [3.0, 1.0], [4.0, 0.5], [5.0, 2.0], [0.5, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        let attributions = LinearExplainer::for_logistic(&model, &x).unwrap().explain(&x).unwrap();
        let scores = model.decision_function(&x).unwrap();
        let outputs = attributions.outputs(POSITIVE_CLASS).unwrap();
        for (a, b) in outputs.iter().zip(scores.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(attributions.output_space, OutputSpace::LogOdds);
    }

    #[test]
    fn test_unfitted_model() {
        let err = LinearExplainer::for_logistic(&LogisticRegression::new(), &array![[1.0]]).unwrap_err();
        assert!(matches!(err, XaiError::ModelNotFitted));
    }
}
