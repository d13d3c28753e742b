//! Tabular LIME
//!
//! Samples are drawn from a Gaussian fit to a reference matrix, weighted by
//! an exponential kernel on their standardized distance to the explained
//! row, and fit with a weighted ridge surrogate in standardized space.

use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LimeConfig;
use crate::error::{Result, XaiError};
use crate::training::{Classifier, RidgeRegression};

/// Penalty of the ridge fit that ranks candidate features
const SELECTION_ALPHA: f64 = 0.01;

/// Surrogate weight of one selected feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature_index: usize,
    pub feature_name: String,
    /// Value of the feature in the explained row
    pub feature_value: f64,
    pub weight: f64,
}

/// Local surrogate for one instance and one class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimeExplanation {
    pub class_index: usize,
    pub class_name: String,
    pub intercept: f64,
    /// Surrogate output at the explained row
    pub local_prediction: f64,
    /// Classifier probability of `class_index` at the explained row
    pub model_prediction: f64,
    /// Weighted R^2 of the surrogate on the perturbed samples
    pub score: f64,
    /// Selected features, largest `|weight|` first
    pub weights: Vec<FeatureWeight>,
}

impl LimeExplanation {
    /// `(feature name, weight)` pairs in display order
    pub fn as_list(&self) -> Vec<(&str, f64)> {
        self.weights
            .iter()
            .map(|w| (w.feature_name.as_str(), w.weight))
            .collect()
    }
}

/// LIME explainer over a reference distribution
#[derive(Debug, Clone)]
pub struct LimeTabularExplainer {
    feature_names: Vec<String>,
    mean: Array1<f64>,
    /// Per-feature standard deviation, zeros replaced by 1
    scale: Array1<f64>,
    config: LimeConfig,
}

impl LimeTabularExplainer {
    pub fn new(reference: &Array2<f64>, feature_names: Vec<String>, config: LimeConfig) -> Result<Self> {
        if reference.nrows() == 0 {
            return Err(XaiError::ExplainerError("empty reference data".to_string()));
        }
        if feature_names.len() != reference.ncols() {
            return Err(XaiError::ShapeError {
                expected: format!("{} feature names", reference.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        if config.num_samples < 2 {
            return Err(XaiError::ConfigError(
                "LIME needs at least two samples".to_string(),
            ));
        }

        let mean = reference
            .mean_axis(Axis(0))
            .ok_or_else(|| XaiError::ExplainerError("empty reference data".to_string()))?;
        let scale = reference
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 { 1.0 } else { s });

        Ok(Self {
            feature_names,
            mean,
            scale,
            config,
        })
    }

    pub fn kernel_width(&self) -> f64 {
        self.config
            .kernel_width
            .unwrap_or_else(|| 0.75 * (self.mean.len() as f64).sqrt())
    }

    /// Standardized perturbations; row 0 is the instance itself
    fn sample_around(&self, instance: ArrayView1<'_, f64>) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let n_features = self.mean.len();
        let mut z: Array2<f64> = Array2::from_shape_simple_fn((self.config.num_samples, n_features), || {
            StandardNormal.sample(&mut rng)
        });
        let z0 = (&instance - &self.mean) / &self.scale;
        z.row_mut(0).assign(&z0);
        z
    }

    /// Explain `model`'s probability of `class_index` at `instance`
    pub fn explain_instance<C: Classifier + ?Sized>(
        &self,
        instance: ArrayView1<'_, f64>,
        model: &C,
        class_index: usize,
    ) -> Result<LimeExplanation> {
        let n_features = self.mean.len();
        if instance.len() != n_features {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", instance.len()),
            });
        }
        if class_index > 1 {
            return Err(XaiError::ExplainerError(format!(
                "class {} out of range for a binary model",
                class_index
            )));
        }

        let z = self.sample_around(instance);
        let mut samples = &z * &self.scale.view().insert_axis(Axis(0))
            + &self.mean.view().insert_axis(Axis(0));
        // Row 0 must be the exact instance, not a round trip through the scaling
        samples.row_mut(0).assign(&instance);

        let positive = model.predict_proba(&samples)?;
        let labels = if class_index == 1 {
            positive
        } else {
            positive.mapv(|p| 1.0 - p)
        };

        let width = self.kernel_width();
        let z0 = z.row(0).to_owned();
        let weights: Array1<f64> = z
            .rows()
            .into_iter()
            .map(|row| {
                let d2 = (&row - &z0).mapv(|v| v * v).sum();
                (-d2 / (width * width)).exp().sqrt()
            })
            .collect();

        let selected = self.select_features(&z, &labels, &weights)?;
        let z_selected = z.select(Axis(1), &selected);

        let mut surrogate = RidgeRegression::new(self.config.ridge_alpha);
        surrogate.fit_weighted(&z_selected, &labels, &weights)?;
        let score = surrogate.score_weighted(&z_selected, &labels, &weights)?;
        let local_prediction = surrogate.predict(&z_selected.slice(s![0..1, ..]).to_owned())?[0];
        let coefficients = surrogate.coefficients.clone().ok_or(XaiError::ModelNotFitted)?;
        let intercept = surrogate.intercept.unwrap_or(0.0);

        let mut feature_weights: Vec<FeatureWeight> = selected
            .iter()
            .zip(coefficients.iter())
            .map(|(&j, &weight)| FeatureWeight {
                feature_index: j,
                feature_name: self.feature_names[j].clone(),
                feature_value: instance[j],
                weight,
            })
            .collect();
        feature_weights.sort_by(|a, b| {
            b.weight
                .abs()
                .partial_cmp(&a.weight.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            class = class_index,
            score = %format!("{:.4}", score),
            features = feature_weights.len(),
            "LIME surrogate fitted"
        );

        Ok(LimeExplanation {
            class_index,
            class_name: self.config.class_names[class_index].clone(),
            intercept,
            local_prediction,
            model_prediction: labels[0],
            score,
            weights: feature_weights,
        })
    }

    /// Features with the largest `|coef * z0|` under a lightly penalized fit
    fn select_features(
        &self,
        z: &Array2<f64>,
        labels: &Array1<f64>,
        weights: &Array1<f64>,
    ) -> Result<Vec<usize>> {
        let n_features = z.ncols();
        let k = self.config.num_features.min(n_features);
        if k == n_features {
            return Ok((0..n_features).collect());
        }

        let mut ranking_model = RidgeRegression::new(SELECTION_ALPHA);
        ranking_model.fit_weighted(z, labels, weights)?;
        let coefficients = ranking_model.coefficients.as_ref().ok_or(XaiError::ModelNotFitted)?;

        let mut scored: Vec<(usize, f64)> = coefficients
            .iter()
            .zip(z.row(0).iter())
            .map(|(c, v)| (c * v).abs())
            .enumerate()
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected: Vec<usize> = scored.into_iter().take(k).map(|(j, _)| j).collect();
        selected.sort_unstable();
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Probability driven by feature 0 only
    struct StepModel;

    impl Classifier for StepModel {
        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(x.column(0).mapv(|v| 1.0 / (1.0 + (-3.0 * v).exp())))
        }
    }

    fn reference() -> Array2<f64> {
        Array2::from_shape_fn((30, 4), |(i, j)| ((i * (j + 3)) % 7) as f64 - 3.0)
    }

    fn names() -> Vec<String> {
        vec!["age".into(), "chol".into(), "thalach".into(), "oldpeak".into()]
    }

    fn config(num_samples: usize, num_features: usize) -> LimeConfig {
        LimeConfig {
            num_samples,
            num_features,
            ..LimeConfig::default()
        }
    }

    #[test]
    fn test_informative_feature_dominates() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(2000, 4)).unwrap();
        let exp = explainer.explain_instance(array![0.2, 1.0, -1.0, 0.0].view(), &StepModel, 1).unwrap();

        assert_eq!(exp.weights.len(), 4);
        assert_eq!(exp.weights[0].feature_name, "age");
        assert!(exp.weights[0].weight > 0.0);
        assert_eq!(exp.class_name, "High Risk");
        assert!(exp.score > 0.3);
    }

    #[test]
    fn test_negative_class_flips_sign() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(1000, 2)).unwrap();
        let instance = array![0.5, 0.0, 0.0, 0.0];
        let high = explainer.explain_instance(instance.view(), &StepModel, 1).unwrap();
        let low = explainer.explain_instance(instance.view(), &StepModel, 0).unwrap();

        assert_eq!(low.class_name, "Low Risk");
        assert!((high.model_prediction + low.model_prediction - 1.0).abs() < 1e-12);
        assert!((high.weights[0].weight + low.weights[0].weight).abs() < 1e-9);
    }

    #[test]
    fn test_top_k_and_seeded() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(500, 2)).unwrap();
        let instance = array![1.0, 2.0, 0.0, -1.0];
        let a = explainer.explain_instance(instance.view(), &StepModel, 1).unwrap();
        let b = explainer.explain_instance(instance.view(), &StepModel, 1).unwrap();

        assert_eq!(a.weights.len(), 2);
        assert_eq!(a.as_list(), b.as_list());
        assert!(a.weights.iter().any(|w| w.feature_index == 0));
    }

    #[test]
    fn test_weights_name_continuous_features() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(500, 4)).unwrap();
        let instance = array![0.37, 1.25, -2.5, 0.0];
        let exp = explainer.explain_instance(instance.view(), &StepModel, 1).unwrap();

        // No binning: each weight is named by its column and keeps the raw value
        for w in &exp.weights {
            assert_eq!(w.feature_name, names()[w.feature_index]);
            assert_eq!(w.feature_value, instance[w.feature_index]);
        }
    }

    #[test]
    fn test_default_kernel_width() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(10, 4)).unwrap();
        assert!((explainer.kernel_width() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let explainer = LimeTabularExplainer::new(&reference(), names(), config(10, 4)).unwrap();
        assert!(explainer.explain_instance(array![1.0].view(), &StepModel, 1).is_err());
        assert!(explainer.explain_instance(array![0.0, 0.0, 0.0, 0.0].view(), &StepModel, 2).is_err());
    }
}
