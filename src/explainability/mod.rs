//! Model explainability module
//!
//! Post-hoc attribution methods for the trained classifiers:
//! - Exact path-dependent TreeSHAP for forests and boosted trees
//! - Closed-form linear SHAP for logistic models
//! - Tabular LIME with a weighted ridge surrogate
//!
//! Every SHAP explainer returns the same [`ClassAttributions`] tensor so
//! downstream code never branches on the model family.

mod lime;
mod linear;
mod local_explanations;
mod report;
mod tree_shap;

pub use lime::{FeatureWeight, LimeExplanation, LimeTabularExplainer};
pub use linear::LinearExplainer;
pub use local_explanations::{AttributionSummary, FeatureContribution, LocalExplanation};
pub use report::{AttributionReporter, LimeReport, ShapReport};
pub use tree_shap::TreeExplainer;

use crate::error::{Result, XaiError};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Index of the positive class (label 1)
pub const POSITIVE_CLASS: usize = 1;

/// Scale in which attributions add up to the model output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSpace {
    /// Probability of the class
    Probability,
    /// Logit of the class probability
    LogOdds,
}

/// Per-class attributions of a batch of instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAttributions {
    /// `(instances, features, classes)`
    pub values: Array3<f64>,
    /// Expected model output per class
    pub base_values: Vec<f64>,
    pub feature_names: Vec<String>,
    /// The explained rows, in input order
    pub data: Array2<f64>,
    pub output_space: OutputSpace,
}

impl ClassAttributions {
    /// Build the two-class tensor from positive-class attributions.
    ///
    /// Class 0 mirrors class 1: its attributions are negated and its base is
    /// `1 - base` in probability space or `-base` in log-odds space.
    pub fn from_positive_class(
        positive: Array2<f64>,
        base_value: f64,
        data: Array2<f64>,
        feature_names: Vec<String>,
        output_space: OutputSpace,
    ) -> Result<Self> {
        if positive.dim() != data.dim() {
            return Err(XaiError::ShapeError {
                expected: format!("{:?}", data.dim()),
                actual: format!("{:?}", positive.dim()),
            });
        }
        if feature_names.len() != data.ncols() {
            return Err(XaiError::ShapeError {
                expected: format!("{} feature names", data.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let (n, f) = positive.dim();
        let mut values = Array3::zeros((n, f, 2));
        values.slice_mut(s![.., .., 0]).assign(&positive.mapv(|v| -v));
        values.slice_mut(s![.., .., 1]).assign(&positive);

        let negative_base = match output_space {
            OutputSpace::Probability => 1.0 - base_value,
            OutputSpace::LogOdds => -base_value,
        };

        Ok(Self {
            values,
            base_values: vec![negative_base, base_value],
            feature_names,
            data,
            output_space,
        })
    }

    pub fn n_instances(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    pub fn n_features(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    pub fn n_classes(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// `(instances, features)` attributions of one class
    pub fn class_values(&self, class: usize) -> Result<ArrayView2<'_, f64>> {
        self.check_class(class)?;
        Ok(self.values.index_axis(Axis(2), class))
    }

    /// Attributions of the positive class
    pub fn positive(&self) -> ArrayView2<'_, f64> {
        self.values.index_axis(Axis(2), POSITIVE_CLASS)
    }

    /// Attribution vector of one instance for one class
    pub fn instance_values(&self, instance: usize, class: usize) -> Result<ArrayView1<'_, f64>> {
        self.check_instance(instance)?;
        Ok(self.class_values(class)?.index_axis_move(Axis(0), instance))
    }

    /// Model output implied by additivity, per instance
    pub fn outputs(&self, class: usize) -> Result<Array1<f64>> {
        let values = self.class_values(class)?;
        Ok(values.sum_axis(Axis(1)) + self.base_values[class])
    }

    /// Single-instance explanation for one class
    pub fn local(&self, instance: usize, class: usize) -> Result<LocalExplanation> {
        let values = self.instance_values(instance, class)?;
        let contributions = values
            .iter()
            .enumerate()
            .map(|(j, &contribution)| FeatureContribution {
                feature_index: j,
                feature_name: self.feature_names[j].clone(),
                feature_value: self.data[[instance, j]],
                contribution,
            })
            .collect();

        let base_value = self.base_values[class];
        Ok(LocalExplanation {
            instance_index: instance,
            base_value,
            prediction: base_value + values.sum(),
            contributions,
        })
    }

    /// Global statistics for one class
    pub fn summary(&self, class: usize) -> Result<AttributionSummary> {
        Ok(AttributionSummary::from_values(
            &self.class_values(class)?,
            self.feature_names.clone(),
        ))
    }

    fn check_class(&self, class: usize) -> Result<()> {
        if class >= self.n_classes() {
            return Err(XaiError::ExplainerError(format!(
                "class {} out of range for {} classes",
                class,
                self.n_classes()
            )));
        }
        Ok(())
    }

    fn check_instance(&self, instance: usize) -> Result<()> {
        if instance >= self.n_instances() {
            return Err(XaiError::ExplainerError(format!(
                "instance {} out of range for {} explained rows",
                instance,
                self.n_instances()
            )));
        }
        Ok(())
    }
}

/// Attribution method that explains every row of a feature matrix
pub trait Explainer {
    fn explain(&self, x: &Array2<f64>) -> Result<ClassAttributions>;

    fn output_space(&self) -> OutputSpace;

    /// Explain a single row
    fn explain_row(&self, row: ArrayView1<'_, f64>) -> Result<ClassAttributions> {
        self.explain(&row.to_owned().insert_axis(Axis(0)))
    }
}

/// Generated names `feature_0 ..` for explainers built without a header
pub(crate) fn default_feature_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("feature_{}", i)).collect()
}
