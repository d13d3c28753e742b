//! Exact path-dependent TreeSHAP
//!
//! Polynomial-time Shapley values for tree ensembles (Lundberg et al.,
//! "Consistent Individualized Feature Attribution for Tree Ensembles",
//! Algorithm 2). Missing features follow the training covers stored in each
//! node, so no background dataset is needed.
//!
//! For an ensemble `f(x) = offset + sum_t w_t * tree_t(x)` the attributions
//! satisfy `sum_j phi_j(x) = f(x) - (offset + sum_t w_t * E[tree_t])`.

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use super::{default_feature_names, ClassAttributions, Explainer, OutputSpace};
use crate::error::{Result, XaiError};
use crate::training::{DecisionTree, GradientBoostingClassifier, RandomForest, TrainedModel, TreeNode};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Grow the unique feature path by one split
fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension made for `path[index]` and drop it
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one);
            next_one_portion = tmp - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with `path[index]` unwound
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += path[i].pweight / zero / ((depth - i) as f64 / denom);
        }
    }

    total
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    node: &TreeNode,
    x: ArrayView1<'_, f64>,
    phi: &mut [f64],
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
    scale: f64,
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match node {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                let el = path[i];
                if let Some(f) = el.feature {
                    let w = unwound_path_sum(&path, i);
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value * scale;
                }
            }
        }
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            ..
        } => {
            let (hot, cold) = if x[*feature_idx] <= *threshold {
                (left.as_ref(), right.as_ref())
            } else {
                (right.as_ref(), left.as_ref())
            };
            let cover = (*n_samples).max(1) as f64;
            let hot_zero = hot.n_samples() as f64 / cover;
            let cold_zero = cold.n_samples() as f64 / cover;

            // A feature already on the path is split again: merge instead of duplicating
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*feature_idx)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(hot, x, phi, &path, hot_zero * incoming_zero, incoming_one, Some(*feature_idx), scale);
            recurse(cold, x, phi, &path, cold_zero * incoming_zero, 0.0, Some(*feature_idx), scale);
        }
    }
}

/// Attributions of one tree for one row, scaled by `weight`
fn tree_shap(root: &TreeNode, x: ArrayView1<'_, f64>, phi: &mut [f64], weight: f64) {
    recurse(root, x, phi, &[], 1.0, 1.0, None, weight);
}

/// TreeSHAP over a weighted ensemble of fitted trees
#[derive(Debug, Clone)]
pub struct TreeExplainer<'a> {
    trees: Vec<(&'a TreeNode, f64)>,
    offset: f64,
    n_features: usize,
    output_space: OutputSpace,
    feature_names: Option<Vec<String>>,
}

impl<'a> TreeExplainer<'a> {
    fn from_trees(
        trees: &'a [DecisionTree],
        weight: f64,
        offset: f64,
        n_features: usize,
        output_space: OutputSpace,
    ) -> Result<Self> {
        let trees = trees
            .iter()
            .map(|t| t.root().map(|r| (r, weight)).ok_or(XaiError::ModelNotFitted))
            .collect::<Result<Vec<_>>>()?;
        if trees.is_empty() {
            return Err(XaiError::ModelNotFitted);
        }
        Ok(Self {
            trees,
            offset,
            n_features,
            output_space,
            feature_names: None,
        })
    }

    /// Single tree; attributions explain its leaf value
    pub fn for_tree(tree: &'a DecisionTree) -> Result<Self> {
        Self::from_trees(std::slice::from_ref(tree), 1.0, 0.0, tree.n_features(), OutputSpace::Probability)
    }

    /// Forest averaged in probability space
    pub fn for_forest(forest: &'a RandomForest) -> Result<Self> {
        let weight = 1.0 / forest.n_trees().max(1) as f64;
        Self::from_trees(forest.trees(), weight, 0.0, forest.n_features(), OutputSpace::Probability)
    }

    /// Boosted ensemble in log-odds space
    pub fn for_boosting(model: &'a GradientBoostingClassifier) -> Result<Self> {
        Self::from_trees(
            model.trees(),
            model.learning_rate(),
            model.initial_log_odds(),
            model.n_features(),
            OutputSpace::LogOdds,
        )
    }

    /// Any tree-based artifact
    pub fn for_model(model: &'a TrainedModel) -> Result<Self> {
        match model {
            TrainedModel::RandomForest(m) => Self::for_forest(m),
            TrainedModel::GradientBoosting(m) => Self::for_boosting(m),
            TrainedModel::LogisticRegression(_) => Err(XaiError::ExplainerError(
                "TreeSHAP needs a tree-based model".to_string(),
            )),
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Expected ensemble output under the training covers
    pub fn expected_value(&self) -> f64 {
        self.offset
            + self
                .trees
                .iter()
                .map(|(root, w)| w * root.expected_value())
                .sum::<f64>()
    }

    /// Positive-class attributions, one row per input row
    pub fn shap_values(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let mut phi = vec![0.0; self.n_features];
                for (root, weight) in &self.trees {
                    tree_shap(root, x.row(i), &mut phi, *weight);
                }
                phi
            })
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), self.n_features), flat)?)
    }
}

impl Explainer for TreeExplainer<'_> {
    fn explain(&self, x: &Array2<f64>) -> Result<ClassAttributions> {
        let values = self.shap_values(x)?;
        let names = self
            .feature_names
            .clone()
            .unwrap_or_else(|| default_feature_names(self.n_features));
        ClassAttributions::from_positive_class(values, self.expected_value(), x.clone(), names, self.output_space)
    }

    fn output_space(&self) -> OutputSpace {
        self.output_space
    }
}
