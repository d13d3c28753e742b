//! Decision tree implementation
//!
//! CART trees over dense `f64` features. Classification trees are grown on
//! {0, 1} targets with Gini impurity and store the positive-class fraction in
//! every leaf, so a leaf value is directly a probability. Regression trees
//! (used by gradient boosting) store the mean target.
//!
//! Every node records the number of training samples that reached it. TreeSHAP
//! relies on those covers to weight the paths not taken.

use crate::error::{Result, XaiError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    /// Training samples that reached this node
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    /// Cover-weighted mean of the leaf values below this node
    pub fn expected_value(&self) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { left, right, n_samples, .. } => {
                let n = (*n_samples).max(1) as f64;
                (left.n_samples() as f64 * left.expected_value()
                    + right.n_samples() as f64 * right.expected_value())
                    / n
            }
        }
    }
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity over {0, 1} labels
    Gini,
    /// Mean squared error (regression)
    MSE,
}

/// Running sums for one side of a candidate split
#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn minus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                let p = self.sum / n;
                2.0 * p * (1.0 - p)
            }
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitChoice {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-node feature sampling
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 0,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set features examined per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set seed for feature sampling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(XaiError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(XaiError::TrainingError(
                "cannot grow a tree on an empty matrix".to_string(),
            ));
        }
        if self.criterion == Criterion::Gini && y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(XaiError::ValidationError(
                "classification trees expect labels in {0, 1}".to_string(),
            ));
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let stats = Self::stats_of(y, indices);
        let n_samples = indices.len();
        let value = stats.sum / n_samples as f64;
        let impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 1e-12;

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let candidates = self.candidate_features(rng);
        let Some(best) = self.find_best_split(x, y, indices, &candidates, impurity) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return TreeNode::Leaf { value, n_samples };
        }

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    fn stats_of(y: &Array1<f64>, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::default();
        for &i in indices {
            stats.push(y[i]);
        }
        stats
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let k = self.max_features.unwrap_or(self.n_features).min(self.n_features);
        if k >= self.n_features {
            return (0..self.n_features).collect();
        }
        let mut features = index::sample(rng, self.n_features, k).into_vec();
        features.sort_unstable();
        features
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        candidates: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitChoice> {
        // Each candidate feature is scanned independently; the ordered collect
        // keeps tie-breaking independent of thread scheduling.
        let per_feature: Vec<Option<SplitChoice>> = candidates
            .par_iter()
            .map(|&feature_idx| self.best_split_for_feature(x, y, indices, feature_idx, parent_impurity))
            .collect();

        let mut best: Option<SplitChoice> = None;
        for choice in per_feature.into_iter().flatten() {
            if best.map_or(true, |b| choice.gain > b.gain) {
                best = Some(choice);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<SplitChoice> {
        let mut ordered: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i]))
            .collect();
        ordered.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = ordered.len();
        let mut total = NodeStats::default();
        for &(_, yi) in &ordered {
            total.push(yi);
        }

        let mut left = NodeStats::default();
        let mut best: Option<SplitChoice> = None;

        for k in 0..n.saturating_sub(1) {
            left.push(ordered[k].1);
            let (current, next) = (ordered[k].0, ordered[k + 1].0);
            if current == next {
                continue;
            }
            let right = total.minus(&left);
            if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                continue;
            }

            let weighted = (left.count as f64 * left.impurity(self.criterion)
                + right.count as f64 * right.impurity(self.criterion))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitChoice {
                    feature_idx,
                    threshold: (current + next) / 2.0,
                    gain,
                });
            }
        }

        best
    }

    /// Predict leaf values (positive-class probability for classifier trees)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(XaiError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_row(root, row)).collect())
    }

    fn predict_row(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_row(left, sample)
                } else {
                    Self::predict_row(right, sample)
                }
            }
        }
    }

    /// Root node of a fitted tree
    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separates_classes() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict(&x).unwrap();
        assert_eq!(proba, array![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_leaf_values_are_probabilities() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let y = array![0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict(&array![[0.0]]).unwrap();
        assert!((proba[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_covers_add_up() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        fn check(node: &TreeNode) {
            if let TreeNode::Split { left, right, n_samples, .. } = node {
                assert_eq!(left.n_samples() + right.n_samples(), *n_samples);
                check(left);
                check(right);
            }
        }
        let root = tree.root().unwrap();
        assert_eq!(root.n_samples(), 6);
        check(root);
        assert!((root.expected_value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_non_binary_labels() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 2.0];
        let mut tree = DecisionTree::new_classifier();
        assert!(matches!(tree.fit(&x, &y), Err(XaiError::ValidationError(_))));
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_classifier();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(XaiError::ModelNotFitted)));
    }
}
