//! Seeded stratified train/test partitioning

use crate::error::{Result, XaiError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Disjoint row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Partition rows so each label keeps roughly its share in both halves.
///
/// The test partition holds `ceil(test_fraction * n)` rows; per-class test
/// counts are apportioned by largest remainder. The same labels and seed
/// always produce the same split.
pub fn stratified_split(labels: &Array1<f64>, test_fraction: f64, seed: u64) -> Result<Split> {
    let n = labels.len();
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(XaiError::ConfigError(format!(
            "test fraction must lie in (0, 1), got {}",
            test_fraction
        )));
    }
    if n < 2 {
        return Err(XaiError::DataError(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        class_indices.entry(label.round() as i64).or_default().push(i);
    }

    // The epsilon keeps exact products such as 0.2 * 50 from rounding up
    let n_test = ((test_fraction * n as f64 - 1e-9).ceil() as usize).clamp(1, n - 1);
    let quotas = apportion(&class_indices, n_test, n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(n - n_test);
    let mut test_indices = Vec::with_capacity(n_test);

    for (indices, quota) in class_indices.values().zip(quotas) {
        let mut shuffled = indices.clone();
        shuffled.shuffle(&mut rng);
        test_indices.extend_from_slice(&shuffled[..quota]);
        train_indices.extend_from_slice(&shuffled[quota..]);
    }

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(XaiError::DataError(
            "Stratified split resulted in empty train or test set".to_string(),
        ));
    }

    Ok(Split {
        train_indices,
        test_indices,
    })
}

/// Largest-remainder allocation of `n_test` slots over the classes
fn apportion(class_indices: &BTreeMap<i64, Vec<usize>>, n_test: usize, n: usize) -> Vec<usize> {
    let exact: Vec<f64> = class_indices
        .values()
        .map(|idx| n_test as f64 * idx.len() as f64 / n as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut order: Vec<usize> = (0..exact.len()).collect();
    // Stable sort keeps class order for equal remainders
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut remaining = n_test - quotas.iter().sum::<usize>();
    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        if quotas[class] < class_indices.values().nth(class).map_or(0, Vec::len) {
            quotas[class] += 1;
            remaining -= 1;
        }
    }

    quotas
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn labels(zeros: usize, ones: usize) -> Array1<f64> {
        let mut v = vec![0.0; zeros];
        v.extend(vec![1.0; ones]);
        Array1::from_vec(v)
    }

    #[test]
    fn test_partition_is_complete_and_disjoint() {
        let y = labels(30, 20);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test_indices.len(), 10);
        assert_eq!(split.train_indices.len(), 40);

        let mut all: Vec<usize> = split
            .train_indices
            .iter()
            .chain(split.test_indices.iter())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_class_proportions_preserved() {
        let y = labels(30, 20);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        let test_pos = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 4);
    }

    #[test]
    fn test_ceil_test_size() {
        let y = labels(150, 147);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.test_indices.len(), 60);
    }

    #[test]
    fn test_deterministic() {
        let y = labels(17, 13);
        let a = stratified_split(&y, 0.2, 42).unwrap();
        let b = stratified_split(&y, 0.2, 42).unwrap();
        let c = stratified_split(&y, 0.2, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_fraction() {
        let y = labels(5, 5);
        assert!(matches!(stratified_split(&y, 1.0, 42), Err(XaiError::ConfigError(_))));
    }
}
