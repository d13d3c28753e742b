//! Explanation stability under input noise
//!
//! One instance is perturbed with Gaussian noise at increasing scales and
//! re-explained; the rank agreement between the perturbed and the original
//! attribution vectors measures how stable the explanation is.

mod rank;

pub use rank::{average_ranks, spearman};

use ndarray::{Array2, ArrayView1, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::artifacts::ModelStore;
use crate::config::{PathsConfig, PipelineConfig, StabilityConfig};
use crate::data::load_matrix;
use crate::error::{Result, XaiError};
use crate::explainability::{Explainer, TreeExplainer};
use crate::training::ModelKind;
use crate::visualization::{line_chart, Band};

/// Name of the rendered stability curve
pub const STABILITY_PLOT: &str = "shap_stability_test.png";

/// Mean rank correlation at one noise level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityPoint {
    pub noise_level: f64,
    pub mean_correlation: f64,
    pub trial_correlations: Vec<f64>,
    /// Bootstrap confidence interval of the mean
    pub interval: Option<(f64, f64)>,
}

/// Stability scores in ascending noise order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityCurve {
    pub points: Vec<StabilityPoint>,
}

impl StabilityCurve {
    /// `(noise level, mean correlation)` pairs
    pub fn scores(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.noise_level, p.mean_correlation))
            .collect()
    }

    /// Confidence band, present only when every point carries an interval
    pub fn band(&self) -> Option<Band> {
        let intervals: Option<Vec<(f64, f64)>> = self.points.iter().map(|p| p.interval).collect();
        let (lower, upper): (Vec<f64>, Vec<f64>) = intervals?.into_iter().unzip();
        Some(Band { lower, upper })
    }
}

/// Linear-interpolated quantile of ascending values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Percentile bootstrap interval for the mean of `values`
pub fn bootstrap_interval<R: Rng>(
    values: &[f64],
    resamples: usize,
    confidence: f64,
    rng: &mut R,
) -> Option<(f64, f64)> {
    if resamples == 0 || values.is_empty() {
        return None;
    }

    let n = values.len();
    let mut means: Vec<f64> = (0..resamples)
        .map(|_| (0..n).map(|_| values[rng.gen_range(0..n)]).sum::<f64>() / n as f64)
        .collect();
    means.sort_by(f64::total_cmp);

    let alpha = (1.0 - confidence) / 2.0;
    Some((quantile(&means, alpha), quantile(&means, 1.0 - alpha)))
}

/// Noise-stability scoring around one instance
pub struct StabilityScorer<'a, E: Explainer + ?Sized> {
    explainer: &'a E,
    config: StabilityConfig,
}

impl<'a, E: Explainer + ?Sized> StabilityScorer<'a, E> {
    pub fn new(explainer: &'a E, config: StabilityConfig) -> Result<Self> {
        if config.trials == 0 {
            return Err(XaiError::ConfigError("stability needs at least one trial".to_string()));
        }
        if let Some(bad) = config.noise_levels.iter().find(|s| !s.is_finite() || **s < 0.0) {
            return Err(XaiError::ConfigError(format!("invalid noise level {}", bad)));
        }
        if !(0.0..1.0).contains(&config.confidence) {
            return Err(XaiError::ConfigError(format!(
                "confidence must lie in [0, 1), got {}",
                config.confidence
            )));
        }
        Ok(Self { explainer, config })
    }

    /// Positive-class attribution vector of one row
    fn attribution(&self, row: ArrayView1<'_, f64>) -> Result<Vec<f64>> {
        let attributions = self.explainer.explain_row(row)?;
        Ok(attributions.positive().row(0).to_vec())
    }

    pub fn score(&self, instance: ArrayView1<'_, f64>) -> Result<StabilityCurve> {
        let baseline = self.attribution(instance)?;
        let mut noise_rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut bootstrap_rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(1));

        let mut levels = self.config.noise_levels.clone();
        levels.sort_by(f64::total_cmp);

        let n_features = instance.len();
        let mut points = Vec::with_capacity(levels.len());
        for sigma in levels {
            let noise: Array2<f64> = Array2::from_shape_simple_fn((self.config.trials, n_features), || {
                sigma * noise_rng.sample::<f64, _>(StandardNormal)
            });
            let perturbed = noise + &instance.insert_axis(Axis(0));

            let attributions = self.explainer.explain(&perturbed)?;
            let trial_correlations = attributions
                .positive()
                .rows()
                .into_iter()
                .map(|row| spearman(&baseline, &row.to_vec()))
                .collect::<Result<Vec<f64>>>()?;

            let mean_correlation =
                trial_correlations.iter().sum::<f64>() / trial_correlations.len() as f64;
            let interval = bootstrap_interval(
                &trial_correlations,
                self.config.bootstrap_resamples,
                self.config.confidence,
                &mut bootstrap_rng,
            );
            debug!(noise = sigma, trials = trial_correlations.len(), "Noise level scored");

            points.push(StabilityPoint {
                noise_level: sigma,
                mean_correlation,
                trial_correlations,
                interval,
            });
        }

        Ok(StabilityCurve { points })
    }
}

/// Output of the stability stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityReport {
    pub instance_index: usize,
    pub curve: StabilityCurve,
    pub plot: PathBuf,
}

/// Persisted random forest and test data to the stability curve
pub struct StabilityStage {
    paths: PathsConfig,
    config: StabilityConfig,
}

impl StabilityStage {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            paths: config.paths.clone(),
            config: config.stability.clone(),
        }
    }

    pub fn run(&self) -> Result<StabilityReport> {
        let (names, x) = load_matrix(&self.paths.test_features)?;
        let index = self.config.instance_index;
        if index >= x.nrows() {
            return Err(XaiError::ValidationError(format!(
                "instance {} out of range for {} test rows",
                index,
                x.nrows()
            )));
        }

        let model = ModelStore::new(&self.paths.models_dir).load_model(ModelKind::RandomForest)?;
        let explainer = TreeExplainer::for_model(&model)?.with_feature_names(names);
        let curve = StabilityScorer::new(&explainer, self.config.clone())?.score(x.row(index))?;

        for point in &curve.points {
            info!(
                noise = point.noise_level,
                mean_correlation = %format!("{:.4}", point.mean_correlation),
                "Explanation stability"
            );
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = curve.scores().into_iter().unzip();
        let band = curve.band();
        let chart = line_chart(
            "Explanation Stability Analysis (SHAP + Random Forest)",
            "Perturbation Level (Gaussian Noise Std Dev)",
            "Rank Correlation with Original Explanation",
            &xs,
            &ys,
            band.as_ref(),
        )?;
        let plot = chart.save(&self.paths.stability_plots().join(STABILITY_PLOT))?;
        info!(path = %plot.display(), "Stability plot saved");

        Ok(StabilityReport {
            instance_index: index,
            curve,
            plot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainability::LinearExplainer;
    use ndarray::array;

    fn explainer() -> LinearExplainer {
        let background = array![[0.0, 0.0, 0.0, 0.0], [1.0, 1.0, 1.0, 1.0]];
        LinearExplainer::new(array![1.0, -2.0, 0.5, 3.0], 0.0, &background).unwrap()
    }

    fn config(levels: Vec<f64>) -> StabilityConfig {
        StabilityConfig::default()
            .with_noise_levels(levels)
            .with_trials(10)
            .with_bootstrap_resamples(200)
    }

    #[test]
    fn test_zero_noise_is_perfectly_stable() {
        let explainer = explainer();
        let scorer = StabilityScorer::new(&explainer, config(vec![0.0])).unwrap();
        let curve = scorer.score(array![2.0, 0.1, -1.0, 0.7].view()).unwrap();

        assert_eq!(curve.points[0].mean_correlation, 1.0);
        assert_eq!(curve.points[0].interval, Some((1.0, 1.0)));
    }

    #[test]
    fn test_scores_in_range_and_ordered() {
        let explainer = explainer();
        let scorer = StabilityScorer::new(&explainer, config(vec![0.5, 0.01, 2.0])).unwrap();
        let curve = scorer.score(array![2.0, 0.1, -1.0, 0.7].view()).unwrap();

        let levels: Vec<f64> = curve.scores().iter().map(|(s, _)| *s).collect();
        assert_eq!(levels, vec![0.01, 0.5, 2.0]);
        for point in &curve.points {
            assert!((-1.0..=1.0).contains(&point.mean_correlation));
            let (lo, hi) = point.interval.unwrap();
            assert!(lo <= point.mean_correlation + 1e-12 && point.mean_correlation <= hi + 1e-12);
        }
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let explainer = explainer();
        let a = StabilityScorer::new(&explainer, config(vec![0.3])).unwrap();
        let b = StabilityScorer::new(&explainer, config(vec![0.3])).unwrap();
        let instance = array![0.2, 0.4, 0.6, 0.8];
        assert_eq!(a.score(instance.view()).unwrap().points, b.score(instance.view()).unwrap().points);
    }

    #[test]
    fn test_no_band_without_resamples() {
        let explainer = explainer();
        let cfg = config(vec![0.1]).with_bootstrap_resamples(0);
        let curve = StabilityScorer::new(&explainer, cfg).unwrap().score(array![1.0, 1.0, 1.0, 2.0].view()).unwrap();
        assert!(curve.points[0].interval.is_none());
        assert!(curve.band().is_none());
    }

    #[test]
    fn test_rejects_bad_config() {
        let explainer = explainer();
        assert!(StabilityScorer::new(&explainer, config(vec![-0.1])).is_err());
        assert!(StabilityScorer::new(&explainer, config(vec![0.1]).with_trials(0)).is_err());
    }

    #[test]
    fn test_bootstrap_interval_brackets_mean() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let values = [0.2, 0.4, 0.6, 0.8];
        let (lo, hi) = bootstrap_interval(&values, 500, 0.95, &mut rng).unwrap();
        assert!(lo < 0.5 && 0.5 < hi);
        assert!(lo >= 0.2 && hi <= 0.8);
        assert!(bootstrap_interval(&[], 10, 0.95, &mut rng).is_none());
    }
}
