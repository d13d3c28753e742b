//! Pipeline configuration
//!
//! Every stage receives its settings through these structs instead of
//! reading process-wide constants. The defaults reproduce the fixed research
//! setup; [`PathsConfig::rooted_at`] relocates all artifacts for isolated runs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::training::{ForestConfig, GradientBoostingConfig, LogisticConfig};

/// File-system layout shared by all stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw input table
    pub raw_data: PathBuf,
    /// Cleaned table written by the preprocessor
    pub cleaned_data: PathBuf,
    /// Scaled held-out features written by the trainer
    pub test_features: PathBuf,
    /// Held-out labels written by the trainer
    pub test_labels: PathBuf,
    /// Directory holding model and scaler artifacts
    pub models_dir: PathBuf,
    /// Root directory for every rendered plot
    pub plots_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::rooted_at(".")
    }
}

impl PathsConfig {
    /// Standard layout below `root`
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let processed = root.join("data").join("processed");
        let results = root.join("results");
        Self {
            raw_data: root.join("data").join("heart_disease.csv"),
            cleaned_data: processed.join("heart_disease_cleaned.csv"),
            test_features: processed.join("X_test_scaled.csv"),
            test_labels: processed.join("y_test.csv"),
            models_dir: results.join("models"),
            plots_dir: results.join("plots"),
        }
    }

    pub fn with_raw_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw_data = path.into();
        self
    }

    pub fn shap_plots(&self) -> PathBuf {
        self.plots_dir.join("shap")
    }

    pub fn lime_plots(&self) -> PathBuf {
        self.plots_dir.join("lime")
    }

    pub fn stability_plots(&self) -> PathBuf {
        self.plots_dir.join("stability")
    }

    pub fn text_demo_plots(&self) -> PathBuf {
        self.plots_dir.join("text_demo")
    }
}

/// Train/test partitioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing
    pub test_fraction: f64,
    /// Seed for the stratified shuffle
    pub seed: u64,
    /// Name of the label column
    pub target_column: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            target_column: "target".to_string(),
        }
    }
}

/// Hyperparameters of the three classifier variants
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub logistic: LogisticConfig,
    pub forest: ForestConfig,
    pub boosting: GradientBoostingConfig,
}

/// Noise-stability study
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Row of the test set used as the base instance
    pub instance_index: usize,
    /// Standard deviations of the Gaussian perturbation, ascending
    pub noise_levels: Vec<f64>,
    /// Perturbed trials per noise level
    pub trials: usize,
    /// Seed for the perturbation draws
    pub seed: u64,
    /// Bootstrap resamples for the confidence band (0 disables the band)
    pub bootstrap_resamples: usize,
    /// Confidence level of the band
    pub confidence: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            instance_index: 0,
            noise_levels: vec![0.01, 0.05, 0.1, 0.2, 0.5],
            trials: 20,
            seed: 42,
            bootstrap_resamples: 1000,
            confidence: 0.95,
        }
    }
}

impl StabilityConfig {
    pub fn with_noise_levels(mut self, levels: Vec<f64>) -> Self {
        self.noise_levels = levels;
        self
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bootstrap_resamples(mut self, resamples: usize) -> Self {
        self.bootstrap_resamples = resamples;
        self
    }
}

/// Tabular LIME
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimeConfig {
    /// Row of the test set to explain
    pub instance_index: usize,
    /// Perturbed samples drawn around the reference distribution
    pub num_samples: usize,
    /// Features kept in the reported explanation
    pub num_features: usize,
    /// Kernel width; `None` means `0.75 * sqrt(n_features)`
    pub kernel_width: Option<f64>,
    /// Ridge penalty of the local surrogate
    pub ridge_alpha: f64,
    pub seed: u64,
    /// Display names for class 0 and class 1
    pub class_names: [String; 2],
}

impl Default for LimeConfig {
    fn default() -> Self {
        Self {
            instance_index: 0,
            num_samples: 5000,
            num_features: 10,
            kernel_width: None,
            ridge_alpha: 1.0,
            seed: 42,
            class_names: ["Low Risk".to_string(), "High Risk".to_string()],
        }
    }
}

/// Text classification demo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextDemoConfig {
    /// Sentence explained by the single-run variant
    pub demo_sentence: String,
    /// Command that ends the interactive loop
    pub quit_command: String,
    /// Probability above which a sentence counts as urgent
    pub urgent_threshold: f64,
    pub logistic: LogisticConfig,
}

impl Default for TextDemoConfig {
    fn default() -> Self {
        Self {
            demo_sentence: "I feel mild chest pain but I am mostly dizzy".to_string(),
            quit_command: "quit".to_string(),
            urgent_threshold: 0.5,
            logistic: LogisticConfig {
                c: 10.0,
                learning_rate: 0.5,
                max_iter: 5000,
                tol: 1e-6,
            },
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub split: SplitConfig,
    pub models: ModelsConfig,
    pub stability: StabilityConfig,
    pub lime: LimeConfig,
    pub text: TextDemoConfig,
}

impl PipelineConfig {
    /// Default settings with every artifact below `root`
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        Self {
            paths: PathsConfig::rooted_at(root),
            ..Default::default()
        }
    }

    pub fn with_paths(mut self, paths: PathsConfig) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_stability(mut self, stability: StabilityConfig) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_models(mut self, models: ModelsConfig) -> Self {
        self.models = models;
        self
    }

    pub fn with_lime(mut self, lime: LimeConfig) -> Self {
        self.lime = lime;
        self
    }
}
