//! Attribution reporting stage
//!
//! Loads the persisted models and the scaled test partition, computes SHAP
//! and LIME attributions and renders the plots under `plots/shap` and
//! `plots/lime`.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use super::{
    AttributionSummary, ClassAttributions, Explainer, LimeExplanation, LimeTabularExplainer,
    LinearExplainer, LocalExplanation, TreeExplainer, POSITIVE_CLASS,
};
use crate::artifacts::ModelStore;
use crate::config::{LimeConfig, PathsConfig, PipelineConfig};
use crate::data::load_matrix;
use crate::error::{Result, XaiError};
use crate::training::{ModelKind, TrainedModel};
use crate::visualization::{colors, summary_plot, waterfall_plot, BarChart};

/// Test row shown in the local waterfall
pub const WATERFALL_INSTANCE: usize = 0;

/// Features drawn in summary and waterfall plots
const MAX_DISPLAY: usize = 20;

/// Output of the SHAP part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapReport {
    pub random_forest: AttributionSummary,
    pub logistic_regression: AttributionSummary,
    pub gradient_boosting: AttributionSummary,
    /// Random forest explanation of [`WATERFALL_INSTANCE`]
    pub rf_local: LocalExplanation,
    pub plots: Vec<PathBuf>,
}

/// Output of the LIME part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimeReport {
    pub instance_index: usize,
    pub explanation: LimeExplanation,
    pub plot: PathBuf,
}

/// Persisted models and test data to plots
pub struct AttributionReporter {
    paths: PathsConfig,
    lime: LimeConfig,
}

impl AttributionReporter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            paths: config.paths.clone(),
            lime: config.lime.clone(),
        }
    }

    fn load_test_set(&self) -> Result<(Vec<String>, Array2<f64>)> {
        let (names, x) = load_matrix(&self.paths.test_features)?;
        if x.nrows() == 0 {
            return Err(XaiError::DataError("scaled test set is empty".to_string()));
        }
        info!(rows = x.nrows(), features = x.ncols(), "Scaled test set loaded");
        Ok((names, x))
    }

    fn summary_chart(&self, title: &str, attributions: &ClassAttributions, file: &str) -> Result<PathBuf> {
        let chart = summary_plot(
            title,
            &attributions.positive(),
            &attributions.data.view(),
            &attributions.feature_names,
            MAX_DISPLAY,
        )?;
        let path = chart.save(&self.paths.shap_plots().join(file))?;
        info!(path = %path.display(), "Summary plot saved");
        Ok(path)
    }

    /// TreeSHAP for both ensembles, linear SHAP for the logistic model
    pub fn run_shap(&self) -> Result<ShapReport> {
        let (names, x) = self.load_test_set()?;
        let store = ModelStore::new(&self.paths.models_dir);
        let mut plots = Vec::new();

        let rf = store.load_model(ModelKind::RandomForest)?;
        let rf_attr = TreeExplainer::for_model(&rf)?
            .with_feature_names(names.clone())
            .explain(&x)?;
        plots.push(self.summary_chart("Random Forest SHAP summary", &rf_attr, "rf_summary_plot.png")?);

        let rf_local = rf_attr.local(WATERFALL_INSTANCE, POSITIVE_CLASS)?;
        let waterfall = waterfall_plot(
            &format!("Random Forest explanation (instance {})", WATERFALL_INSTANCE),
            &rf_local,
            MAX_DISPLAY,
        );
        plots.push(waterfall.save(&self.paths.shap_plots().join("rf_local_waterfall.png"))?);
        if let Some(top) = rf_local.dominant_feature() {
            info!(
                feature = %top.feature_name,
                contribution = %format!("{:.4}", top.contribution),
                "Largest local contribution"
            );
        }

        let lr_attr = match store.load_model(ModelKind::LogisticRegression)? {
            TrainedModel::LogisticRegression(model) => LinearExplainer::for_logistic(&model, &x)?
                .with_feature_names(names.clone())
                .explain(&x)?,
            other => {
                return Err(XaiError::ExplainerError(format!(
                    "expected a logistic regression artifact, found {}",
                    other.kind()
                )))
            }
        };
        plots.push(self.summary_chart("Logistic Regression SHAP summary", &lr_attr, "lr_summary_plot.png")?);

        let gb = store.load_model(ModelKind::GradientBoosting)?;
        let gb_attr = TreeExplainer::for_model(&gb)?
            .with_feature_names(names)
            .explain(&x)?;
        plots.push(self.summary_chart("Gradient Boosting SHAP summary", &gb_attr, "gb_summary_plot.png")?);

        info!(dir = %self.paths.shap_plots().display(), plots = plots.len(), "SHAP plots saved");

        Ok(ShapReport {
            random_forest: rf_attr.summary(POSITIVE_CLASS)?,
            logistic_regression: lr_attr.summary(POSITIVE_CLASS)?,
            gradient_boosting: gb_attr.summary(POSITIVE_CLASS)?,
            rf_local,
            plots,
        })
    }

    /// Tabular LIME on the random forest for the configured instance
    pub fn run_lime(&self) -> Result<LimeReport> {
        let (names, x) = self.load_test_set()?;
        let index = self.lime.instance_index;
        if index >= x.nrows() {
            return Err(XaiError::ValidationError(format!(
                "instance {} out of range for {} test rows",
                index,
                x.nrows()
            )));
        }

        let rf = ModelStore::new(&self.paths.models_dir).load_model(ModelKind::RandomForest)?;
        let explainer = LimeTabularExplainer::new(&x, names, self.lime.clone())?;
        let explanation = explainer.explain_instance(x.row(index), &rf, POSITIVE_CLASS)?;
        info!(
            instance = index,
            class = %explanation.class_name,
            score = %format!("{:.4}", explanation.score),
            "LIME explanation computed"
        );

        let bars = explanation
            .weights
            .iter()
            .map(|w| (w.feature_name.clone(), w.weight));
        let chart = BarChart::new(format!("LIME Local Explanation (Instance {})", index))
            .with_x_label(format!("weight for {}", explanation.class_name))
            .with_colors(colors::GREEN, colors::RED)
            .with_bars(bars)
            .render();
        let plot = chart.save(&self.paths.lime_plots().join(format!("rf_lime_instance_{}.png", index)))?;
        info!(path = %plot.display(), "LIME plot saved");

        Ok(LimeReport {
            instance_index: index,
            explanation,
            plot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = AttributionReporter::new(&PipelineConfig::rooted_at(dir.path()));
        assert!(matches!(reporter.run_shap().unwrap_err(), XaiError::MissingInput(_)));
        assert!(matches!(reporter.run_lime().unwrap_err(), XaiError::MissingInput(_)));
    }
}
