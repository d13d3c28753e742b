//! cardio-xai - Explainable heart-disease risk classification
//!
//! A file-mediated research pipeline:
//! - [`preprocessing`] - Missing-value removal, label binarization, scaling, stratified split
//! - [`training`] - Logistic regression, random forest and gradient boosting
//! - [`explainability`] - TreeSHAP, linear SHAP and tabular LIME
//! - [`stability`] - Rank stability of explanations under input noise
//! - [`text`] - TF-IDF text monitor with word-level attributions
//!
//! Every stage reads the artifacts of the previous one from the directory
//! tree described by [`config::PathsConfig`].
//!
//! ## Supporting modules
//! - [`artifacts`] - Model and scaler persistence
//! - [`data`] - CSV I/O and column conversion
//! - [`visualization`] - PNG rendering with JSON sidecars
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Pipeline stages
pub mod preprocessing;
pub mod training;
pub mod explainability;
pub mod stability;
pub mod text;

// Support
pub mod artifacts;
pub mod data;
pub mod visualization;

// Services
pub mod cli;

pub use error::{Result, XaiError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifacts::ModelStore;
    pub use crate::config::{
        LimeConfig, ModelsConfig, PathsConfig, PipelineConfig, SplitConfig, StabilityConfig,
        TextDemoConfig,
    };
    pub use crate::data::Dataset;
    pub use crate::error::{Result, XaiError};
    pub use crate::explainability::{
        AttributionReporter, ClassAttributions, Explainer, LimeTabularExplainer, LinearExplainer,
        OutputSpace, TreeExplainer, POSITIVE_CLASS,
    };
    pub use crate::preprocessing::{Preprocessor, StandardScaler};
    pub use crate::stability::{spearman, StabilityScorer, StabilityStage};
    pub use crate::text::{TextDemo, TextOutcome};
    pub use crate::training::{Classifier, ModelKind, TrainedModel, Trainer};
}
