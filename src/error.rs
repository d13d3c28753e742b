//! Error types for the cardio-xai pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, XaiError>;

/// Main error type for every pipeline stage
#[derive(Error, Debug)]
pub enum XaiError {
    #[error("Input not found at {}. Has the previous stage been run?", .0.display())]
    MissingInput(PathBuf),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Explainer error: {0}")]
    ExplainerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<polars::error::PolarsError> for XaiError {
    fn from(err: polars::error::PolarsError) -> Self {
        XaiError::DataError(err.to_string())
    }
}

impl From<bincode::Error> for XaiError {
    fn from(err: bincode::Error) -> Self {
        XaiError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for XaiError {
    fn from(err: serde_json::Error) -> Self {
        XaiError::SerializationError(err.to_string())
    }
}

impl From<image::ImageError> for XaiError {
    fn from(err: image::ImageError) -> Self {
        XaiError::PlotError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for XaiError {
    fn from(err: ndarray::ShapeError) -> Self {
        XaiError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

/// Fail with [`XaiError::MissingInput`] unless `path` exists.
pub fn require_file(path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(XaiError::MissingInput(path.to_path_buf()))
    }
}
