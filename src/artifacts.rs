//! Persistence of trained models and the fitted scaler
//!
//! Artifacts are `bincode` encodings of the serde representation, one file
//! per artifact under the models directory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{require_file, Result};
use crate::preprocessing::StandardScaler;
use crate::training::{ModelKind, TrainedModel};

pub const SCALER_FILE: &str = "scaler.bin";
pub const TRAINING_REPORT_FILE: &str = "training_report.json";

/// Serialize `value` to `path`, creating parent directories
pub fn save_bin<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Deserialize a value written by [`save_bin`]
pub fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    require_file(path)?;
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Directory of model artifacts keyed by [`ModelKind`]
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.root.join(format!("{}.bin", kind.artifact_name()))
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.root.join(SCALER_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(TRAINING_REPORT_FILE)
    }

    pub fn save_model(&self, model: &TrainedModel) -> Result<PathBuf> {
        let path = self.model_path(model.kind());
        save_bin(model, &path)?;
        Ok(path)
    }

    pub fn load_model(&self, kind: ModelKind) -> Result<TrainedModel> {
        load_bin(&self.model_path(kind))
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<PathBuf> {
        let path = self.scaler_path();
        save_bin(scaler, &path)?;
        Ok(path)
    }

    pub fn load_scaler(&self) -> Result<StandardScaler> {
        load_bin(&self.scaler_path())
    }

    /// Human-readable JSON next to the binary artifacts
    pub fn save_json<T: Serialize>(&self, value: &T, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XaiError;
    use crate::training::{Classifier, LogisticRegression};
    use ndarray::array;

    #[test]
    fn test_model_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models"));

        let x = array![[0.0], [1.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut lr = LogisticRegression::new();
        lr.fit(&x, &y).unwrap();
        let model = TrainedModel::LogisticRegression(lr);

        let path = store.save_model(&model).unwrap();
        assert!(path.ends_with("Logistic_Regression.bin"));

        let loaded = store.load_model(ModelKind::LogisticRegression).unwrap();
        assert_eq!(loaded.predict_proba(&x).unwrap(), model.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let err = store.load_model(ModelKind::RandomForest).unwrap_err();
        assert!(matches!(err, XaiError::MissingInput(_)));
    }
}
