//! Tabular I/O between polars frames and dense ndarray matrices

use crate::error::{require_file, Result, XaiError};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Placeholder the raw dataset uses for unknown measurements
pub const MISSING_PLACEHOLDER: &str = "?";

/// Feature matrix with its labels and column names
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

impl Dataset {
    pub fn new(feature_names: Vec<String>, features: Array2<f64>, labels: Array1<f64>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }
}

/// Load a CSV file, reading `?` and empty fields as nulls
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    require_file(path)?;
    let file = File::open(path)?;

    let parse_opts = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumnsSingle(MISSING_PLACEHOLDER.into())));

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| XaiError::DataError(format!("{}: {}", path.display(), e)))
}

/// Save a frame as CSV with a header row, creating parent directories
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| XaiError::DataError(e.to_string()))
}

/// Extract named columns into a row-major `Array2<f64>`; nulls are rejected
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_to_vec(df, name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

fn column_to_vec(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| XaiError::ColumnNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;

    series
        .f64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| XaiError::DataError(format!("null value in column '{}'", name))))
        .collect()
}

/// Split a cleaned frame into a [`Dataset`]; every column except `target` is a feature
pub fn frame_to_dataset(df: &DataFrame, target: &str) -> Result<Dataset> {
    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != target)
        .map(|name| name.to_string())
        .collect();

    let labels = Array1::from_vec(column_to_vec(df, target)?);
    let features = columns_to_array2(df, &feature_names)?;
    Dataset::new(feature_names, features, labels)
}

/// Build a frame with one `f64` column per feature name
pub fn matrix_to_frame(feature_names: &[String], x: &Array2<f64>) -> Result<DataFrame> {
    if feature_names.len() != x.ncols() {
        return Err(XaiError::ShapeError {
            expected: format!("{} columns", feature_names.len()),
            actual: format!("{} columns", x.ncols()),
        });
    }

    let columns: Vec<Column> = feature_names
        .iter()
        .zip(x.columns())
        .map(|(name, col)| Series::new(name.as_str().into(), col.to_vec()).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Single integer column holding {0, 1} labels
pub fn labels_to_frame(name: &str, y: &Array1<f64>) -> Result<DataFrame> {
    let values: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
    Ok(DataFrame::new(vec![Series::new(name.into(), values).into()])?)
}

/// Load a single label column as `f64`
pub fn load_labels(path: &Path, name: &str) -> Result<Array1<f64>> {
    let df = load_csv(path)?;
    Ok(Array1::from_vec(column_to_vec(&df, name)?))
}

/// Load a feature matrix and its header
pub fn load_matrix(path: &Path) -> Result<(Vec<String>, Array2<f64>)> {
    let df = load_csv(path)?;
    let names: Vec<String> = df.get_column_names().into_iter().map(|n| n.to_string()).collect();
    let x = columns_to_array2(&df, &names)?;
    Ok((names, x))
}
