//! Data preprocessing module
//!
//! The first pipeline stage: drop incomplete rows from the raw table,
//! binarize the outcome label and persist the cleaned table. The scaler and
//! the stratified split used by the trainer also live here.

mod scaler;
mod split;

pub use scaler::{ScalerParams, StandardScaler};
pub use split::{stratified_split, Split};

use crate::config::PipelineConfig;
use crate::data::{load_csv, save_csv};
use crate::error::{Result, XaiError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// What the cleaning pass did to the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub dropped_rows: usize,
    /// Missing cells per column, in column order, for columns with any
    pub missing_by_column: Vec<(String, usize)>,
    /// Raw label distribution before binarization
    pub label_counts: BTreeMap<i64, usize>,
}

/// Drop every row that has a null in any column
pub fn drop_incomplete_rows(df: &DataFrame) -> Result<(DataFrame, Vec<(String, usize)>)> {
    let missing_by_column: Vec<(String, usize)> = df
        .get_columns()
        .iter()
        .filter(|col| col.null_count() > 0)
        .map(|col| (col.name().to_string(), col.null_count()))
        .collect();

    if missing_by_column.is_empty() {
        return Ok((df.clone(), missing_by_column));
    }

    let mut mask = BooleanChunked::full("complete".into(), true, df.height());
    for col in df.get_columns() {
        mask = &mask & &col.as_materialized_series().is_not_null();
    }

    Ok((df.filter(&mask)?, missing_by_column))
}

/// Map the label column in place: `1` if the raw value is positive, else `0`.
/// Returns the raw label distribution.
pub fn binarize_target(df: &mut DataFrame, target: &str) -> Result<BTreeMap<i64, usize>> {
    let column = df
        .column(target)
        .map_err(|_| XaiError::ColumnNotFound(target.to_string()))?;
    let raw = column.as_materialized_series().cast(&DataType::Float64)?;

    let mut label_counts = BTreeMap::new();
    let mut binary = Vec::with_capacity(raw.len());
    for value in raw.f64()?.into_iter() {
        let value = value.ok_or_else(|| {
            XaiError::DataError(format!("null label in column '{}'", target))
        })?;
        *label_counts.entry(value.round() as i64).or_insert(0) += 1;
        binary.push(if value > 0.0 { 1i64 } else { 0i64 });
    }

    df.with_column(Series::new(target.into(), binary))?;
    Ok(label_counts)
}

/// Raw table to cleaned table
pub struct Preprocessor {
    raw_data: PathBuf,
    cleaned_data: PathBuf,
    target_column: String,
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            raw_data: config.paths.raw_data.clone(),
            cleaned_data: config.paths.cleaned_data.clone(),
            target_column: config.split.target_column.clone(),
        }
    }

    /// Clean an in-memory frame
    pub fn clean(&self, raw: &DataFrame) -> Result<(DataFrame, CleaningReport)> {
        if raw.column(&self.target_column).is_err() {
            return Err(XaiError::ColumnNotFound(self.target_column.clone()));
        }

        let rows_before = raw.height();
        let (mut cleaned, missing_by_column) = drop_incomplete_rows(raw)?;
        let rows_after = cleaned.height();

        if rows_after == 0 {
            return Err(XaiError::DataError(
                "every row has a missing value".to_string(),
            ));
        }

        let label_counts = binarize_target(&mut cleaned, &self.target_column)?;

        Ok((
            cleaned,
            CleaningReport {
                rows_before,
                rows_after,
                dropped_rows: rows_before - rows_after,
                missing_by_column,
                label_counts,
            },
        ))
    }

    /// Read the raw CSV, clean it and write the cleaned CSV
    pub fn run(&self) -> Result<CleaningReport> {
        let raw = load_csv(&self.raw_data)?;
        info!(rows = raw.height(), columns = raw.width(), "Dataset loaded");

        let (mut cleaned, report) = self.clean(&raw)?;

        if report.missing_by_column.is_empty() {
            info!("No missing values detected");
        } else {
            for (column, missing) in &report.missing_by_column {
                warn!(column = %column, missing, "Missing values detected");
            }
            info!(
                dropped = report.dropped_rows,
                remaining = report.rows_after,
                "Rows with missing values dropped"
            );
        }
        for (label, count) in &report.label_counts {
            info!(label, count, "Raw target distribution");
        }

        save_csv(&mut cleaned, &self.cleaned_data)?;
        info!(path = %self.cleaned_data.display(), "Preprocessed data saved");

        Ok(report)
    }
}
