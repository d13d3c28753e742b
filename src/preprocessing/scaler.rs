//! Standard (z-score) feature scaling

use crate::error::{Result, XaiError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Column mean
    pub center: f64,
    /// Population standard deviation, or 1 for constant columns
    pub scale: f64,
}

/// Z-score scaler: `(x - mean) / std` with `ddof = 0`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(XaiError::ValidationError(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let center = col.mean().unwrap_or(0.0);
                let std = col.std(0.0);
                ScalerParams {
                    center,
                    scale: if std == 0.0 { 1.0 } else { std },
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = self.vectors()?;
        self.check_width(x)?;
        Ok((x - &center.insert_axis(Axis(0))) / &scale.insert_axis(Axis(0)))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = self.vectors()?;
        self.check_width(x)?;
        Ok(x * &scale.insert_axis(Axis(0)) + &center.insert_axis(Axis(0)))
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn vectors(&self) -> Result<(Array1<f64>, Array1<f64>)> {
        if !self.is_fitted {
            return Err(XaiError::ModelNotFitted);
        }
        let center = self.params.iter().map(|p| p.center).collect();
        let scale = self.params.iter().map(|p| p.scale).collect();
        Ok((center, scale))
    }

    /// `ShapeError` unless `x` has one column per fitted feature
    pub fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.params.len() {
            return Err(XaiError::ShapeError {
                expected: format!("{} features", self.params.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        let col = scaled.column(0);
        assert!(col.mean().unwrap().abs() < 1e-10);
        assert!((col.std(0.0) - 1.0).abs() < 1e-10);
        // Constant column keeps scale 1
        assert_eq!(scaler.params()[1].scale, 1.0);
        assert!(scaled.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_population_std() {
        let x = array![[0.0], [2.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        assert_eq!(scaler.params()[0], ScalerParams { center: 1.0, scale: 1.0 });
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -3.0], [2.0, 0.5], [7.0, 4.0]];

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (o, r) in x.iter().zip(restored.iter()) {
            assert!((o - r).abs() < 1e-10);
        }
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = StandardScaler::new();
        assert!(matches!(scaler.transform(&array![[1.0]]), Err(XaiError::ModelNotFitted)));
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();

        let narrow = array![[1.0], [2.0]];
        assert!(matches!(scaler.check_width(&narrow), Err(XaiError::ShapeError { .. })));
        assert!(matches!(scaler.transform(&narrow), Err(XaiError::ShapeError { .. })));
        assert!(matches!(scaler.inverse_transform(&narrow), Err(XaiError::ShapeError { .. })));
    }
}
