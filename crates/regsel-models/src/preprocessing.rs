//! Feature standardization.
//!
//! A `Scaler` is fitted on the training features only and then applied to
//! both splits (and later to inference input), so test statistics never leak
//! into training.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Per-column mean/std standardizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-12;

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

/// Fit a `Scaler` where rows are samples and columns are features.
pub fn fit_scaler(x: ArrayView2<f64>) -> Result<Scaler, ModelError> {
    let (nrows, ncols) = x.dim();
    if nrows == 0 || ncols == 0 {
        return Err(ModelError::InvalidInput(
            "fit_scaler requires a non-empty matrix".to_string(),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidInput(
            "cannot fit a scaler on NaN or infinite values".to_string(),
        ));
    }

    let mean: Array1<f64> = x.sum_axis(Axis(0)) / nrows as f64;
    let std: Vec<f64> = x
        .axis_iter(Axis(1))
        .zip(mean.iter())
        .map(|(col, m)| {
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / nrows as f64;
            var.sqrt().max(Scaler::MIN_STD)
        })
        .collect();

    Ok(Scaler {
        mean: mean.to_vec(),
        std,
    })
}

/// Standardize every row of `x` with `sc`.
pub fn transform_all(x: ArrayView2<f64>, sc: &Scaler) -> Result<Array2<f64>, ModelError> {
    if x.ncols() != sc.n_features() {
        return Err(ModelError::InvalidInput(format!(
            "scaler was fitted on {} features but got {}",
            sc.n_features(),
            x.ncols()
        )));
    }
    let mut out = x.to_owned();
    for (mut col, (m, s)) in out
        .axis_iter_mut(Axis(1))
        .zip(sc.mean.iter().zip(sc.std.iter()))
    {
        col.mapv_inplace(|v| (v - m) / s);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardizes_columns() {
        let x = array![[1.0, 10.0], [3.0, 10.0]];
        let sc = fit_scaler(x.view()).unwrap();
        assert_eq!(sc.mean, vec![2.0, 10.0]);
        assert_eq!(sc.std[0], 1.0);

        let t = transform_all(x.view(), &sc).unwrap();
        assert_eq!(t, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn rejects_wrong_width_and_nan() {
        let sc = fit_scaler(array![[1.0], [2.0]].view()).unwrap();
        assert!(transform_all(array![[1.0, 2.0]].view(), &sc).is_err());
        assert!(fit_scaler(array![[f64::NAN]].view()).is_err());
    }
}
