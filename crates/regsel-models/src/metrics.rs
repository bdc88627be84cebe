//! Regression metrics.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// r2, mse and rmse computed on one split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
}

impl MetricSet {
    /// Compute all three metrics from targets and predictions.
    pub fn evaluate(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<Self, ModelError> {
        let mse = mean_squared_error(y_true, y_pred)?;
        let r2 = r2_score(y_true, y_pred)?;
        Ok(MetricSet {
            r2,
            mse,
            rmse: mse.sqrt(),
        })
    }
}

fn check_lengths(y_true: &ArrayView1<f64>, y_pred: &ArrayView1<f64>) -> Result<(), ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::InvalidInput(format!(
            "targets ({}) and predictions ({}) have different lengths",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(ModelError::InvalidInput(
            "cannot score an empty split".to_string(),
        ));
    }
    Ok(())
}

/// Mean of squared residuals.
pub fn mean_squared_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64, ModelError> {
    check_lengths(&y_true, &y_pred)?;
    let sse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    Ok(sse / y_true.len() as f64)
}

/// Coefficient of determination. Not clamped: worse-than-mean predictions
/// give a negative score.
///
/// A constant target has no variance to explain; the score is then 1.0 for a
/// perfect prediction and 0.0 otherwise.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64, ModelError> {
    check_lengths(&y_true, &y_pred)?;
    let mean = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_prediction() {
        let y = array![1.0, 2.0, 3.0];
        let m = MetricSet::evaluate(y.view(), y.view()).unwrap();
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![2.0, 2.0, 2.0];
        assert!(r2_score(y.view(), p.view()).unwrap().abs() < 1e-12);
    }

    #[test]
    fn r2_can_be_negative() {
        let y = array![1.0, 2.0, 3.0];
        let p = array![3.0, 2.0, 1.0];
        let r2 = r2_score(y.view(), p.view()).unwrap();
        assert!((r2 - (-3.0)).abs() < 1e-12, "r2 = {}", r2);
    }

    #[test]
    fn rmse_is_root_of_mse() {
        let y = array![0.0, 0.0, 0.0, 0.0];
        let p = array![1.0, -1.0, 2.0, 0.0];
        let m = MetricSet::evaluate(y.view(), p.view()).unwrap();
        assert!((m.mse - 1.5).abs() < 1e-12);
        assert!((m.rmse - 1.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn constant_target() {
        let y = array![2.0, 2.0];
        assert_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
        assert_eq!(r2_score(y.view(), array![2.0, 3.0].view()).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let y = array![1.0, 2.0];
        let p = array![1.0];
        assert!(mean_squared_error(y.view(), p.view()).is_err());
    }
}
