use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::ModelError;
use crate::models::params::{ParamSet, ParamValue};

/// Capability set every candidate estimator provides. The search, scorer and
/// selector only talk to models through this trait, so new estimator types
/// can be registered without touching them.
pub trait Regressor: Send + Sync {
    /// Stable identifier of the estimator type, used in persisted files.
    fn kind(&self) -> &'static str;

    /// Set one hyperparameter. Unknown names and ill-typed values are errors.
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError>;

    /// Current hyperparameters.
    fn params(&self) -> ParamSet;

    /// Fit on features `x` (n_samples, n_features) and targets `y`.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError>;

    /// Predict one value per row of `x`.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError>;

    /// Unfitted copy carrying the same hyperparameters.
    fn fresh(&self) -> Box<dyn Regressor>;

    /// Serialized form of the whole model, fitted state included.
    fn state(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Apply every entry of `params` in order.
    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            self.set_param(name, value)?;
        }
        Ok(())
    }
}

/// Shape checks shared by the built-in `fit` implementations.
pub(crate) fn check_fit_input(x: &ArrayView2<f64>, y: &ArrayView1<f64>) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::InvalidInput(format!(
            "cannot fit on an empty matrix of shape {:?}",
            x.dim()
        )));
    }
    if x.nrows() != y.len() {
        return Err(ModelError::InvalidInput(format!(
            "feature rows ({}) and target length ({}) differ",
            x.nrows(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ModelError::InvalidInput(
            "input contains NaN or infinite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_predict_input(
    x: &ArrayView2<f64>,
    n_features: usize,
) -> Result<(), ModelError> {
    if x.ncols() != n_features {
        return Err(ModelError::InvalidInput(format!(
            "model was fitted with {} features but got {}",
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}
