use crate::config::ModelKind;
use crate::error::ModelError;
use crate::models::regressor_trait::Regressor;
use crate::models::{DecisionTreeRegressor, GradientBoostingRegressor, LinearRegression};

/// Build an unfitted regressor with default hyperparameters.
pub fn build_model(kind: ModelKind) -> Box<dyn Regressor> {
    match kind {
        ModelKind::DecisionTree => Box::new(DecisionTreeRegressor::new()),
        ModelKind::LinearRegression => Box::new(LinearRegression::new()),
        ModelKind::GradientBoosting => Box::new(GradientBoostingRegressor::new()),
    }
}

/// Rebuild a regressor from the output of [`Regressor::state`].
pub fn restore_model(kind: ModelKind, state: serde_json::Value) -> Result<Box<dyn Regressor>, ModelError> {
    let restored: Box<dyn Regressor> = match kind {
        ModelKind::DecisionTree => Box::new(
            serde_json::from_value::<DecisionTreeRegressor>(state).map_err(corrupt_state)?,
        ),
        ModelKind::LinearRegression => Box::new(
            serde_json::from_value::<LinearRegression>(state).map_err(corrupt_state)?,
        ),
        ModelKind::GradientBoosting => Box::new(
            serde_json::from_value::<GradientBoostingRegressor>(state).map_err(corrupt_state)?,
        ),
    };
    Ok(restored)
}

fn corrupt_state(e: serde_json::Error) -> ModelError {
    ModelError::InvalidInput(format!("malformed model state: {}", e))
}
