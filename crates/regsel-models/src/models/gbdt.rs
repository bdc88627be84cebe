use std::fmt;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::params::{ParamSet, ParamValue};
use crate::models::regressor_trait::{check_fit_input, check_predict_input, Regressor};

pub const KIND: &str = "gradient_boosting";

/// Gradient boosted regression trees (squared error loss) backed by `gbdt`.
///
/// Row and feature subsampling stay at 1.0 so that training is deterministic.
#[derive(Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub max_depth: u32,
    pub min_samples_leaf: usize,
    n_features: Option<usize>,
    model: Option<GBDT>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self {
            learning_rate: 0.3,
            n_estimators: 100,
            max_depth: 6,
            min_samples_leaf: 1,
            n_features: None,
            model: None,
        }
    }
}

impl fmt::Debug for GradientBoostingRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostingRegressor")
            .field("learning_rate", &self.learning_rate)
            .field("n_estimators", &self.n_estimators)
            .field("max_depth", &self.max_depth)
            .field("min_samples_leaf", &self.min_samples_leaf)
            .field("fitted", &self.model.is_some())
            .finish()
    }
}

impl GradientBoostingRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    fn to_data_vec(x: &ArrayView2<f64>, y: Option<&ArrayView1<f64>>) -> DataVec {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.outer_iter().enumerate() {
            let features: Vec<ValueType> = row.iter().map(|v| *v as ValueType).collect();
            let label = y.map(|y| y[i] as ValueType).unwrap_or(0.0);
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }
}

impl Regressor for GradientBoostingRegressor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "learning_rate" => {
                let lr = value.as_f64(name)?;
                if !(lr > 0.0 && lr.is_finite()) {
                    return Err(ModelError::invalid_param(name, "must be a positive number"));
                }
                self.learning_rate = lr;
            }
            "n_estimators" => {
                let n = value.as_usize(name)?;
                if n == 0 {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.n_estimators = n;
            }
            "max_depth" => {
                let d = value.as_usize(name)?;
                if d == 0 || d > u32::MAX as usize {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.max_depth = d as u32;
            }
            "min_samples_leaf" => {
                let n = value.as_usize(name)?;
                if n == 0 {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.min_samples_leaf = n;
            }
            _ => {
                return Err(ModelError::invalid_param(
                    name,
                    "not a GradientBoostingRegressor parameter",
                ))
            }
        }
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("learning_rate".to_string(), self.learning_rate.into());
        params.insert(
            "n_estimators".to_string(),
            ParamValue::Int(self.n_estimators as i64),
        );
        params.insert("max_depth".to_string(), ParamValue::Int(self.max_depth as i64));
        params.insert(
            "min_samples_leaf".to_string(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
        params
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(&x, &y)?;

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.learning_rate as ValueType);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.n_estimators);
        config.set_min_leaf_size(self.min_samples_leaf);
        config.set_data_sample_ratio(1.0);
        config.set_feature_sample_ratio(1.0);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("SquaredError");

        let mut gbdt = GBDT::new(&config);
        let mut train_x = Self::to_data_vec(&x, Some(&y));
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        self.n_features = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted)?;
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        check_predict_input(&x, n_features)?;

        let test_x = Self::to_data_vec(&x, None);
        let predictions = model.predict(&test_x);
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::Numerical(
                "gradient boosting produced a non-finite prediction".to_string(),
            ));
        }
        Ok(predictions.into_iter().map(|p| p as f64).collect())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(GradientBoostingRegressor {
            learning_rate: self.learning_rate,
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            n_features: None,
            model: None,
        })
    }

    fn state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
