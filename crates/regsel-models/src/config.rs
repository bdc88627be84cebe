use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::params::{ParamGrid, ParamSet, ParamValue};

/// Built-in estimator types.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    DecisionTree,
    LinearRegression,
    GradientBoosting,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::DecisionTree => crate::models::decision_tree::KIND,
            ModelKind::LinearRegression => crate::models::linear::KIND,
            ModelKind::GradientBoosting => crate::models::gbdt::KIND,
        }
    }

    pub fn all() -> [ModelKind; 3] {
        [
            ModelKind::DecisionTree,
            ModelKind::LinearRegression,
            ModelKind::GradientBoosting,
        ]
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "decision_tree" | "tree" => Ok(ModelKind::DecisionTree),
            "linear_regression" | "linear" => Ok(ModelKind::LinearRegression),
            "gradient_boosting" | "gbdt" | "xgboost" => Ok(ModelKind::GradientBoosting),
            _ => Err(format!(
                "Unknown model type: {}. Expected one of decision_tree, linear_regression, gradient_boosting",
                s
            )),
        }
    }
}

/// Declarative registry entry: a named estimator, fixed parameters applied to
/// its template, and the grid searched on top of them.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CandidateSpec {
    pub name: String,
    pub model: ModelKind,
    #[serde(default)]
    pub params: ParamSet,
    #[serde(default)]
    pub grid: ParamGrid,
}

impl CandidateSpec {
    pub fn new(name: &str, model: ModelKind) -> Self {
        Self {
            name: name.to_string(),
            model,
            params: ParamSet::new(),
            grid: ParamGrid::new(),
        }
    }

    pub fn with_grid(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.grid.insert(name.to_string(), values);
        self
    }

    pub fn with_param(mut self, name: &str, value: ParamValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }
}

/// The three default candidates and their search spaces.
pub fn reference_candidates() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new("Decision Tree", ModelKind::DecisionTree)
            .with_grid(
                "criterion",
                vec![
                    "squared_error".into(),
                    "friedman_mse".into(),
                    "absolute_error".into(),
                    "poisson".into(),
                ],
            )
            .with_grid("splitter", vec!["best".into(), "random".into()])
            .with_grid("max_features", vec!["sqrt".into(), "log2".into()]),
        CandidateSpec::new("Linear Regression", ModelKind::LinearRegression),
        CandidateSpec::new("Gradient Boosting", ModelKind::GradientBoosting)
            .with_grid(
                "learning_rate",
                vec![0.001f64.into(), 0.01f64.into(), 0.05f64.into(), 0.1f64.into()],
            )
            .with_grid(
                "n_estimators",
                [8i64, 16, 32, 64, 128, 256].iter().map(|&n| n.into()).collect(),
            ),
    ]
}

/// What to do when a fit fails inside cross-validation.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScore {
    /// Score the fold as NaN and keep searching.
    Nan,
    /// Abort the search.
    Raise,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub n_folds: usize,
    pub shuffle: bool,
    pub seed: u64,
    pub error_score: ErrorScore,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_folds: 3,
            shuffle: false,
            seed: 42,
            error_score: ErrorScore::Nan,
        }
    }
}

/// Central configuration of the trainer. Where the winner is written is the
/// caller's choice, see [`crate::trainer::TrainingOutcome::persist`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrainerConfig {
    pub search: SearchConfig,
    pub quality_floor: f64,
    pub candidates: Vec<CandidateSpec>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            quality_floor: 0.6,
            candidates: reference_candidates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::params::expand_grid;

    #[test]
    fn reference_registry_sizes() {
        let specs = reference_candidates();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Decision Tree", "Linear Regression", "Gradient Boosting"]);
        assert_eq!(expand_grid(&specs[0].grid).len(), 16);
        assert_eq!(expand_grid(&specs[1].grid).len(), 1);
        assert_eq!(expand_grid(&specs[2].grid).len(), 24);
    }

    #[test]
    fn model_kind_from_str() {
        assert_eq!(ModelKind::from_str("GBDT").unwrap(), ModelKind::GradientBoosting);
        assert_eq!(ModelKind::from_str("linear").unwrap(), ModelKind::LinearRegression);
        assert!(ModelKind::from_str("svm").is_err());
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: TrainerConfig = serde_json::from_str(r#"{"quality_floor": 0.5}"#).unwrap();
        assert_eq!(cfg.quality_floor, 0.5);
        assert_eq!(cfg.search.n_folds, 3);
        assert_eq!(cfg.candidates.len(), 3);
    }

    #[test]
    fn trainer_config_only_carries_what_the_trainer_reads() {
        let value = serde_json::to_value(TrainerConfig::default()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["candidates", "quality_floor", "search"]);
    }

    #[test]
    fn candidate_spec_from_json() {
        let spec: CandidateSpec = serde_json::from_str(
            r#"{"name": "tree", "model": "decision_tree", "grid": {"criterion": ["poisson"]}}"#,
        )
        .unwrap();
        assert_eq!(spec.model, ModelKind::DecisionTree);
        assert!(spec.params.is_empty());
        assert_eq!(spec.grid["criterion"], vec![ParamValue::from("poisson")]);
    }
}
