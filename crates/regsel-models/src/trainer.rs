//! Candidate registry and the train → score → select loop.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::config::{reference_candidates, CandidateSpec, SearchConfig, TrainerConfig};
use crate::dataset::split_features_label;
use crate::error::{ModelError, Result, TrainerError};
use crate::metrics::MetricSet;
use crate::models::factory::build_model;
use crate::models::params::{format_params, ParamGrid, ParamSet};
use crate::models::regressor_trait::Regressor;
use crate::persist;
use crate::search::GridSearch;
use crate::selection::{ScoredCandidate, SelectionState};

/// A named, unfitted estimator template and the grid searched over it.
pub struct Candidate {
    pub name: String,
    pub template: Box<dyn Regressor>,
    pub grid: ParamGrid,
}

impl Candidate {
    pub fn new(name: impl Into<String>, template: Box<dyn Regressor>, grid: ParamGrid) -> Self {
        Self {
            name: name.into(),
            template,
            grid,
        }
    }

    fn from_spec(spec: &CandidateSpec) -> Result<Self> {
        let mut template = build_model(spec.model);
        template
            .set_params(&spec.params)
            .map_err(|source| TrainerError::Configuration {
                operation: "build_registry",
                message: format!("candidate '{}' has an invalid fixed parameter", spec.name),
                source: Some(source),
            })?;
        Ok(Candidate::new(spec.name.clone(), template, spec.grid.clone()))
    }
}

/// Ordered, validated set of candidates. Iteration order is evaluation order.
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    /// Validate and wrap `candidates`. Every grid value is applied to a scratch
    /// copy of its template so a malformed entry fails here, not mid-search.
    pub fn new(candidates: Vec<Candidate>) -> Result<Self> {
        if candidates.is_empty() {
            return Err(TrainerError::config(
                "build_registry",
                "the candidate registry is empty",
            ));
        }

        let mut names = HashSet::new();
        for candidate in &candidates {
            if !names.insert(candidate.name.as_str()) {
                return Err(TrainerError::config(
                    "build_registry",
                    format!("duplicate candidate name '{}'", candidate.name),
                ));
            }
            for (param, values) in &candidate.grid {
                if values.is_empty() {
                    return Err(TrainerError::config(
                        "build_registry",
                        format!(
                            "candidate '{}' lists no values for '{}'",
                            candidate.name, param
                        ),
                    ));
                }
                for value in values {
                    let mut scratch = candidate.template.fresh();
                    scratch
                        .set_param(param, value)
                        .map_err(|source| TrainerError::Configuration {
                            operation: "build_registry",
                            message: format!("candidate '{}' has an invalid grid", candidate.name),
                            source: Some(source),
                        })?;
                }
            }
        }
        Ok(Self { candidates })
    }

    pub fn from_specs(specs: &[CandidateSpec]) -> Result<Self> {
        let candidates = specs
            .iter()
            .map(Candidate::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Self::new(candidates)
    }

    /// Decision tree, linear regression and gradient boosting with their
    /// default grids.
    pub fn reference() -> Result<Self> {
        Self::from_specs(&reference_candidates())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Per-candidate line of the training report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    pub kind: String,
    pub best_params: ParamSet,
    pub cv_score: f64,
    pub train: MetricSet,
    pub test: MetricSet,
}

/// Everything about a run except the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub best_candidate: String,
    pub best_kind: String,
    pub best_params: ParamSet,
    pub best_test_r2: f64,
    pub quality_floor: f64,
    pub train: MetricSet,
    pub test: MetricSet,
    pub candidates: Vec<CandidateReport>,
}

/// The winner of a training run.
pub struct TrainingOutcome {
    pub best_candidate: String,
    pub best_model: Box<dyn Regressor>,
    pub best_params: ParamSet,
    pub train_metrics: MetricSet,
    pub test_metrics: MetricSet,
    /// One entry per candidate, in registry order.
    pub reports: Vec<CandidateReport>,
    /// Running best test r2 after each candidate.
    pub best_r2_trace: Vec<f64>,
    quality_floor: f64,
}

impl std::fmt::Debug for TrainingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingOutcome")
            .field("best_candidate", &self.best_candidate)
            .field("best_model", &self.best_model.kind())
            .field("best_params", &self.best_params)
            .field("train_metrics", &self.train_metrics)
            .field("test_metrics", &self.test_metrics)
            .field("reports", &self.reports)
            .finish()
    }
}

impl TrainingOutcome {
    pub fn best_test_r2(&self) -> f64 {
        self.test_metrics.r2
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> std::result::Result<Array1<f64>, ModelError> {
        self.best_model.predict(x)
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            best_candidate: self.best_candidate.clone(),
            best_kind: self.best_model.kind().to_string(),
            best_params: self.best_params.clone(),
            best_test_r2: self.test_metrics.r2,
            quality_floor: self.quality_floor,
            train: self.train_metrics,
            test: self.test_metrics,
            candidates: self.reports.clone(),
        }
    }

    /// Write the winning model to `path`, replacing any existing file. On
    /// failure the outcome is untouched and can be retried elsewhere.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save_model(path.as_ref(), &self.best_candidate, self.best_model.as_ref())
    }

    pub fn save_summary(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::save_summary(path.as_ref(), &self.summary())
    }
}

pub struct ModelTrainer {
    registry: CandidateRegistry,
    search: SearchConfig,
    quality_floor: f64,
}

impl ModelTrainer {
    pub fn new(registry: CandidateRegistry, search: SearchConfig, quality_floor: f64) -> Result<Self> {
        if !quality_floor.is_finite() {
            return Err(TrainerError::config(
                "new_trainer",
                format!("quality floor must be finite, got {}", quality_floor),
            ));
        }
        Ok(Self {
            registry,
            search,
            quality_floor,
        })
    }

    pub fn from_config(config: &TrainerConfig) -> Result<Self> {
        let registry = CandidateRegistry::from_specs(&config.candidates)?;
        Self::new(registry, config.search.clone(), config.quality_floor)
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    pub fn quality_floor(&self) -> f64 {
        self.quality_floor
    }

    /// Search, refit and score every candidate on `train`, then keep the one
    /// with the highest test r2. Both tables carry the label in their last
    /// column.
    pub fn train(&self, train: ArrayView2<f64>, test: ArrayView2<f64>) -> Result<TrainingOutcome> {
        info!("Splitting training and test input data");
        let (x_train, y_train) = split_features_label(train)?;
        let (x_test, y_test) = split_features_label(test)?;
        if x_train.ncols() != x_test.ncols() {
            return Err(TrainerError::data(
                "train",
                format!(
                    "train has {} feature(s) but test has {}",
                    x_train.ncols(),
                    x_test.ncols()
                ),
            ));
        }

        let search = GridSearch::new(self.search.clone());
        let mut state = SelectionState::new();
        let mut reports = Vec::with_capacity(self.registry.len());
        let mut best_r2_trace = Vec::with_capacity(self.registry.len());

        for candidate in self.registry.iter() {
            info!("Training candidate {}", candidate.name);
            let result = search.run(
                &candidate.name,
                candidate.template.as_ref(),
                &candidate.grid,
                x_train,
                y_train,
            )?;

            let train_metrics = score(&candidate.name, result.model.as_ref(), x_train, y_train)?;
            let test_metrics = score(&candidate.name, result.model.as_ref(), x_test, y_test)?;
            info!(
                "{} {}: train r2 {:.4}, test r2 {:.4}, test rmse {:.4}",
                candidate.name,
                format_params(&result.best_params),
                train_metrics.r2,
                test_metrics.r2,
                test_metrics.rmse
            );

            reports.push(CandidateReport {
                name: candidate.name.clone(),
                kind: result.model.kind().to_string(),
                best_params: result.best_params.clone(),
                cv_score: result.best_score,
                train: train_metrics,
                test: test_metrics,
            });

            state = state.observe(ScoredCandidate {
                name: candidate.name.clone(),
                model: result.model,
                params: result.best_params,
                train: train_metrics,
                test: test_metrics,
            });
            best_r2_trace.push(state.best_test_r2());
        }

        let winner = state.finish(self.quality_floor)?;
        info!(
            "Best model found on both training and testing dataset: {} (test r2 {:.4})",
            winner.name, winner.test.r2
        );

        Ok(TrainingOutcome {
            best_candidate: winner.name,
            best_model: winner.model,
            best_params: winner.params,
            train_metrics: winner.train,
            test_metrics: winner.test,
            reports,
            best_r2_trace,
            quality_floor: self.quality_floor,
        })
    }
}

fn score(
    candidate: &str,
    model: &dyn Regressor,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> Result<MetricSet> {
    let predictions = model.predict(x).map_err(|source| TrainerError::Fit {
        operation: "score",
        candidate: candidate.to_string(),
        source,
    })?;
    MetricSet::evaluate(y, predictions.view()).map_err(|source| TrainerError::Fit {
        operation: "score",
        candidate: candidate.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use crate::models::params::ParamValue;
    use crate::models::LinearRegression;

    #[test]
    fn reference_registry_builds() {
        let registry = CandidateRegistry::reference().unwrap();
        assert_eq!(
            registry.names(),
            vec!["Decision Tree", "Linear Regression", "Gradient Boosting"]
        );
    }

    #[test]
    fn rejects_unsupported_grid_parameter() {
        let spec = CandidateSpec::new("lr", ModelKind::LinearRegression)
            .with_grid("alpha", vec![ParamValue::Float(0.1)]);
        let err = CandidateRegistry::from_specs(&[spec]).err().unwrap();
        assert!(matches!(err, TrainerError::Configuration { source: Some(_), .. }));
    }

    #[test]
    fn rejects_bad_fixed_parameter() {
        let spec = CandidateSpec::new("tree", ModelKind::DecisionTree)
            .with_param("criterion", "gini".into());
        assert!(CandidateRegistry::from_specs(&[spec]).is_err());
    }

    #[test]
    fn rejects_empty_and_duplicate_registries() {
        assert!(CandidateRegistry::new(Vec::new()).is_err());
        let dup = vec![
            Candidate::new("a", Box::new(LinearRegression::new()), ParamGrid::new()),
            Candidate::new("a", Box::new(LinearRegression::new()), ParamGrid::new()),
        ];
        assert!(CandidateRegistry::new(dup).is_err());
    }

    #[test]
    fn rejects_empty_value_list() {
        let mut grid = ParamGrid::new();
        grid.insert("fit_intercept".to_string(), Vec::new());
        let candidates = vec![Candidate::new("a", Box::new(LinearRegression::new()), grid)];
        assert!(CandidateRegistry::new(candidates).is_err());
    }

    #[test]
    fn rejects_non_finite_floor() {
        let registry = CandidateRegistry::reference().unwrap();
        assert!(ModelTrainer::new(registry, SearchConfig::default(), f64::NAN).is_err());
    }
}
