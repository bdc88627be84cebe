//! Exhaustive cross-validated grid search.

use log::{debug, info, warn};
use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{ErrorScore, SearchConfig};
use crate::error::{ModelError, Result, TrainerError};
use crate::metrics::r2_score;
use crate::models::params::{expand_grid, format_params, ParamGrid, ParamSet};
use crate::models::regressor_trait::Regressor;
use crate::search::kfold::{Fold, KFold};

/// Cross-validation result of one hyperparameter combination.
#[derive(Debug, Clone, Serialize)]
pub struct CombinationScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    /// Mean validation r2; NaN when any fold failed.
    pub mean_score: f64,
}

/// Best combination of one candidate, refit on the full training set.
pub struct SearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub model: Box<dyn Regressor>,
    pub scores: Vec<CombinationScore>,
}

impl std::fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchResult")
            .field("best_params", &self.best_params)
            .field("best_score", &self.best_score)
            .field("model", &self.model.kind())
            .field("n_combinations", &self.scores.len())
            .finish()
    }
}

pub struct GridSearch {
    config: SearchConfig,
}

impl GridSearch {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    fn kfold(&self) -> KFold {
        let kfold = KFold::new(self.config.n_folds);
        if self.config.shuffle {
            kfold.with_shuffle(self.config.seed)
        } else {
            kfold
        }
    }

    /// Score every combination of `grid` on `template`, then refit a fresh
    /// copy with the best one on all of `x`/`y`.
    ///
    /// Combinations are scored in parallel but compared in enumeration order,
    /// so ties go to the first combination.
    pub fn run(
        &self,
        candidate: &str,
        template: &dyn Regressor,
        grid: &ParamGrid,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> Result<SearchResult> {
        if x.nrows() != y.len() {
            return Err(TrainerError::data(
                "grid_search",
                format!(
                    "feature rows ({}) and labels ({}) differ",
                    x.nrows(),
                    y.len()
                ),
            ));
        }
        let folds = self.kfold().split(x.nrows())?;
        let combinations = expand_grid(grid);

        info!(
            "[{}] grid search over {} combination(s) with {}-fold CV",
            candidate,
            combinations.len(),
            folds.len()
        );

        let scores = combinations
            .par_iter()
            .map(|params| self.score_combination(candidate, template, params, &folds, x, y))
            .collect::<Vec<Result<CombinationScore>>>()
            .into_iter()
            .collect::<Result<Vec<CombinationScore>>>()?;

        let mut best: Option<&CombinationScore> = None;
        for score in &scores {
            if score.mean_score.is_nan() {
                continue;
            }
            match best {
                Some(b) if score.mean_score <= b.mean_score => {}
                _ => best = Some(score),
            }
        }
        let (best_params, best_score) = match best {
            Some(b) => (b.params.clone(), b.mean_score),
            None => {
                return Err(TrainerError::Fit {
                    operation: "grid_search",
                    candidate: candidate.to_string(),
                    source: ModelError::Numerical(format!(
                        "all {} combination(s) failed cross-validation",
                        scores.len()
                    )),
                })
            }
        };

        info!(
            "[{}] best params {} with mean CV r2 {:.4}",
            candidate,
            format_params(&best_params),
            best_score
        );

        let mut model = template.fresh();
        model
            .set_params(&best_params)
            .map_err(|e| invalid_param(candidate, e))?;
        model.fit(x, y).map_err(|source| TrainerError::Fit {
            operation: "refit",
            candidate: candidate.to_string(),
            source,
        })?;

        Ok(SearchResult {
            best_params,
            best_score,
            model,
            scores,
        })
    }

    fn score_combination(
        &self,
        candidate: &str,
        template: &dyn Regressor,
        params: &ParamSet,
        folds: &[Fold],
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
    ) -> Result<CombinationScore> {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for (fold_idx, fold) in folds.iter().enumerate() {
            let mut model = template.fresh();
            model
                .set_params(params)
                .map_err(|e| invalid_param(candidate, e))?;

            match fit_and_score(model.as_mut(), fold, x, y) {
                Ok(score) => {
                    debug!(
                        "[{}] {} fold {}: r2 {:.4}",
                        candidate,
                        format_params(params),
                        fold_idx,
                        score
                    );
                    fold_scores.push(score);
                }
                Err(source) => match self.config.error_score {
                    ErrorScore::Raise => {
                        return Err(TrainerError::Fit {
                            operation: "grid_search",
                            candidate: candidate.to_string(),
                            source,
                        })
                    }
                    ErrorScore::Nan => {
                        warn!(
                            "[{}] fit failed for {} on fold {}, scoring NaN: {}",
                            candidate,
                            format_params(params),
                            fold_idx,
                            source
                        );
                        fold_scores.push(f64::NAN);
                    }
                },
            }
        }

        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        Ok(CombinationScore {
            params: params.clone(),
            fold_scores,
            mean_score,
        })
    }
}

fn fit_and_score(
    model: &mut dyn Regressor,
    fold: &Fold,
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
) -> std::result::Result<f64, ModelError> {
    let x_train = x.select(Axis(0), &fold.train_indices);
    let y_train = y.select(Axis(0), &fold.train_indices);
    let x_val = x.select(Axis(0), &fold.test_indices);
    let y_val = y.select(Axis(0), &fold.test_indices);

    model.fit(x_train.view(), y_train.view())?;
    let predictions = model.predict(x_val.view())?;
    r2_score(y_val.view(), predictions.view())
}

fn invalid_param(candidate: &str, source: ModelError) -> TrainerError {
    TrainerError::Configuration {
        operation: "grid_search",
        message: format!("candidate '{}' rejected a grid value", candidate),
        source: Some(source),
    }
}
