//! Best-model selection over scored candidates.

use log::info;

use crate::error::{Result, TrainerError};
use crate::metrics::MetricSet;
use crate::models::params::ParamSet;
use crate::models::regressor_trait::Regressor;

/// A refit candidate together with its train and test metrics.
pub struct ScoredCandidate {
    pub name: String,
    pub model: Box<dyn Regressor>,
    pub params: ParamSet,
    pub train: MetricSet,
    pub test: MetricSet,
}

impl std::fmt::Debug for ScoredCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoredCandidate")
            .field("name", &self.name)
            .field("model", &self.model.kind())
            .field("params", &self.params)
            .field("train", &self.train)
            .field("test", &self.test)
            .finish()
    }
}

/// Running best of the candidate loop.
///
/// `best_test_r2` starts at negative infinity and only moves when a candidate
/// scores strictly higher, so it never decreases and ties keep the earlier
/// candidate. A NaN test score never replaces the incumbent.
#[derive(Debug)]
pub struct SelectionState {
    best: Option<ScoredCandidate>,
    best_test_r2: f64,
    observed: usize,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            best: None,
            best_test_r2: f64::NEG_INFINITY,
            observed: 0,
        }
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one scored candidate into the state. Losing candidates are dropped.
    pub fn observe(mut self, candidate: ScoredCandidate) -> Self {
        self.observed += 1;
        if candidate.test.r2 > self.best_test_r2 {
            info!(
                "New best model: {} (test r2 {:.4}, previous {:.4})",
                candidate.name, candidate.test.r2, self.best_test_r2
            );
            self.best_test_r2 = candidate.test.r2;
            self.best = Some(candidate);
        }
        self
    }

    pub fn best_test_r2(&self) -> f64 {
        self.best_test_r2
    }

    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.best.as_ref()
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Close the loop: the winner, or `QualityFloor` when it scores below `floor`.
    pub fn finish(self, floor: f64) -> Result<ScoredCandidate> {
        let observed = self.observed;
        let best = self.best.ok_or_else(|| {
            TrainerError::config(
                "select",
                format!(
                    "no candidate produced a comparable test score ({} evaluated)",
                    observed
                ),
            )
        })?;
        if best.test.r2 < floor {
            return Err(TrainerError::QualityFloor {
                best_candidate: best.name,
                best_test_r2: best.test.r2,
                floor,
            });
        }
        Ok(best)
    }
}
