use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by an individual estimator.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("model must be fitted before calling predict")]
    NotFitted,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl ModelError {
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the training pipeline. Every variant names the operation
/// that failed so a log line is enough to locate the problem.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("[{operation}] configuration error: {message}")]
    Configuration {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<ModelError>,
    },

    #[error("[{operation}] invalid data: {message}")]
    Data {
        operation: &'static str,
        message: String,
    },

    #[error("[{operation}] fit failed for candidate '{candidate}'")]
    Fit {
        operation: &'static str,
        candidate: String,
        #[source]
        source: ModelError,
    },

    #[error(
        "no acceptable model found: best test r2 {best_test_r2:.4} ('{best_candidate}') is below the quality floor {floor}"
    )]
    QualityFloor {
        best_candidate: String,
        best_test_r2: f64,
        floor: f64,
    },

    #[error("[{operation}] failed to persist model at {}", .path.display())]
    Persistence {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TrainerError {
    pub fn config(operation: &'static str, message: impl Into<String>) -> Self {
        TrainerError::Configuration {
            operation,
            message: message.into(),
            source: None,
        }
    }

    pub fn data(operation: &'static str, message: impl Into<String>) -> Self {
        TrainerError::Data {
            operation,
            message: message.into(),
        }
    }

    pub fn persistence<E>(operation: &'static str, path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TrainerError::Persistence {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }

    /// True for the "no usable model" outcome, as opposed to a crash.
    pub fn is_quality_floor(&self) -> bool {
        matches!(self, TrainerError::QualityFloor { .. })
    }
}

pub type Result<T, E = TrainerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn fit_error_keeps_model_cause() {
        let err = TrainerError::Fit {
            operation: "grid_search",
            candidate: "Decision Tree".to_string(),
            source: ModelError::NotFitted,
        };
        assert!(err.to_string().contains("grid_search"));
        assert!(err.to_string().contains("Decision Tree"));
        assert!(err.source().is_some());
    }

    #[test]
    fn quality_floor_is_flagged() {
        let err = TrainerError::QualityFloor {
            best_candidate: "Linear Regression".to_string(),
            best_test_r2: 0.12,
            floor: 0.6,
        };
        assert!(err.is_quality_floor());
        assert!(!TrainerError::data("split", "bad").is_quality_floor());
    }
}
