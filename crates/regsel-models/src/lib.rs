//! regsel-models: candidate search and selection for tabular regression.
//!
//! This crate provides a small set of regressors (decision tree, ordinary
//! least squares, gradient boosting via `gbdt`), an exhaustive K-fold grid
//! search, train/test scoring, and a selector that keeps the candidate with
//! the highest held-out r2 above a quality floor. The winning model can be
//! persisted to JSON and reloaded for inference.
//!
//! Dataset IO and feature scaling helpers used by the CLI live here as well so
//! they can be tested next to the models they feed.
pub mod config;
pub mod dataset;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod persist;
pub mod preprocessing;
pub mod search;
pub mod selection;
pub mod trainer;

pub use error::{ModelError, TrainerError};
pub use trainer::{ModelTrainer, TrainingOutcome};
