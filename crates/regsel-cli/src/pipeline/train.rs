use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use log::info;

use regsel_models::trainer::TrainingOutcome;
use regsel_models::ModelTrainer;

use crate::pipeline::ingest::run_ingestion;
use crate::pipeline::input::RegselConfig;
use crate::pipeline::report::write_training_report;
use crate::pipeline::transform::{run_transformation, TransformOutput};

/// Result of a full pipeline run.
#[derive(Debug)]
pub struct TrainingRun {
    pub outcome: TrainingOutcome,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

/// Ingest, transform, search every candidate, then write the metrics, the
/// report and finally the winning model. The model file is only written once
/// every other step has succeeded. A quality floor failure surfaces as a
/// [`regsel_models::TrainerError`] inside the returned error.
pub fn run_training(config: &RegselConfig, write_report: bool) -> Result<TrainingRun> {
    let start_time = Instant::now();

    let trainer = ModelTrainer::from_config(&config.trainer_config())?;
    info!(
        "Searching {} candidate(s): {}",
        trainer.registry().len(),
        trainer.registry().names().join(", ")
    );

    let ingested = run_ingestion(&config.data)?;
    let TransformOutput { train, test, .. } = run_transformation(&config.data, &ingested)?;

    let outcome = trainer.train(train.data.view(), test.data.view())?;
    info!("Training completed in {:?}", start_time.elapsed());

    let metrics_path = config.metrics_path();
    outcome
        .save_summary(&metrics_path)
        .context("Failed to save the metrics summary")?;

    let report_path = if write_report {
        let path = config.data.artifact_path("report.html");
        write_training_report(&outcome, &test, config, &path)?;
        info!("Report written to {}", path.display());
        Some(path)
    } else {
        None
    };

    let model_path = PathBuf::from(&config.model_path);
    if let Err(e) = outcome.persist(&model_path) {
        log::error!(
            "Model '{}' was trained (test r2 {:.4}) but could not be saved",
            outcome.best_candidate,
            outcome.best_test_r2()
        );
        return Err(e.into());
    }

    Ok(TrainingRun {
        outcome,
        model_path,
        metrics_path,
        report_path,
    })
}

/// Human readable summary printed on stdout after a successful run.
pub fn format_outcome(outcome: &TrainingOutcome) -> String {
    let train = outcome.train_metrics;
    let test = outcome.test_metrics;
    format!(
        "{}\nBest Model selected: {}\n\
         Train Dataset Metrics: RMSE: {}, MSE: {}, R2 Score: {}\n\
         Test Dataset Metrics: RMSE: {}, MSE: {}, R2 Score: {}",
        outcome.best_test_r2(),
        outcome.best_candidate,
        train.rmse,
        train.mse,
        train.r2,
        test.rmse,
        test.mse,
        test.r2
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsel_models::config::{CandidateSpec, ModelKind};
    use regsel_models::models::params::ParamValue;
    use std::fs;
    use std::path::Path;

    fn linear_config(dir: &Path) -> RegselConfig {
        let data = dir.join("data.csv");
        let mut body = String::from("x,y\n");
        for i in 0..30 {
            body.push_str(&format!("{},{}\n", i, 3 * i + 2));
        }
        fs::write(&data, body).unwrap();

        let mut config = RegselConfig::default();
        config.data.path = data.to_string_lossy().into_owned();
        config.data.artifact_dir = dir.join("artifact").to_string_lossy().into_owned();
        config.model_path = dir
            .join("artifact")
            .join("model.json")
            .to_string_lossy()
            .into_owned();
        config.candidates = vec![CandidateSpec::new("Linear Regression", ModelKind::LinearRegression)];
        config
    }

    #[test]
    fn writes_model_metrics_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = linear_config(dir.path());
        let run = run_training(&config, true).unwrap();
        assert!(run.model_path.exists());
        assert!(run.metrics_path.exists());
        assert!(run.report_path.unwrap().exists());
        assert_eq!(run.outcome.best_candidate, "Linear Regression");
    }

    #[test]
    fn failed_report_leaves_no_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = linear_config(dir.path());
        // a directory where the report file should go
        fs::create_dir_all(config.data.artifact_path("report.html")).unwrap();

        assert!(run_training(&config, true).is_err());
        assert!(!Path::new(&config.model_path).exists());
    }

    #[test]
    fn invalid_registry_fails_before_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = linear_config(dir.path());
        config.candidates = vec![CandidateSpec::new("lr", ModelKind::LinearRegression)
            .with_grid("alpha", vec![ParamValue::Float(1.0)])];

        let err = run_training(&config, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<regsel_models::TrainerError>(),
            Some(regsel_models::TrainerError::Configuration { .. })
        ));
        assert!(!config.data.artifact_path("raw.csv").exists());
        assert!(!config.data.artifact_path("train.csv").exists());
    }
}
