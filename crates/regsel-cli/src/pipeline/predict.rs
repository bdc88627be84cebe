use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use regsel_models::io::{infer_delimiter, read_table};
use regsel_models::persist::load_model;
use regsel_models::preprocessing::transform_all;

use crate::pipeline::transform::load_scaler;
use crate::util::write_bytes_to_file;

/// Predict every row of a feature-only table with a persisted model. Writes
/// one prediction per line to `output`, or stdout when unset. Returns the
/// number of predictions.
pub fn run_prediction(
    model_path: &Path,
    data_path: &Path,
    preprocessor_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<usize> {
    let loaded = load_model(model_path)?;
    info!("Predicting with '{}' ({})", loaded.candidate, loaded.model.kind());

    let table = read_table(data_path, infer_delimiter(data_path))?;
    let features = match preprocessor_path {
        Some(path) => {
            let scaler = load_scaler(path)?;
            transform_all(table.data.view(), &scaler)?
        }
        None => table.data,
    };

    let predictions = loaded
        .model
        .predict(features.view())
        .with_context(|| format!("Failed to predict rows of {}", data_path.display()))?;

    let mut body = String::with_capacity(predictions.len() * 12);
    for p in predictions.iter() {
        body.push_str(&p.to_string());
        body.push('\n');
    }

    match output {
        Some(path) => {
            write_bytes_to_file(path, body.as_bytes())?;
            info!("Wrote {} predictions to {}", predictions.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            writer
                .write_all(body.as_bytes())
                .context("Failed to write predictions to stdout")?;
            writer.flush()?;
        }
    }
    Ok(predictions.len())
}
