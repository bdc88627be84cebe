//! Raw table → raw/train/test CSV artifacts.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use regsel_models::io::{infer_delimiter, read_labeled_table, train_test_split, write_table};

use crate::pipeline::input::DataConfig;

#[derive(Debug, Clone)]
pub struct IngestionOutput {
    pub raw_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

pub(crate) fn resolve_delimiter(config: &DataConfig) -> Result<u8> {
    match config.delimiter {
        Some(c) if c.is_ascii() => Ok(c as u8),
        Some(c) => bail!("Delimiter must be a single ASCII character, got '{}'", c),
        None => Ok(infer_delimiter(&config.path)),
    }
}

/// Read the source table, keep a raw copy and split it into train and test
/// files under `artifact_dir`. The label column is written last.
pub fn run_ingestion(config: &DataConfig) -> Result<IngestionOutput> {
    info!("Entered the data ingestion method");
    let delimiter = resolve_delimiter(config)?;

    let table = read_labeled_table(&config.path, delimiter, config.label_column.as_deref())
        .with_context(|| format!("Failed to ingest {}", config.path))?;
    info!(
        "Read {} rows x {} columns from {} (label: {})",
        table.n_rows(),
        table.headers.len(),
        config.path,
        table.headers.last().map(String::as_str).unwrap_or("?")
    );

    let output = IngestionOutput {
        raw_path: config.artifact_path("raw.csv"),
        train_path: config.artifact_path("train.csv"),
        test_path: config.artifact_path("test.csv"),
    };
    write_table(&output.raw_path, &table, b',')?;

    let (train, test) = train_test_split(&table, config.train_fraction, config.seed)
        .context("Failed to split the dataset")?;
    write_table(&output.train_path, &train, b',')?;
    write_table(&output.test_path, &test, b',')?;

    info!(
        "Ingestion of the data is completed: {} train rows, {} test rows",
        train.n_rows(),
        test.n_rows()
    );
    Ok(output)
}
