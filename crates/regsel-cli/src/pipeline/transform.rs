//! Train/test CSV artifacts → numeric arrays, label last.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;
use ndarray::{s, Array2, Axis};

use regsel_models::io::{read_table, Table};
use regsel_models::preprocessing::{fit_scaler, transform_all, Scaler};

use crate::pipeline::ingest::IngestionOutput;
use crate::pipeline::input::DataConfig;
use crate::util::write_bytes_to_file;

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub train: Table,
    pub test: Table,
    pub preprocessor_path: Option<PathBuf>,
}

fn ensure_finite(name: &str, table: &Table) -> Result<()> {
    if let Some(pos) = table.data.iter().position(|v| !v.is_finite()) {
        let (row, col) = (pos / table.data.ncols(), pos % table.data.ncols());
        bail!(
            "{} contains a non-finite value at row {} column '{}'",
            name,
            row + 1,
            table.headers[col]
        );
    }
    Ok(())
}

/// Standardize every column but the last one.
fn scale_features(table: &Table, scaler: &Scaler) -> Result<Table> {
    let label_idx = table.data.ncols() - 1;
    let features = transform_all(table.data.slice(s![.., ..label_idx]), scaler)?;
    let label = table.data.slice(s![.., label_idx..]);
    let data: Array2<f64> = ndarray::concatenate(Axis(1), &[features.view(), label])
        .context("Failed to reassemble the scaled table")?;
    Ok(Table {
        headers: table.headers.clone(),
        data,
    })
}

pub fn run_transformation(config: &DataConfig, ingested: &IngestionOutput) -> Result<TransformOutput> {
    info!("Reading train and test data");
    let train = read_table(&ingested.train_path, b',')?;
    let test = read_table(&ingested.test_path, b',')?;

    if train.headers != test.headers {
        bail!(
            "Train and test columns differ: {:?} vs {:?}",
            train.headers,
            test.headers
        );
    }
    if train.headers.len() < 2 {
        bail!("Need at least one feature column besides the label");
    }
    ensure_finite("train data", &train)?;
    ensure_finite("test data", &test)?;

    if !config.scale_features {
        return Ok(TransformOutput {
            train,
            test,
            preprocessor_path: None,
        });
    }

    let label_idx = train.data.ncols() - 1;
    let scaler = fit_scaler(train.data.slice(s![.., ..label_idx]))?;
    let train = scale_features(&train, &scaler)?;
    let test = scale_features(&test, &scaler)?;

    let path = config.artifact_path("preprocessor.json");
    save_scaler(&path, &scaler)?;
    info!("Saved preprocessing object to {}", path.display());

    Ok(TransformOutput {
        train,
        test,
        preprocessor_path: Some(path),
    })
}

pub fn save_scaler(path: &Path, scaler: &Scaler) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(scaler)?;
    write_bytes_to_file(path, &bytes)
}

pub fn load_scaler<P: AsRef<Path>>(path: P) -> Result<Scaler> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read preprocessor: {}", path.as_ref().display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse preprocessor: {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regsel_models::io::write_table;

    fn ingested(dir: &Path, train: &Table, test: &Table) -> IngestionOutput {
        let output = IngestionOutput {
            raw_path: dir.join("raw.csv"),
            train_path: dir.join("train.csv"),
            test_path: dir.join("test.csv"),
        };
        write_table(&output.train_path, train, b',').unwrap();
        write_table(&output.test_path, test, b',').unwrap();
        output
    }

    fn table(rows: Vec<[f64; 2]>) -> Table {
        let n = rows.len();
        Table {
            headers: vec!["x".to_string(), "y".to_string()],
            data: Array2::from_shape_vec((n, 2), rows.into_iter().flatten().collect()).unwrap(),
        }
    }

    #[test]
    fn scaler_is_fitted_on_train_only() {
        let dir = tempfile::tempdir().unwrap();
        let train = table(vec![[0.0, 5.0], [2.0, 6.0]]);
        let test = table(vec![[4.0, 7.0]]);
        let config = DataConfig {
            artifact_dir: dir.path().to_string_lossy().into_owned(),
            scale_features: true,
            ..DataConfig::default()
        };
        let out = run_transformation(&config, &ingested(dir.path(), &train, &test)).unwrap();

        assert_eq!(out.train.data.column(0).to_vec(), vec![-1.0, 1.0]);
        assert_eq!(out.test.data[[0, 0]], 3.0);
        // labels untouched
        assert_eq!(out.test.data[[0, 1]], 7.0);

        let scaler = load_scaler(out.preprocessor_path.unwrap()).unwrap();
        assert_eq!(scaler.mean, vec![1.0]);
    }

    #[test]
    fn rejects_nan_cells() {
        let dir = tempfile::tempdir().unwrap();
        let train = table(vec![[0.0, f64::NAN], [2.0, 6.0]]);
        let test = table(vec![[4.0, 7.0]]);
        let err = run_transformation(&DataConfig::default(), &ingested(dir.path(), &train, &test))
            .unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }
}
