//! Saving and loading trained models.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ModelKind;
use crate::error::{Result, TrainerError};
use crate::models::factory::restore_model;
use crate::models::params::ParamSet;
use crate::models::regressor_trait::Regressor;
use crate::trainer::TrainingSummary;

/// On-disk form of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedModel {
    pub candidate: String,
    pub kind: String,
    pub params: ParamSet,
    pub state: serde_json::Value,
}

/// A model restored by [`load_model`].
pub struct LoadedModel {
    pub candidate: String,
    pub model: Box<dyn Regressor>,
}

fn create_parent(operation: &'static str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| TrainerError::persistence(operation, parent, e))?;
        }
    }
    Ok(())
}

/// Sibling of `path` that receives the data before it is renamed into place.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_staged<T: Serialize>(staging: &Path, value: &T) -> std::io::Result<()> {
    let file = File::create(staging)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

/// Serialize `value` next to `path` and rename it over the target, so an
/// existing file is either fully replaced or left as it was.
fn write_json<T: Serialize>(operation: &'static str, path: &Path, value: &T) -> Result<()> {
    create_parent(operation, path)?;
    let staging = staging_path(path);
    let written = write_staged(&staging, value).and_then(|_| fs::rename(&staging, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(TrainerError::persistence(operation, path, e));
    }
    Ok(())
}

/// Serialize `model` to `path`, creating parent directories and replacing
/// whatever was there.
pub fn save_model(path: &Path, candidate: &str, model: &dyn Regressor) -> Result<()> {
    let state = model
        .state()
        .map_err(|e| TrainerError::persistence("save_model", path, e))?;
    let persisted = PersistedModel {
        candidate: candidate.to_string(),
        kind: model.kind().to_string(),
        params: model.params(),
        state,
    };
    write_json("save_model", path, &persisted)?;
    info!("Saved model '{}' to {}", candidate, path.display());
    Ok(())
}

pub fn load_model(path: &Path) -> Result<LoadedModel> {
    let file = File::open(path).map_err(|e| TrainerError::persistence("load_model", path, e))?;
    let persisted: PersistedModel = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| TrainerError::persistence("load_model", path, e))?;

    let kind = ModelKind::from_str(&persisted.kind)
        .map_err(|e| TrainerError::persistence("load_model", path, e))?;
    let model = restore_model(kind, persisted.state)
        .map_err(|e| TrainerError::persistence("load_model", path, e))?;

    info!(
        "Loaded model '{}' ({}) from {}",
        persisted.candidate,
        model.kind(),
        path.display()
    );
    Ok(LoadedModel {
        candidate: persisted.candidate,
        model,
    })
}

/// Write the metric record of a run as JSON.
pub fn save_summary(path: &Path, summary: &TrainingSummary) -> Result<()> {
    write_json("save_summary", path, summary)
}
