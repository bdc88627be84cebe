use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use regsel_models::config::{reference_candidates, CandidateSpec, SearchConfig, TrainerConfig};

use crate::util::validate_tsv_or_csv_file;

/// Where the raw table comes from and how it is split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub path: String,
    /// Name of the target column; the last column when unset.
    pub label_column: Option<String>,
    /// Field separator; inferred from the file extension when unset.
    pub delimiter: Option<char>,
    pub train_fraction: f64,
    pub seed: u64,
    pub artifact_dir: String,
    pub scale_features: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            label_column: None,
            delimiter: None,
            train_fraction: 0.8,
            seed: 42,
            artifact_dir: String::from("artifact"),
            scale_features: false,
        }
    }
}

impl DataConfig {
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.artifact_dir).join(file_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegselConfig {
    pub version: String,
    pub data: DataConfig,
    pub search: SearchConfig,
    pub quality_floor: f64,
    pub model_path: String,
    pub candidates: Vec<CandidateSpec>,
}

impl Default for RegselConfig {
    fn default() -> Self {
        let trainer = TrainerConfig::default();
        Self {
            version: clap::crate_version!().to_string(),
            data: DataConfig::default(),
            search: trainer.search,
            quality_floor: trainer.quality_floor,
            model_path: Path::new("artifact")
                .join("model.json")
                .to_string_lossy()
                .into_owned(),
            candidates: reference_candidates(),
        }
    }
}

impl RegselConfig {
    /// Load `config_path` (defaults when `None`) and apply command line overrides.
    pub fn from_arguments(config_path: Option<&PathBuf>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_config(path)?,
            None => RegselConfig::default(),
        };

        if let Some(data) = matches.get_one::<String>("data") {
            config.data.path = data.clone();
        }
        validate_tsv_or_csv_file(&config.data.path)?;

        if let Some(output_file) = matches.get_one::<String>("output_file") {
            config.model_path = output_file.clone();
        }

        if let Some(floor) = matches.get_one::<f64>("quality_floor") {
            config.quality_floor = *floor;
        }

        Ok(config)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            search: self.search.clone(),
            quality_floor: self.quality_floor,
            candidates: self.candidates.clone(),
        }
    }

    /// `metrics.json` lives next to the model file.
    pub fn metrics_path(&self) -> PathBuf {
        Path::new(&self.model_path)
            .parent()
            .map(|p| p.join("metrics.json"))
            .unwrap_or_else(|| PathBuf::from("metrics.json"))
    }
}

/// Load a pipeline configuration from a JSON file. Missing keys take defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RegselConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: RegselConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
