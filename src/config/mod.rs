use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::analysis::{MetricsError, Windows};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Directory holding the metadata table plus `stocks/` and `etfs/`.
    pub root: PathBuf,
    pub metadata_file: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("../dataset"),
            metadata_file: "symbols_valid_meta.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub short_window: usize,
    pub long_window: usize,
    pub histogram_bins: usize,
    pub sample_rows: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
            histogram_bins: 50,
            sample_rows: 5,
        }
    }
}

/// Command-line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_root: Option<PathBuf>,
    pub short_window: Option<usize>,
    pub long_window: Option<usize>,
    pub histogram_bins: Option<usize>,
    pub sample_rows: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetSettings,
    pub analysis: AnalysisSettings,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Falls back to the built-in defaults when `path` does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Applies `overrides` and validates the merged settings.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Result<Self> {
        if let Some(root) = overrides.dataset_root {
            self.dataset.root = root;
        }
        if let Some(short) = overrides.short_window {
            self.analysis.short_window = short;
        }
        if let Some(long) = overrides.long_window {
            self.analysis.long_window = long;
        }
        if let Some(bins) = overrides.histogram_bins {
            self.analysis.histogram_bins = bins;
        }
        if let Some(rows) = overrides.sample_rows {
            self.analysis.sample_rows = rows;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.windows()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.analysis.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                MetricsError::InvalidBins.to_string(),
            ));
        }
        Ok(())
    }

    pub fn windows(&self) -> std::result::Result<Windows, MetricsError> {
        Windows::new(self.analysis.short_window, self.analysis.long_window)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dataset.root.join(&self.dataset.metadata_file)
    }
}
