use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::scalers::StatisticsStore;
use crate::table::{TsvTableReader, TsvTableWriter};

/// Run configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub statistics: StatisticsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub delimiter: char,
    pub id_column: String,
    pub features_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    pub mean_path: PathBuf,
    pub std_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub suffix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            dir: PathBuf::from("data"),
            extension: "tsv".to_string(),
            delimiter: '\t',
            id_column: "id_job".to_string(),
            features_column: "features".to_string(),
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        StatisticsConfig {
            mean_path: PathBuf::from("mean_features_values.json"),
            std_path: PathBuf::from("std_features_values.json"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            suffix: "_proc".to_string(),
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config: {}", e)))?;
        config.delimiter()?;
        Ok(config)
    }

    fn delimiter(&self) -> Result<u8> {
        u8::try_from(self.data.delimiter)
            .ok()
            .filter(|d| d.is_ascii() && *d != b',')
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "delimiter {:?} must be a single ASCII character other than ','",
                    self.data.delimiter
                ))
            })
    }

    pub fn table_reader(&self) -> Result<TsvTableReader> {
        Ok(TsvTableReader {
            dir: self.data.dir.clone(),
            extension: self.data.extension.clone(),
            delimiter: self.delimiter()?,
            id_column: self.data.id_column.clone(),
            features_column: self.data.features_column.clone(),
        })
    }

    pub fn table_writer(&self) -> Result<TsvTableWriter> {
        Ok(TsvTableWriter {
            dir: self.data.dir.clone(),
            extension: self.data.extension.clone(),
            delimiter: self.delimiter()?,
            suffix: self.output.suffix.clone(),
        })
    }

    pub fn statistics_store(&self) -> StatisticsStore {
        StatisticsStore::new(&self.statistics.mean_path, &self.statistics.std_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let reader = config.table_reader().unwrap();
        assert_eq!(reader.path_for("train"), PathBuf::from("data/train.tsv"));
        assert_eq!(reader.delimiter, b'\t');

        let writer = config.table_writer().unwrap();
        assert_eq!(writer.path_for("test"), PathBuf::from("data/test_proc.tsv"));

        let store = config.statistics_store();
        assert_eq!(store.mean_path(), Path::new("mean_features_values.json"));
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            [data]
            dir = "input"
            delimiter = ";"

            [statistics]
            mean_path = "stats/mean.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.data.dir, PathBuf::from("input"));
        assert_eq!(config.data.id_column, "id_job");
        assert_eq!(config.table_reader().unwrap().delimiter, b';');
        assert_eq!(config.statistics.mean_path, PathBuf::from("stats/mean.json"));
        assert_eq!(config.statistics.std_path, PathBuf::from("std_features_values.json"));
        assert_eq!(config.output.suffix, "_proc");
    }

    #[test]
    fn test_rejects_comma_delimiter() {
        let err = Config::from_toml("[data]\ndelimiter = \",\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("config.toml")).unwrap();
        assert_eq!(config.data.extension, "tsv");
    }
}
