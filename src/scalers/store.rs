//! Persistence of fitted statistics as two JSON documents.
//!
//! The mean document and the standard-deviation document each map a raw
//! column name (`feature_<code>_<i>`) to a number, in column order. Non-finite
//! values are written as `null` and read back as NaN. Finite values
//! round-trip exactly.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::feature::FeatureColumn;
use crate::scalers::{StandardScaler, StatisticsMap};

#[derive(Debug, Clone)]
pub struct StatisticsStore {
    mean_path: PathBuf,
    std_path: PathBuf,
}

impl StatisticsStore {
    pub fn new(mean_path: impl Into<PathBuf>, std_path: impl Into<PathBuf>) -> Self {
        Self {
            mean_path: mean_path.into(),
            std_path: std_path.into(),
        }
    }

    /// Store with the default artifact names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join("mean_features_values.json"),
            dir.join("std_features_values.json"),
        )
    }

    pub fn mean_path(&self) -> &Path {
        &self.mean_path
    }

    pub fn std_path(&self) -> &Path {
        &self.std_path
    }

    /// Overwrites both documents. Either both are replaced or, on error,
    /// both keep their previous contents.
    pub fn save(&self, stats: &StatisticsMap) -> Result<()> {
        let mut means = Map::new();
        let mut stds = Map::new();
        for (column, scaler) in stats.iter() {
            means.insert(column.name(), to_json(scaler.mean()));
            stds.insert(column.name(), to_json(scaler.std_dev()));
        }

        let mean_tmp = staging_path(&self.mean_path, "tmp");
        let std_tmp = staging_path(&self.std_path, "tmp");
        let staged = write_document(&mean_tmp, means)
            .and_then(|_| write_document(&std_tmp, stds))
            .and_then(|_| self.commit(&mean_tmp, &std_tmp));
        if let Err(e) = staged {
            let _ = fs::remove_file(&mean_tmp);
            let _ = fs::remove_file(&std_tmp);
            return Err(e);
        }
        info!(
            columns = stats.len(),
            mean_path = %self.mean_path.display(),
            std_path = %self.std_path.display(),
            "saved feature statistics"
        );
        Ok(())
    }

    /// Moves both staged documents into place. The previous std document is
    /// kept aside until the mean document is replaced so a failed second
    /// rename can be rolled back.
    fn commit(&self, mean_tmp: &Path, std_tmp: &Path) -> Result<()> {
        let backup = staging_path(&self.std_path, "bak");
        let had_std = self.std_path.is_file();
        if had_std {
            fs::rename(&self.std_path, &backup)?;
        }
        let restore = || {
            if had_std {
                let _ = fs::rename(&backup, &self.std_path);
            } else {
                let _ = fs::remove_file(&self.std_path);
            }
        };

        if let Err(e) = fs::rename(std_tmp, &self.std_path) {
            if had_std {
                let _ = fs::rename(&backup, &self.std_path);
            }
            return Err(e.into());
        }
        if let Err(e) = fs::rename(mean_tmp, &self.mean_path) {
            restore();
            return Err(e.into());
        }
        if had_std {
            let _ = fs::remove_file(&backup);
        }
        Ok(())
    }

    /// Fails with `UninitializedStatistics` if nothing was saved yet.
    pub fn load(&self) -> Result<StatisticsMap> {
        if !self.mean_path.exists() || !self.std_path.exists() {
            return Err(PipelineError::UninitializedStatistics);
        }
        let means = read_document(&self.mean_path)?;
        let stds = read_document(&self.std_path)?;

        if means.len() != stds.len() {
            return Err(PipelineError::SchemaViolation(format!(
                "mean document has {} columns, std document has {}",
                means.len(),
                stds.len()
            )));
        }

        let mut scalers = Vec::with_capacity(means.len());
        for (name, mean) in &means {
            let column: FeatureColumn = name.parse()?;
            let std_dev = stds.get(name).ok_or_else(|| {
                PipelineError::SchemaViolation(format!("column {} has a mean but no std", name))
            })?;
            scalers.push((
                column,
                StandardScaler::from_parts(from_json(name, mean)?, from_json(name, std_dev)?),
            ));
        }

        if let Some((first, _)) = scalers.first() {
            let code = first.code().clone();
            if let Some((other, _)) = scalers.iter().find(|(c, _)| *c.code() != code) {
                return Err(PipelineError::SchemaViolation(format!(
                    "statistics mix feature codes {} and {}",
                    code,
                    other.code()
                )));
            }
        }

        let stats = StatisticsMap::from_scalers(scalers);
        if stats.is_empty() {
            return Err(PipelineError::UninitializedStatistics);
        }
        debug!(columns = stats.len(), "loaded feature statistics");
        Ok(stats)
    }
}

fn to_json(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn from_json(name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            PipelineError::SchemaViolation(format!("value of {} is not a float", name))
        }),
        other => Err(PipelineError::SchemaViolation(format!(
            "value of {} is not numeric: {}",
            name, other
        ))),
    }
}

fn write_document(path: &Path, document: Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut content = serde_json::to_string_pretty(&Value::Object(document))?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// `<name>.<suffix>` next to `path`.
fn staging_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn read_document(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
