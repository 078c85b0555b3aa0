//! Delimited table reading and writing.

use std::fs;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::OutputFeatureTable;

/// One input row: a job id and its concatenated feature string.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id_job: i64,
    pub features: String,
}

impl RawRecord {
    pub fn new(id_job: i64, features: impl Into<String>) -> Self {
        Self {
            id_job,
            features: features.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Name of the id column, carried through to the output header.
    pub id_column: String,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(id_column: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            id_column: id_column.into(),
            records,
        }
    }
}

/// Loads a job x feature-string table by dataset name.
pub trait TableReader {
    fn read(&self, dataset_name: &str) -> Result<RawTable>;
}

/// Persists a computed feature table under a dataset name.
pub trait TableWriter {
    fn write(&self, dataset_name: &str, table: &OutputFeatureTable) -> Result<PathBuf>;
}

/// Reads `<dir>/<dataset>.<extension>` delimited files.
#[derive(Debug, Clone)]
pub struct TsvTableReader {
    pub dir: PathBuf,
    pub extension: String,
    pub delimiter: u8,
    pub id_column: String,
    pub features_column: String,
}

impl TsvTableReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "tsv".to_string(),
            delimiter: b'\t',
            id_column: "id_job".to_string(),
            features_column: "features".to_string(),
        }
    }

    pub fn path_for(&self, dataset_name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", dataset_name, self.extension))
    }
}

impl TableReader for TsvTableReader {
    fn read(&self, dataset_name: &str) -> Result<RawTable> {
        let path = self.path_for(dataset_name);
        debug!(path = %path.display(), "reading raw table");
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;

        let headers = reader.headers()?.clone();
        let id_idx = column_index(&headers, &self.id_column, &path)?;
        let features_idx = column_index(&headers, &self.features_column, &path)?;

        let mut records = vec![];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let id = record.get(id_idx).unwrap_or_default().trim();
            let id_job = match id.parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    return Err(PipelineError::SchemaViolation(format!(
                        "row {} of {}: {} value {:?} is not an integer",
                        row + 1,
                        path.display(),
                        self.id_column,
                        id
                    )))
                }
            };
            let features = record.get(features_idx).unwrap_or_default();
            records.push(RawRecord::new(id_job, features));
        }

        Ok(RawTable::new(self.id_column.clone(), records))
    }
}

fn column_index(headers: &StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == column).ok_or_else(|| {
        PipelineError::SchemaViolation(format!(
            "{} has no {:?} column",
            path.display(),
            column
        ))
    })
}

/// Writes `<dir>/<dataset><suffix>.<extension>` delimited files.
#[derive(Debug, Clone)]
pub struct TsvTableWriter {
    pub dir: PathBuf,
    pub extension: String,
    pub delimiter: u8,
    pub suffix: String,
}

impl TsvTableWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "tsv".to_string(),
            delimiter: b'\t',
            suffix: "_proc".to_string(),
        }
    }

    pub fn path_for(&self, dataset_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", dataset_name, self.suffix, self.extension))
    }
}

impl TableWriter for TsvTableWriter {
    fn write(&self, dataset_name: &str, table: &OutputFeatureTable) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(dataset_name);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;

        writer.write_record(table.header())?;
        for record in table.records() {
            writer.write_record(&record)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = table.len(), "wrote feature table");
        Ok(path)
    }
}
