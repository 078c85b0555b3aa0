use thiserror::Error;

/// Errors that abort a preprocessing run.
///
/// Malformed numeric tokens are not represented here: they are coerced to
/// missing values by the parser and only counted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Feature statistics are not initialized - run a fit first")]
    UninitializedStatistics,

    #[error("No statistics entry for feature column {column}")]
    UnknownFeatureColumn { column: String },

    #[error("Job {id_job} has no valid feature values")]
    NoValidFeatures { id_job: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
