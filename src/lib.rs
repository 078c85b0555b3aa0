//! Job feature preprocessing
//!
//! Turns `id_job` + concatenated feature strings into standardized feature
//! columns plus a per-job maximum-feature summary, using statistics fitted on
//! a training dataset and persisted for later transform-only runs.

pub mod config;
pub mod deviation;
pub mod error;
pub mod feature;
pub mod parser;
pub mod pipeline;
pub mod scalers;
pub mod standardize;
pub mod table;

pub use config::Config;
pub use deviation::{summarize, DeviationRow, DeviationTable};
pub use error::{PipelineError, Result};
pub use feature::{FeatureCode, FeatureColumn};
pub use parser::{parse_features, ParsedRow, ParsedTable};
pub use pipeline::{calculate_features, OutputFeatureTable, OutputRow, Pipeline};
pub use scalers::{StandardScaler, StatisticsMap, StatisticsStore};
pub use standardize::{standardize, StandardizedRow, StandardizedTable};
pub use table::{RawRecord, RawTable, TableReader, TableWriter, TsvTableReader, TsvTableWriter};
