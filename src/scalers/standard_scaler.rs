use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::feature::FeatureColumn;
use crate::parser::ParsedTable;

/// Mean and sample standard deviation of one feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardScaler {
    mean: f64,
    std_dev: f64,
}

impl StandardScaler {
    /// Fits over the present values only. With no values the mean is NaN,
    /// with fewer than two values the standard deviation is NaN.
    pub fn new(data: impl IntoIterator<Item = Option<f64>>) -> Self {
        let present: Vec<f64> = data.into_iter().flatten().collect();
        let n = present.len() as f64;

        let mean = if present.is_empty() {
            f64::NAN
        } else {
            present.iter().sum::<f64>() / n
        };
        let std_dev = if present.len() < 2 {
            f64::NAN
        } else {
            let var = present.iter().map(|&value| (value - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };

        StandardScaler { mean, std_dev }
    }

    pub fn from_parts(mean: f64, std_dev: f64) -> Self {
        StandardScaler { mean, std_dev }
    }

    /// `(value - mean) / std_dev`, with IEEE division: a zero standard
    /// deviation yields +/-inf, or NaN for a value equal to the mean.
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

/// Per-column statistics of one feature group, ordered by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsMap {
    scalers: BTreeMap<FeatureColumn, StandardScaler>,
}

impl StatisticsMap {
    /// Computes statistics for every feature column of `table`. The id
    /// column is never part of `table.columns`.
    pub fn fit(table: &ParsedTable) -> Self {
        let scalers: BTreeMap<FeatureColumn, StandardScaler> = table
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| (column.clone(), StandardScaler::new(table.column_values(index))))
            .collect();
        debug!(columns = scalers.len(), rows = table.len(), "fitted feature statistics");
        Self { scalers }
    }

    pub fn from_scalers(scalers: impl IntoIterator<Item = (FeatureColumn, StandardScaler)>) -> Self {
        Self {
            scalers: scalers.into_iter().collect(),
        }
    }

    pub fn get(&self, column: &FeatureColumn) -> Result<&StandardScaler> {
        self.scalers
            .get(column)
            .ok_or_else(|| PipelineError::UnknownFeatureColumn { column: column.name() })
    }

    /// Looks up every column up front so schema drift is reported before any
    /// value is computed.
    pub fn resolve(&self, columns: &[FeatureColumn]) -> Result<Vec<StandardScaler>> {
        if self.is_empty() {
            return Err(PipelineError::UninitializedStatistics);
        }
        columns.iter().map(|c| self.get(c).copied()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FeatureColumn, &StandardScaler)> {
        self.scalers.iter()
    }

    pub fn len(&self) -> usize {
        self.scalers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalers.is_empty()
    }
}
