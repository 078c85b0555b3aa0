//! Z-score standardization of raw feature columns.

use tracing::debug;

use crate::error::Result;
use crate::feature::{FeatureCode, FeatureColumn};
use crate::parser::ParsedTable;
use crate::scalers::StatisticsMap;

#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedRow {
    pub id_job: i64,
    pub values: Vec<Option<f64>>,
}

/// Same shape as the parsed table; columns are named `feature_<code>_stand_<i>`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedTable {
    pub code: FeatureCode,
    pub columns: Vec<FeatureColumn>,
    pub rows: Vec<StandardizedRow>,
}

/// Standardizes every feature column of `table` with `stats`.
///
/// Missing values stay missing. A zero standard deviation follows IEEE
/// division (see [`crate::scalers::StandardScaler::transform`]).
pub fn standardize(table: &ParsedTable, stats: &StatisticsMap) -> Result<StandardizedTable> {
    let scalers = stats.resolve(&table.columns)?;

    let rows = table
        .rows
        .iter()
        .map(|row| StandardizedRow {
            id_job: row.id_job,
            values: row
                .values
                .iter()
                .zip(&scalers)
                .map(|(value, scaler)| value.map(|v| scaler.transform(v)))
                .collect(),
        })
        .collect();

    debug!(rows = table.len(), columns = scalers.len(), "standardized features");
    Ok(StandardizedTable {
        code: table.code.clone(),
        columns: table.columns.clone(),
        rows,
    })
}
