//! Per-job maximum feature and its deviation from the fitted mean.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::feature::{FeatureCode, FeatureColumn};
use crate::parser::ParsedTable;
use crate::scalers::{StandardScaler, StatisticsMap};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRow {
    pub id_job: i64,
    /// Position `i` of the raw column holding the row maximum.
    pub max_index: usize,
    /// `|max value - fitted mean of that column|`
    pub abs_mean_diff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviationTable {
    pub code: FeatureCode,
    pub rows: Vec<DeviationRow>,
}

/// Left-to-right scan over present, non-NaN values; the first column
/// reaching the maximum wins.
fn row_max<'a>(
    columns: &'a [FeatureColumn],
    scalers: &'a [StandardScaler],
    values: &[Option<f64>],
) -> Option<(&'a FeatureColumn, &'a StandardScaler, f64)> {
    let mut best: Option<(&FeatureColumn, &StandardScaler, f64)> = None;
    for ((column, scaler), value) in columns.iter().zip(scalers).zip(values) {
        let Some(value) = value.filter(|v| !v.is_nan()) else { continue };
        match best {
            Some((_, _, max)) if value <= max => {}
            _ => best = Some((column, scaler, value)),
        }
    }
    best
}

/// Summarizes each job by its maximum raw feature.
///
/// The mean comes from `stats`, never from `table`, so a transform run uses
/// the same means as the fit it was loaded from. A job whose values are all
/// missing aborts with `NoValidFeatures`.
pub fn summarize(table: &ParsedTable, stats: &StatisticsMap) -> Result<DeviationTable> {
    let scalers = stats.resolve(&table.columns)?;

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let (column, scaler, max) = row_max(&table.columns, &scalers, &row.values)
                .ok_or(PipelineError::NoValidFeatures { id_job: row.id_job })?;
            Ok(DeviationRow {
                id_job: row.id_job,
                max_index: column.position(),
                abs_mean_diff: (max - scaler.mean()).abs(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = rows.len(), "summarized feature maxima");
    Ok(DeviationTable {
        code: table.code.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_features;
    use crate::table::{RawRecord, RawTable};

    fn parsed(records: &[(i64, &str)]) -> ParsedTable {
        let raw = RawTable::new(
            "id_job",
            records
                .iter()
                .map(|&(id, features)| RawRecord::new(id, features))
                .collect(),
        );
        parse_features(&raw).unwrap()
    }

    fn means(table: &ParsedTable, means: &[f64]) -> StatisticsMap {
        StatisticsMap::from_scalers(
            table
                .columns
                .iter()
                .cloned()
                .zip(means.iter().map(|&m| StandardScaler::from_parts(m, 1.0))),
        )
    }

    #[test]
    fn test_first_maximum_wins() {
        let table = parsed(&[(1, "2,5,5,3")]);
        let stats = means(&table, &[0.0, 0.0, 0.0]);
        let result = summarize(&table, &stats).unwrap();
        assert_eq!(result.rows[0].max_index, 1);
    }

    #[test]
    fn test_abs_mean_diff_uses_winning_column_mean() {
        let table = parsed(&[(1, "2,1,5,3"), (2, "2,9,0,0")]);
        let stats = means(&table, &[10.0, 2.0, 100.0]);
        let result = summarize(&table, &stats).unwrap();

        assert_eq!(
            result.rows,
            vec![
                DeviationRow { id_job: 1, max_index: 2, abs_mean_diff: 3.0 },
                DeviationRow { id_job: 2, max_index: 1, abs_mean_diff: 1.0 },
            ]
        );
        assert_eq!(result.code.max_index_column(), "max_feature_2_index");
        assert_eq!(result.code.abs_mean_diff_column(), "max_feature_2_abs_mean_diff");
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let table = parsed(&[(1, "2,x,-4,-7"), (2, "2,-1,,")]);
        let stats = means(&table, &[0.0, 0.0, 0.0]);
        let result = summarize(&table, &stats).unwrap();

        assert_eq!(result.rows[0].max_index, 2);
        assert_eq!(result.rows[0].abs_mean_diff, 4.0);
        assert_eq!(result.rows[1].max_index, 1);
    }

    #[test]
    fn test_nan_values_never_win() {
        let mut table = parsed(&[(1, "2,1,3,2"), (2, "2,4,5,6")]);
        table.rows[0].values[0] = Some(f64::NAN);
        table.rows[1].values = vec![Some(f64::NAN), None, Some(6.0)];
        let stats = means(&table, &[0.0, 1.0, 0.0]);

        let result = summarize(&table, &stats).unwrap();
        assert_eq!(result.rows[0].max_index, 2);
        assert_eq!(result.rows[0].abs_mean_diff, 2.0);
        assert_eq!(result.rows[1].max_index, 3);

        table.rows[1].values = vec![Some(f64::NAN), None, None];
        assert!(matches!(
            summarize(&table, &stats),
            Err(PipelineError::NoValidFeatures { id_job: 2 })
        ));
    }

    #[test]
    fn test_all_missing_row_fails() {
        let table = parsed(&[(1, "2,1,2"), (7, "2,abc,nan")]);
        let stats = means(&table, &[0.0, 0.0]);
        assert!(matches!(
            summarize(&table, &stats),
            Err(PipelineError::NoValidFeatures { id_job: 7 })
        ));
    }

    #[test]
    fn test_unknown_column_is_reported_even_if_it_never_wins() {
        let table = parsed(&[(1, "2,9,1")]);
        let stats = StatisticsMap::from_scalers([(
            table.columns[0].clone(),
            StandardScaler::from_parts(0.0, 1.0),
        )]);
        assert!(matches!(
            summarize(&table, &stats),
            Err(PipelineError::UnknownFeatureColumn { .. })
        ));
    }
}
