//! Parse, fit or load statistics, standardize, summarize and merge.

use std::collections::HashMap;

use tracing::info;

use crate::deviation::{summarize, DeviationRow};
use crate::error::{PipelineError, Result};
use crate::feature::{FeatureCode, FeatureColumn};
use crate::parser::{parse_features, ParsedTable};
use crate::scalers::{StatisticsMap, StatisticsStore};
use crate::standardize::standardize;
use crate::table::TableReader;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub id_job: i64,
    pub standardized: Vec<Option<f64>>,
    pub max_index: usize,
    pub abs_mean_diff: f64,
}

/// Standardized features joined with the deviation summary, one row per job.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFeatureTable {
    pub id_column: String,
    pub code: FeatureCode,
    pub columns: Vec<FeatureColumn>,
    pub rows: Vec<OutputRow>,
}

impl OutputFeatureTable {
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.columns.len() + 3);
        header.push(self.id_column.clone());
        header.extend(self.columns.iter().map(|c| c.standardized_name()));
        header.push(self.code.max_index_column());
        header.push(self.code.abs_mean_diff_column());
        header
    }

    /// Rows as text cells; missing values are empty cells.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            let mut record = Vec::with_capacity(row.standardized.len() + 3);
            record.push(row.id_job.to_string());
            record.extend(
                row.standardized
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(row.max_index.to_string());
            record.push(row.abs_mean_diff.to_string());
            record
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Standardizes and summarizes `table` with `stats` and joins both on job id.
pub fn calculate_features(table: &ParsedTable, stats: &StatisticsMap) -> Result<OutputFeatureTable> {
    let standardized = standardize(table, stats)?;
    let deviation = summarize(table, stats)?;

    let by_job: HashMap<i64, &DeviationRow> =
        deviation.rows.iter().map(|row| (row.id_job, row)).collect();

    let rows = standardized
        .rows
        .into_iter()
        .map(|row| {
            let summary = by_job.get(&row.id_job).ok_or_else(|| {
                PipelineError::SchemaViolation(format!(
                    "{} {} has no deviation summary",
                    table.id_column, row.id_job
                ))
            })?;
            Ok(OutputRow {
                id_job: row.id_job,
                standardized: row.values,
                max_index: summary.max_index,
                abs_mean_diff: summary.abs_mean_diff,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(OutputFeatureTable {
        id_column: table.id_column.clone(),
        code: standardized.code,
        columns: standardized.columns,
        rows,
    })
}

/// Runs datasets from a reader against one statistics artifact.
pub struct Pipeline<R: TableReader> {
    reader: R,
    store: StatisticsStore,
}

impl<R: TableReader> Pipeline<R> {
    pub fn new(reader: R, store: StatisticsStore) -> Self {
        Self { reader, store }
    }

    pub fn store(&self) -> &StatisticsStore {
        &self.store
    }

    /// With `fit`, statistics are computed from this dataset and persisted
    /// once the output table is complete. Otherwise they are loaded from the
    /// store. Nothing is persisted when any stage fails.
    pub fn run(&self, dataset_name: &str, fit: bool) -> Result<OutputFeatureTable> {
        let raw = self.reader.read(dataset_name)?;
        info!(dataset = dataset_name, rows = raw.records.len(), "read raw table");

        let parsed = parse_features(&raw)?;
        info!(
            code = %parsed.code,
            columns = parsed.columns.len(),
            malformed = parsed.malformed_tokens,
            "parsed features"
        );

        let stats = if fit {
            StatisticsMap::fit(&parsed)
        } else {
            self.store.load()?
        };

        let output = calculate_features(&parsed, &stats)?;
        if fit {
            self.store.save(&stats)?;
        }

        info!(dataset = dataset_name, fit, rows = output.len(), "calculated features");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{RawRecord, RawTable};

    struct MemoryReader(Vec<(&'static str, Vec<(i64, &'static str)>)>);

    impl TableReader for MemoryReader {
        fn read(&self, dataset_name: &str) -> Result<RawTable> {
            let (_, records) = self
                .0
                .iter()
                .find(|(name, _)| *name == dataset_name)
                .ok_or_else(|| PipelineError::Config(format!("no dataset {}", dataset_name)))?;
            Ok(RawTable::new(
                "id_job",
                records
                    .iter()
                    .map(|&(id, features)| RawRecord::new(id, features))
                    .collect(),
            ))
        }
    }

    fn pipeline(dir: &std::path::Path) -> Pipeline<MemoryReader> {
        let reader = MemoryReader(vec![
            ("train", vec![(1, "2,1,5"), (2, "2,2,6"), (3, "2,3,7")]),
            ("test", vec![(4, "2,7,2"), (5, "2,0,0")]),
            ("mixed", vec![(1, "2,1,5"), (2, "3,2,6")]),
            ("empty_row", vec![(1, "2,1,5"), (2, "2,x,")]),
        ]);
        Pipeline::new(reader, StatisticsStore::in_dir(dir))
    }

    #[test]
    fn test_fit_then_transform() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());

        let train = pipeline.run("train", true).unwrap();
        assert_eq!(
            train.header(),
            vec![
                "id_job",
                "feature_2_stand_1",
                "feature_2_stand_2",
                "max_feature_2_index",
                "max_feature_2_abs_mean_diff",
            ]
        );
        assert_eq!(train.len(), 3);
        assert_eq!(train.rows[0].standardized, vec![Some(-1.0), Some(-1.0)]);
        assert_eq!(train.rows[0].max_index, 2);
        assert_eq!(train.rows[0].abs_mean_diff, 1.0);

        let test = pipeline.run("test", false).unwrap();
        assert_eq!(test.len(), 2);
        // means from train: 2 and 6
        assert_eq!(test.rows[0].standardized, vec![Some(5.0), Some(-4.0)]);
        assert_eq!(test.rows[0].max_index, 1);
        assert_eq!(test.rows[0].abs_mean_diff, 5.0);
        assert_eq!(test.rows[1].max_index, 1);
        assert_eq!(test.rows[1].abs_mean_diff, 2.0);
    }

    #[test]
    fn test_transform_without_fit() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            pipeline(dir.path()).run("test", false),
            Err(PipelineError::UninitializedStatistics)
        ));
    }

    #[test]
    fn test_failed_fit_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());

        assert!(matches!(
            pipeline.run("mixed", true),
            Err(PipelineError::SchemaViolation(_))
        ));
        assert!(matches!(
            pipeline.run("empty_row", true),
            Err(PipelineError::NoValidFeatures { id_job: 2 })
        ));
        assert!(!pipeline.store().mean_path().exists());
        assert!(!pipeline.store().std_path().exists());
    }

    #[test]
    fn test_records_format() {
        let dir = tempfile::tempdir().unwrap();
        let reader = MemoryReader(vec![("train", vec![(1, "2,1,"), (2, "2,3,4"), (3, "2,5,4")])]);
        let output = Pipeline::new(reader, StatisticsStore::in_dir(dir.path()))
            .run("train", true)
            .unwrap();

        let records: Vec<Vec<String>> = output.records().collect();
        assert_eq!(records[0], vec!["1", "-1", "", "1", "2"]);
        assert_eq!(records[1][2], "NaN");
    }
}
