//! Splits concatenated feature strings into numeric feature columns.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::feature::{FeatureCode, FeatureColumn};
use crate::table::RawTable;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub id_job: i64,
    /// One slot per feature column; `None` is a missing value.
    pub values: Vec<Option<f64>>,
}

/// One row per job, one column per raw feature position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub id_column: String,
    pub code: FeatureCode,
    pub columns: Vec<FeatureColumn>,
    pub rows: Vec<ParsedRow>,
    /// Tokens that failed numeric coercion and were turned into missing values.
    pub malformed_tokens: usize,
}

impl ParsedTable {
    /// Values of the column at `index` (not position), top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.values.get(index).copied().flatten())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Coerces a single token. Unparseable tokens and NaN become missing.
///
/// Returns the value and whether the token was malformed.
fn coerce_token(token: &str) -> (Option<f64>, bool) {
    let token = token.trim();
    if token.is_empty() {
        return (None, false);
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_nan() => (None, false),
        Ok(v) => (Some(v), false),
        Err(_) => (None, true),
    }
}

/// Parses every `features` string into `feature_<code>_<i>` columns.
///
/// All rows must share one code and job ids must be unique. Rows with fewer
/// values than the widest row are padded with missing values.
pub fn parse_features(raw: &RawTable) -> Result<ParsedTable> {
    let split: Vec<(i64, Vec<&str>)> = raw
        .records
        .iter()
        .map(|r| (r.id_job, r.features.split(',').collect()))
        .collect();

    let codes: BTreeSet<&str> = split
        .iter()
        .filter_map(|(_, tokens)| tokens.first().map(|t| t.trim()))
        .collect();
    let code = match codes.first() {
        Some(code) if codes.len() == 1 => FeatureCode::new(code)?,
        _ => {
            return Err(PipelineError::SchemaViolation(format!(
                "expected exactly one feature code, found {}: {:?}",
                codes.len(),
                codes.iter().take(5).collect::<Vec<_>>()
            )))
        }
    };

    let width = split
        .iter()
        .map(|(_, tokens)| tokens.len() - 1)
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Err(PipelineError::SchemaViolation(format!(
            "feature strings for code {} carry no values",
            code
        )));
    }

    let mut seen = HashSet::with_capacity(split.len());
    let mut malformed_tokens = 0;
    let mut rows = Vec::with_capacity(split.len());
    for (id_job, tokens) in split {
        if !seen.insert(id_job) {
            return Err(PipelineError::SchemaViolation(format!(
                "duplicate {} {}",
                raw.id_column, id_job
            )));
        }
        let mut values = Vec::with_capacity(width);
        for token in &tokens[1..] {
            let (value, malformed) = coerce_token(token);
            if malformed {
                debug!(id_job, token = %token, "coerced malformed token to missing");
                malformed_tokens += 1;
            }
            values.push(value);
        }
        values.resize(width, None);
        rows.push(ParsedRow { id_job, values });
    }

    if malformed_tokens > 0 {
        warn!(malformed_tokens, "malformed feature values were treated as missing");
    }

    let columns = (1..=width)
        .map(|position| FeatureColumn::new(code.clone(), position))
        .collect();

    Ok(ParsedTable {
        id_column: raw.id_column.clone(),
        code,
        columns,
        rows,
        malformed_tokens,
    })
}
