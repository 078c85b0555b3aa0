//! Feature codes and feature column identities.
//!
//! A raw feature column is identified by the feature-group code and its
//! 1-based position in the concatenated feature string. Column names such as
//! `feature_2_7` are derived from that pair and are only parsed back when
//! reading a persisted statistics artifact.

use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// Shared tag of a feature group, e.g. `2` in `feature_2_1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureCode(String);

impl FeatureCode {
    /// Validates a code token. Codes are non-empty ASCII alphanumerics so that
    /// every derived column name stays unambiguous.
    pub fn new(code: &str) -> Result<Self> {
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PipelineError::SchemaViolation(format!(
                "feature code {:?} is not an alphanumeric token",
                code
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn max_index_column(&self) -> String {
        format!("max_feature_{}_index", self.0)
    }

    pub fn abs_mean_diff_column(&self) -> String {
        format!("max_feature_{}_abs_mean_diff", self.0)
    }
}

impl fmt::Display for FeatureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw feature column: code plus positional index (1 = first value).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureColumn {
    code: FeatureCode,
    position: usize,
}

impl FeatureColumn {
    pub fn new(code: FeatureCode, position: usize) -> Self {
        Self { code, position }
    }

    pub fn code(&self) -> &FeatureCode {
        &self.code
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// `feature_<code>_<i>`
    pub fn name(&self) -> String {
        format!("feature_{}_{}", self.code, self.position)
    }

    /// `feature_<code>_stand_<i>`
    pub fn standardized_name(&self) -> String {
        format!("feature_{}_stand_{}", self.code, self.position)
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature_{}_{}", self.code, self.position)
    }
}

impl FromStr for FeatureColumn {
    type Err = PipelineError;

    fn from_str(name: &str) -> Result<Self> {
        let violation = || {
            PipelineError::SchemaViolation(format!(
                "column {:?} does not match feature_<code>_<i>",
                name
            ))
        };
        let rest = name.strip_prefix("feature_").ok_or_else(violation)?;
        let (code, position) = rest.rsplit_once('_').ok_or_else(violation)?;
        let position = position.parse::<usize>().map_err(|_| violation())?;
        if position == 0 {
            return Err(violation());
        }
        let code = FeatureCode::new(code).map_err(|_| violation())?;
        Ok(Self::new(code, position))
    }
}
