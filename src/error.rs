// Error taxonomy for loading and aggregating salary data
//
// Load errors are fatal for a session. Skip reasons are per-row and only
// ever accumulate into the load report.

use serde::{Deserialize, Serialize};

/// A failure that stops a CSV load before any aggregation happens.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The CSV source could not be retrieved.
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// The CSV document could not be tokenized.
    #[error("malformed CSV{}: {reason}", at_line(.line))]
    Parse { line: Option<u64>, reason: String },

    /// The header row lacks a column aggregation depends on.
    #[error("CSV header is missing required column `{0}`")]
    MissingColumn(&'static str),
}

impl LoadError {
    pub fn fetch(location: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::Fetch {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

fn at_line(line: &Option<u64>) -> String {
    match line {
        Some(l) => format!(" at line {l}"),
        None => String::new(),
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line());
        LoadError::Parse {
            line,
            reason: err.to_string(),
        }
    }
}

/// Why a single row was left out of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("work_year is missing")]
    MissingYear,

    #[error("work_year `{0}` is not an integer year")]
    InvalidYear(String),

    #[error("salary_in_usd is missing")]
    MissingSalary,

    #[error("salary_in_usd `{0}` is not a finite number")]
    InvalidSalary(String),
}

/// A row excluded from aggregation, with the CSV line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub line: u64,
    pub reason: SkipReason,
}
