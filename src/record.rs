use crate::error::{LoadError, SkipReason};
use serde::{Deserialize, Serialize};

/// Columns a salary CSV must carry for aggregation to mean anything.
pub const REQUIRED_COLUMNS: [&str; 2] = ["work_year", "salary_in_usd"];

/// One salary observation as it appears in the CSV.
///
/// Fields stay as the raw strings the parser produced. Typed values are
/// derived on demand by [`SalaryRecord::validate`], so a row that fails
/// validation is still available for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    #[serde(default)]
    pub work_year: Option<String>,

    #[serde(default)]
    pub job_title: String,

    #[serde(default)]
    pub salary_in_usd: Option<String>,

    /// 1-based line in the source document (header is line 1)
    #[serde(skip)]
    pub line: u64,
}

/// Typed view of a record that passed validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<'a> {
    pub year: i32,
    pub job_title: &'a str,
    pub salary_usd: f64,
}

impl SalaryRecord {
    pub fn new(work_year: &str, job_title: &str, salary_in_usd: &str) -> Self {
        SalaryRecord {
            work_year: Some(work_year.to_string()),
            job_title: job_title.to_string(),
            salary_in_usd: Some(salary_in_usd.to_string()),
            line: 0,
        }
    }

    /// Builder pattern: attach the source line
    pub fn at_line(mut self, line: u64) -> Self {
        self.line = line;
        self
    }

    /// Check year and salary. The year is reported first when both fail.
    pub fn validate(&self) -> Result<Observation<'_>, SkipReason> {
        let year = match non_empty(self.work_year.as_deref()) {
            None => return Err(SkipReason::MissingYear),
            Some(y) => y
                .parse::<i32>()
                .map_err(|_| SkipReason::InvalidYear(y.to_string()))?,
        };

        let salary_usd = match non_empty(self.salary_in_usd.as_deref()) {
            None => return Err(SkipReason::MissingSalary),
            Some(raw) => match raw.parse::<f64>() {
                // "NaN" and "inf" parse fine but would poison the average
                Ok(v) if v.is_finite() => v,
                _ => return Err(SkipReason::InvalidSalary(raw.to_string())),
            },
        };

        Ok(Observation {
            year,
            job_title: &self.job_title,
            salary_usd,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse CSV text with a header row into records.
///
/// A blank document holds zero records. Structural problems (ragged rows,
/// bad UTF-8) and a header without the required columns fail the whole
/// document. Individual bad values do not;
/// they surface later as skipped records.
pub fn parse_records(text: &str) -> Result<Vec<SalaryRecord>, LoadError> {
    // No header row at all: an empty document, not a malformed one
    if text.trim().is_empty() {
        tracing::debug!("salary CSV is empty");
        return Ok(Vec::new());
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn(column));
        }
    }

    let mut records = Vec::new();

    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let record: SalaryRecord = row.deserialize(Some(&headers))?;
        records.push(record.at_line(line));
    }

    tracing::debug!(rows = records.len(), "parsed salary CSV");

    Ok(records)
}
