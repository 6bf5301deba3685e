// Year and job-title aggregation over salary records
//
// Both passes are pure recomputations: callers hand in the full record set
// and get fresh results back. Invalid rows never contribute to either pass,
// so a year's breakdown always sums to that year's job count.

use crate::error::SkippedRecord;
use crate::record::SalaryRecord;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Job count and average salary for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: String,
    pub total_jobs: usize,
    pub average_salary: f64,
}

impl YearSummary {
    /// Numeric year used for chronological ordering.
    pub fn year_number(&self) -> i64 {
        // keys are validated before a summary exists
        self.year.parse().unwrap_or(i64::MAX)
    }
}

/// Number of records with one job title inside the selected year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleBreakdown {
    pub title: String,
    pub count: usize,
}

/// Output of a year aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearAggregation {
    /// One entry per distinct year, ascending by year
    pub summaries: Vec<YearSummary>,
    pub skipped: Vec<SkippedRecord>,
}

impl YearAggregation {
    pub fn aggregated_count(&self) -> usize {
        self.summaries.iter().map(|s| s.total_jobs).sum()
    }
}

// ============================================================================
// SORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryField {
    Year,
    TotalJobs,
    AverageSalary,
}

impl SummaryField {
    pub fn title(&self) -> &str {
        match self {
            SummaryField::Year => "Year",
            SummaryField::TotalJobs => "Total Jobs",
            SummaryField::AverageSalary => "Average Salary (USD)",
        }
    }

    fn compare(&self, a: &YearSummary, b: &YearSummary) -> Ordering {
        match self {
            SummaryField::Year => a.year_number().cmp(&b.year_number()),
            SummaryField::TotalJobs => a.total_jobs.cmp(&b.total_jobs),
            SummaryField::AverageSalary => a.average_salary.total_cmp(&b.average_salary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &str {
        match self {
            SortDirection::Ascending => "▲",
            SortDirection::Descending => "▼",
        }
    }
}

/// Active ordering of the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySort {
    pub field: SummaryField,
    pub direction: SortDirection,
}

impl Default for SummarySort {
    fn default() -> Self {
        SummarySort {
            field: SummaryField::Year,
            direction: SortDirection::Ascending,
        }
    }
}

impl SummarySort {
    pub fn new(field: SummaryField, direction: SortDirection) -> Self {
        SummarySort { field, direction }
    }

    /// Clicking the active column flips it; any other column starts ascending.
    pub fn toggled(self, field: SummaryField) -> Self {
        if self.field == field {
            SummarySort::new(field, self.direction.flip())
        } else {
            SummarySort::new(field, SortDirection::Ascending)
        }
    }

    pub fn apply(&self, summaries: &mut [YearSummary]) {
        summaries.sort_by(|a, b| {
            let ord = self.field.compare(a, b);
            match self.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
}

/// Display order for a title breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownOrder {
    /// Order in which titles first appear in the data
    #[default]
    FirstSeen,
    /// Most common first, ties keep first-seen order
    CountDesc,
    Title,
}

impl BreakdownOrder {
    pub fn next(&self) -> Self {
        match self {
            BreakdownOrder::FirstSeen => BreakdownOrder::CountDesc,
            BreakdownOrder::CountDesc => BreakdownOrder::Title,
            BreakdownOrder::Title => BreakdownOrder::FirstSeen,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BreakdownOrder::FirstSeen => "first seen",
            BreakdownOrder::CountDesc => "most common",
            BreakdownOrder::Title => "title A-Z",
        }
    }

    pub fn apply(&self, rows: &mut [TitleBreakdown]) {
        match self {
            BreakdownOrder::FirstSeen => {}
            // stable sort keeps first-seen order among equal counts
            BreakdownOrder::CountDesc => rows.sort_by(|a, b| b.count.cmp(&a.count)),
            BreakdownOrder::Title => rows.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Group valid records by year into job counts and average salaries.
///
/// Rows with a missing or unparsable year or salary are reported in
/// [`YearAggregation::skipped`] and otherwise ignored.
pub fn aggregate_by_year(records: &[SalaryRecord]) -> YearAggregation {
    let mut by_year: HashMap<i32, Vec<f64>> = HashMap::new();
    let mut skipped = Vec::new();

    for record in records {
        match record.validate() {
            Ok(obs) => by_year.entry(obs.year).or_default().push(obs.salary_usd),
            Err(reason) => {
                tracing::debug!(line = record.line, %reason, "skipping salary record");
                skipped.push(SkippedRecord {
                    line: record.line,
                    reason,
                });
            }
        }
    }

    let mut summaries: Vec<YearSummary> = by_year
        .into_iter()
        .map(|(year, mut salaries)| {
            // Summed in sorted order so the average does not depend on row order
            salaries.sort_by(f64::total_cmp);
            let total: f64 = salaries.iter().sum();

            YearSummary {
                year: year.to_string(),
                total_jobs: salaries.len(),
                average_salary: total / salaries.len() as f64,
            }
        })
        .collect();

    SummarySort::default().apply(&mut summaries);

    tracing::info!(
        years = summaries.len(),
        records = records.len(),
        skipped = skipped.len(),
        "aggregated salaries by year"
    );

    YearAggregation { summaries, skipped }
}

/// Count job titles among valid records of `year`, in first-seen order.
///
/// Years compare numerically, like the summary keys. Titles compare exactly:
/// no trimming, case-sensitive. A year with no records, or one that is not
/// a number, gives an empty breakdown.
pub fn breakdown_by_title(records: &[SalaryRecord], year: &str) -> Vec<TitleBreakdown> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    let Ok(year) = year.trim().parse::<i32>() else {
        return Vec::new();
    };

    for obs in records.iter().filter_map(|r| r.validate().ok()) {
        if obs.year == year {
            *counts.entry(obs.job_title).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(title, count)| TitleBreakdown {
            title: title.to_string(),
            count,
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
