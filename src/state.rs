// Dashboard application state
//
// All view state lives in one struct that is threaded through `update`.
// Derived data (summaries, breakdown) is recomputed from the record set
// whenever its inputs change, never patched in place.

use crate::aggregate::{
    aggregate_by_year, breakdown_by_title, BreakdownOrder, SummaryField, SummarySort,
    TitleBreakdown, YearSummary,
};
use crate::error::{LoadError, SkippedRecord};
use crate::record::SalaryRecord;
use crate::source::CsvSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// STATE TYPES
// ============================================================================

/// Outcome of the single CSV load of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub records_read: usize,
    pub records_aggregated: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        format!(
            "{} rows from {}: {} aggregated, {} skipped",
            self.records_read,
            self.source,
            self.records_aggregated,
            self.skipped.len()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Pending,
    Loaded(LoadReport),
    Failed { message: String },
}

/// Which year, if any, the user has drilled into.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "year", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    NoSelection,
    YearSelected(String),
}

impl Selection {
    pub fn year(&self) -> Option<&str> {
        match self {
            Selection::NoSelection => None,
            Selection::YearSelected(year) => Some(year),
        }
    }
}

/// Events that move the dashboard from one state to the next.
#[derive(Debug)]
pub enum Action {
    LoadFinished {
        source: String,
        result: Result<Vec<SalaryRecord>, LoadError>,
    },
    SelectYear(String),
    ClearSelection,
    /// Sort the summary table by a column, flipping if it is already active
    SortBy(SummaryField),
    SetSort(SummarySort),
    SetBreakdownOrder(BreakdownOrder),
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub load_state: LoadState,
    pub records: Arc<[SalaryRecord]>,
    /// Year summaries in table display order
    pub summaries: Vec<YearSummary>,
    pub sort: SummarySort,
    pub selection: Selection,
    /// Empty whenever nothing is selected
    pub breakdown: Vec<TitleBreakdown>,
    pub breakdown_order: BreakdownOrder,
}

/// A chart point: year and job count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub year: String,
    pub total_jobs: usize,
}

/// Everything a presentation layer needs to draw the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub load: LoadState,
    pub summaries: Vec<YearSummary>,
    pub chart: Vec<ChartPoint>,
    pub sort: SummarySort,
    pub selection: Selection,
    /// Present only while a year is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Vec<TitleBreakdown>>,
    pub breakdown_order: BreakdownOrder,
}

// ============================================================================
// STATE
// ============================================================================

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        DashboardState {
            load_state: LoadState::Pending,
            records: Arc::from(Vec::new()),
            summaries: Vec::new(),
            sort: SummarySort::default(),
            selection: Selection::NoSelection,
            breakdown: Vec::new(),
            breakdown_order: BreakdownOrder::default(),
        }
    }

    /// Fetch, parse and aggregate `source` into a fresh state.
    pub fn from_source(source: &CsvSource) -> Self {
        update(
            DashboardState::new(),
            Action::LoadFinished {
                source: source.to_string(),
                result: source.load(),
            },
        )
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load_state, LoadState::Loaded(_))
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.load_state {
            LoadState::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn skipped(&self) -> &[SkippedRecord] {
        match &self.load_state {
            LoadState::Loaded(report) => &report.skipped,
            _ => &[],
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().len()
    }

    pub fn summary_for(&self, year: &str) -> Option<&YearSummary> {
        self.summaries.iter().find(|s| s.year == year)
    }

    /// (year, job count) pairs in chronological order, whatever the table sort.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        let mut points: Vec<&YearSummary> = self.summaries.iter().collect();
        points.sort_by_key(|s| s.year_number());

        points
            .into_iter()
            .map(|s| ChartPoint {
                year: s.year.clone(),
                total_jobs: s.total_jobs,
            })
            .collect()
    }

    /// Breakdown of any year in the requested order, without touching the selection.
    pub fn breakdown_for(&self, year: &str, order: BreakdownOrder) -> Vec<TitleBreakdown> {
        let mut rows = breakdown_by_title(&self.records, year.trim());
        order.apply(&mut rows);
        rows
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            load: self.load_state.clone(),
            summaries: self.summaries.clone(),
            chart: self.chart_points(),
            sort: self.sort,
            selection: self.selection.clone(),
            breakdown: self.selection.year().map(|_| self.breakdown.clone()),
            breakdown_order: self.breakdown_order,
        }
    }

    fn refresh_breakdown(&mut self) {
        self.breakdown = match self.selection.year() {
            Some(year) => self.breakdown_for(year, self.breakdown_order),
            None => Vec::new(),
        };
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// Apply one action and return the next state.
pub fn update(mut state: DashboardState, action: Action) -> DashboardState {
    match action {
        Action::LoadFinished { source, result } => {
            if state.load_state != LoadState::Pending {
                tracing::warn!(%source, "ignoring second load; data is loaded once per session");
                return state;
            }

            match result {
                Ok(records) => {
                    let aggregation = aggregate_by_year(&records);
                    let report = LoadReport {
                        source,
                        loaded_at: Utc::now(),
                        records_read: records.len(),
                        records_aggregated: aggregation.aggregated_count(),
                        skipped: aggregation.skipped,
                    };

                    if !report.skipped.is_empty() {
                        tracing::warn!(
                            skipped = report.skipped.len(),
                            "some salary rows were skipped"
                        );
                    }
                    tracing::info!("{}", report.summary());

                    state.records = Arc::from(records);
                    state.summaries = aggregation.summaries;
                    state.sort.apply(&mut state.summaries);
                    state.load_state = LoadState::Loaded(report);
                }
                Err(err) => {
                    tracing::error!(%source, error = %err, "salary CSV load failed");
                    state.load_state = LoadState::Failed {
                        message: err.to_string(),
                    };
                }
            }

            state.selection = Selection::NoSelection;
            state.refresh_breakdown();
        }
        Action::SelectYear(year) => {
            if !state.is_loaded() {
                tracing::debug!(%year, "no data loaded; ignoring year selection");
                return state;
            }

            let year = year.trim().to_string();
            tracing::debug!(%year, "selecting year");
            state.selection = Selection::YearSelected(year);
            state.refresh_breakdown();
        }
        Action::ClearSelection => {
            state.selection = Selection::NoSelection;
            state.refresh_breakdown();
        }
        Action::SortBy(field) => {
            state.sort = state.sort.toggled(field);
            state.sort.apply(&mut state.summaries);
        }
        Action::SetSort(sort) => {
            state.sort = sort;
            state.sort.apply(&mut state.summaries);
        }
        Action::SetBreakdownOrder(order) => {
            state.breakdown_order = order;
            state.refresh_breakdown();
        }
    }

    state
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SortDirection;
    use crate::error::SkipReason;

    fn sample_records() -> Vec<SalaryRecord> {
        vec![
            SalaryRecord::new("2023", "ML Engineer", "100000").at_line(2),
            SalaryRecord::new("2023", "Data Scientist", "120000").at_line(3),
            SalaryRecord::new("2024", "ML Engineer", "150000").at_line(4),
            SalaryRecord::new("2021", "Data Scientist", "90000").at_line(5),
            SalaryRecord::new("2021", "Data Scientist", "95000").at_line(6),
            SalaryRecord::new("2021", "Analyst", "70000").at_line(7),
            SalaryRecord::new("2024", "Analyst", "not-a-number").at_line(8),
        ]
    }

    fn loaded_state() -> DashboardState {
        update(
            DashboardState::new(),
            Action::LoadFinished {
                source: "test.csv".into(),
                result: Ok(sample_records()),
            },
        )
    }

    fn years(state: &DashboardState) -> Vec<&str> {
        state.summaries.iter().map(|s| s.year.as_str()).collect()
    }

    #[test]
    fn test_initial_state() {
        let state = DashboardState::new();

        assert_eq!(state.load_state, LoadState::Pending);
        assert_eq!(state.selection, Selection::NoSelection);
        assert!(state.summaries.is_empty());
        assert!(state.view().breakdown.is_none());
    }

    #[test]
    fn test_load_builds_summaries() {
        let state = loaded_state();

        assert!(state.is_loaded());
        assert_eq!(years(&state), vec!["2021", "2023", "2024"]);
        assert_eq!(state.summary_for("2023").unwrap().average_salary, 110000.0);
        assert_eq!(state.summary_for("2024").unwrap().total_jobs, 1);

        assert_eq!(state.skipped_count(), 1);
        assert_eq!(state.skipped()[0].line, 8);
        assert_eq!(
            state.skipped()[0].reason,
            SkipReason::InvalidSalary("not-a-number".into())
        );

        match &state.load_state {
            LoadState::Loaded(report) => {
                assert_eq!(report.records_read, 7);
                assert_eq!(report.records_aggregated, 6);
                assert_eq!(report.source, "test.csv");
            }
            other => panic!("expected loaded state, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_load() {
        let state = update(
            DashboardState::new(),
            Action::LoadFinished {
                source: "empty.csv".into(),
                result: Ok(Vec::new()),
            },
        );

        assert!(state.is_loaded());
        assert!(state.summaries.is_empty());
        assert_eq!(state.skipped_count(), 0);
    }

    #[test]
    fn test_failed_load() {
        let state = update(
            DashboardState::new(),
            Action::LoadFinished {
                source: "missing.csv".into(),
                result: Err(LoadError::fetch("missing.csv", "No such file or directory")),
            },
        );

        assert!(!state.is_loaded());
        assert_eq!(
            state.failure(),
            Some("failed to fetch missing.csv: No such file or directory")
        );
        assert!(state.summaries.is_empty());

        // nothing to drill into
        let state = update(state, Action::SelectYear("2023".into()));
        assert_eq!(state.selection, Selection::NoSelection);
    }

    #[test]
    fn test_load_happens_once() {
        let state = loaded_state();
        let state = update(
            state,
            Action::LoadFinished {
                source: "other.csv".into(),
                result: Ok(Vec::new()),
            },
        );

        assert_eq!(years(&state), vec!["2021", "2023", "2024"]);
    }

    #[test]
    fn test_select_year_transitions() {
        let state = update(loaded_state(), Action::SelectYear("2023".into()));

        assert_eq!(state.selection, Selection::YearSelected("2023".into()));
        assert_eq!(
            state.breakdown,
            vec![
                TitleBreakdown { title: "ML Engineer".into(), count: 1 },
                TitleBreakdown { title: "Data Scientist".into(), count: 1 },
            ]
        );

        let state = update(state, Action::SelectYear("2021".into()));
        assert_eq!(state.selection.year(), Some("2021"));
        assert_eq!(
            state.breakdown,
            vec![
                TitleBreakdown { title: "Data Scientist".into(), count: 2 },
                TitleBreakdown { title: "Analyst".into(), count: 1 },
            ]
        );

        let state = update(state, Action::ClearSelection);
        assert_eq!(state.selection, Selection::NoSelection);
        assert!(state.breakdown.is_empty());
    }

    #[test]
    fn test_select_year_without_records() {
        let state = update(loaded_state(), Action::SelectYear("1999".into()));

        assert_eq!(state.selection.year(), Some("1999"));
        assert!(state.breakdown.is_empty());
        assert_eq!(state.view().breakdown, Some(Vec::new()));
    }

    #[test]
    fn test_selection_does_not_touch_summaries() {
        let before = loaded_state();
        let records = before.records.clone();
        let summaries = before.summaries.clone();

        let after = update(before, Action::SelectYear("2024".into()));

        assert_eq!(after.summaries, summaries);
        assert_eq!(after.records, records);
    }

    #[test]
    fn test_breakdown_matches_year_totals() {
        let state = loaded_state();

        for summary in state.summaries.clone() {
            let state = update(state.clone(), Action::SelectYear(summary.year.clone()));
            let sum: usize = state.breakdown.iter().map(|b| b.count).sum();
            assert_eq!(sum, summary.total_jobs);
        }
    }

    #[test]
    fn test_sort_by_toggles() {
        let state = update(loaded_state(), Action::SortBy(SummaryField::TotalJobs));
        assert_eq!(years(&state), vec!["2024", "2023", "2021"]);

        let state = update(state, Action::SortBy(SummaryField::TotalJobs));
        assert_eq!(state.sort.direction, SortDirection::Descending);
        assert_eq!(years(&state), vec!["2021", "2023", "2024"]);

        let state = update(state, Action::SortBy(SummaryField::AverageSalary));
        assert_eq!(years(&state), vec!["2021", "2023", "2024"]);

        let state = update(state, Action::SortBy(SummaryField::Year));
        let state = update(state, Action::SortBy(SummaryField::Year));
        assert_eq!(years(&state), vec!["2024", "2023", "2021"]);
    }

    #[test]
    fn test_chart_is_chronological() {
        let state = update(
            loaded_state(),
            Action::SetSort(SummarySort::new(SummaryField::TotalJobs, SortDirection::Descending)),
        );

        let chart: Vec<_> = state
            .chart_points()
            .into_iter()
            .map(|p| (p.year, p.total_jobs))
            .collect();
        assert_eq!(
            chart,
            vec![("2021".into(), 3), ("2023".into(), 2), ("2024".into(), 1)]
        );
    }

    #[test]
    fn test_breakdown_order_recomputes() {
        let state = update(loaded_state(), Action::SelectYear("2021".into()));
        let state = update(state, Action::SetBreakdownOrder(BreakdownOrder::Title));

        assert_eq!(state.breakdown[0].title, "Analyst");
        assert_eq!(state.view().breakdown_order, BreakdownOrder::Title);
    }

    #[test]
    fn test_view_serializes() {
        let state = update(loaded_state(), Action::SelectYear("2023".into()));
        let json = serde_json::to_value(state.view()).unwrap();

        assert_eq!(json["load"]["state"], "loaded");
        assert_eq!(json["selection"]["state"], "year_selected");
        assert_eq!(json["selection"]["year"], "2023");
        assert_eq!(json["breakdown"].as_array().unwrap().len(), 2);
        assert_eq!(json["summaries"][0]["year"], "2021");
    }
}
