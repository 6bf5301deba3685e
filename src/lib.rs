// Salary Dashboard - Core Library
// Loads salary CSVs, aggregates them by year and drills into job titles.
// Shared by the terminal dashboard, the summary CLI and the API server.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod record;
pub mod source;
pub mod state;

// Re-export commonly used types
pub use aggregate::{
    aggregate_by_year, breakdown_by_title, BreakdownOrder, SortDirection, SummaryField,
    SummarySort, TitleBreakdown, YearAggregation, YearSummary,
};
pub use config::DashboardConfig;
pub use error::{LoadError, SkipReason, SkippedRecord};
pub use record::{parse_records, Observation, SalaryRecord};
pub use source::CsvSource;
pub use state::{
    update, Action, ChartPoint, DashboardState, DashboardView, LoadReport, LoadState, Selection,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr `tracing` subscriber honouring `RUST_LOG`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // try_init: tests and embedders may already have a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
