// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use salary_dashboard::{
    init_tracing, update, Action, BreakdownOrder, CsvSource, DashboardConfig, DashboardState,
    SortDirection, SummaryField, SummarySort,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Salary records by year, with job title drill-down",
    long_about = None
)]
struct Cli {
    /// CSV file path or http(s) URL (overrides SALARY_CSV)
    #[arg(short, long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal dashboard (default)
    View,
    /// Print the yearly summary, optionally with one year's job titles
    Summary(SummaryArgs),
}

#[derive(Parser, Debug)]
struct SummaryArgs {
    /// Also print the job title breakdown for this year
    #[arg(short, long)]
    year: Option<String>,

    /// Column to sort the summary by
    #[arg(long, value_enum, default_value_t = SortArg::Year)]
    sort: SortArg,

    /// Sort descending
    #[arg(long)]
    desc: bool,

    /// Order of the job title breakdown
    #[arg(long, value_enum, default_value_t = OrderArg::FirstSeen)]
    order: OrderArg,

    /// Emit the dashboard view as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SortArg {
    Year,
    Jobs,
    Salary,
}

impl From<SortArg> for SummaryField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Year => SummaryField::Year,
            SortArg::Jobs => SummaryField::TotalJobs,
            SortArg::Salary => SummaryField::AverageSalary,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OrderArg {
    FirstSeen,
    Count,
    Title,
}

impl From<OrderArg> for BreakdownOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::FirstSeen => BreakdownOrder::FirstSeen,
            OrderArg::Count => BreakdownOrder::CountDesc,
            OrderArg::Title => BreakdownOrder::Title,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env().context("Invalid configuration")?;
    if let Some(source) = &cli.source {
        config.source = CsvSource::parse(source);
    }

    match cli.command.unwrap_or(Command::View) {
        Command::View => {
            // The terminal belongs to the dashboard; keep logs quiet unless asked
            init_tracing("warn");
            run_ui_mode(&config)
        }
        Command::Summary(args) => {
            init_tracing("salary_dashboard=info");
            run_summary(&config, &args)
        }
    }
}

fn run_summary(config: &DashboardConfig, args: &SummaryArgs) -> Result<()> {
    let mut state = DashboardState::from_source(&config.source);

    if let Some(message) = state.failure() {
        bail!("Could not load salary data: {message}");
    }

    let direction = if args.desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    };
    state = update(state, Action::SetSort(SummarySort::new(args.sort.into(), direction)));
    state = update(state, Action::SetBreakdownOrder(args.order.into()));
    if let Some(year) = &args.year {
        state = update(state, Action::SelectYear(year.clone()));
    }

    if args.json {
        let json = serde_json::to_string_pretty(&state.view())?;
        println!("{json}");
        return Ok(());
    }

    println!("📊 Salaries by year ({})", config.source);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<8} {:>12} {:>22}",
        SummaryField::Year.title(),
        SummaryField::TotalJobs.title(),
        SummaryField::AverageSalary.title()
    );
    for summary in &state.summaries {
        println!(
            "{:<8} {:>12} {:>22.2}",
            summary.year, summary.total_jobs, summary.average_salary
        );
    }
    if state.summaries.is_empty() {
        println!("(no salary records)");
    }

    if let Some(year) = state.selection.year() {
        println!("\nJob Titles for {year}");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        for row in &state.breakdown {
            println!("{:<36} {:>8}", row.title, row.count);
        }
        if state.breakdown.is_empty() {
            println!("(no jobs recorded for {year})");
        }
    }

    let skipped = state.skipped_count();
    if skipped > 0 {
        eprintln!(
            "\n⚠️  {skipped} row(s) skipped for a missing or invalid year or salary \
             (RUST_LOG=salary_dashboard=debug lists them)"
        );
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &DashboardConfig) -> Result<()> {
    let state = DashboardState::from_source(&config.source);

    let mut app = ui::App::new(state, config.source.to_string());
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &DashboardConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or print a summary: salary-dashboard summary");
    std::process::exit(1);
}
