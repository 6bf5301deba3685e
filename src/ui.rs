use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use salary_dashboard::{update, Action, DashboardState, LoadState, SummaryField};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Summary,
    Breakdown,
}

pub struct App {
    pub dashboard: DashboardState,
    pub source: String,
    pub summary_state: TableState,
    pub breakdown_state: TableState,
    pub focus: Pane,
}

impl App {
    pub fn new(dashboard: DashboardState, source: String) -> Self {
        let mut summary_state = TableState::default();
        if !dashboard.summaries.is_empty() {
            summary_state.select(Some(0));
        }

        Self {
            dashboard,
            source,
            summary_state,
            breakdown_state: TableState::default(),
            focus: Pane::Summary,
        }
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.dashboard);
        self.dashboard = update(state, action);
    }

    pub fn highlighted_year(&self) -> Option<&str> {
        self.summary_state
            .selected()
            .and_then(|i| self.dashboard.summaries.get(i))
            .map(|s| s.year.as_str())
    }

    /// Drill into the highlighted year.
    pub fn select_highlighted(&mut self) {
        let Some(year) = self.highlighted_year().map(str::to_string) else {
            return;
        };

        self.dispatch(Action::SelectYear(year));
        self.breakdown_state
            .select(if self.dashboard.breakdown.is_empty() { None } else { Some(0) });
    }

    pub fn clear_selection(&mut self) {
        self.dispatch(Action::ClearSelection);
        self.breakdown_state.select(None);
        self.focus = Pane::Summary;
    }

    /// Re-sort the summary table, keeping the cursor on the same year.
    pub fn sort_by(&mut self, field: SummaryField) {
        let year = self.highlighted_year().map(str::to_string);
        self.dispatch(Action::SortBy(field));

        if let Some(year) = year {
            let index = self.dashboard.summaries.iter().position(|s| s.year == year);
            self.summary_state.select(index);
        }
    }

    pub fn cycle_breakdown_order(&mut self) {
        let next = self.dashboard.breakdown_order.next();
        self.dispatch(Action::SetBreakdownOrder(next));
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Pane::Summary if self.dashboard.selection.year().is_some() => Pane::Breakdown,
            _ => Pane::Summary,
        };
    }

    fn focused(&mut self) -> (&mut TableState, usize) {
        match self.focus {
            Pane::Summary => (&mut self.summary_state, self.dashboard.summaries.len()),
            Pane::Breakdown => (&mut self.breakdown_state, self.dashboard.breakdown.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.focused();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.focused();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        let (state, len) = self.focused();
        state.select(if len == 0 { None } else { Some(0) });
    }

    pub fn last(&mut self) {
        let (state, len) = self.focused();
        state.select(len.checked_sub(1));
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Enter if self.focus == Pane::Summary => self.select_highlighted(),
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::Char('x') | KeyCode::Backspace => self.clear_selection(),
            KeyCode::Char('1') => self.sort_by(SummaryField::Year),
            KeyCode::Char('2') => self.sort_by(SummaryField::TotalJobs),
            KeyCode::Char('3') => self.sort_by(SummaryField::AverageSalary),
            KeyCode::Char('o') => self.cycle_breakdown_order(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => self.first(),
            KeyCode::End => self.last(),
            _ => {}
        }
        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key.code) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if let Some(message) = app.dashboard.failure() {
        render_failure(f, chunks[1], message);
    } else {
        let content = if app.dashboard.selection.year().is_some() {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1])
        } else {
            Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(100)])
                .split(chunks[1])
        };

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(content[0]);

        render_summary_table(f, top[0], app);
        render_chart(f, top[1], app);

        if content.len() > 1 {
            render_breakdown(f, content[1], app);
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Salaries by Year",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled(truncate(&app.source, 40), Style::default().fg(Color::White)),
    ];

    match &app.dashboard.load_state {
        LoadState::Loaded(report) => {
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled(
                format!("Rows: {}", report.records_aggregated),
                Style::default().fg(Color::Green),
            ));
            if !report.skipped.is_empty() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("⚠ {} skipped", report.skipped.len()),
                    Style::default().fg(Color::Yellow),
                ));
            }
        }
        LoadState::Failed { .. } => {
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled("Load failed", Style::default().fg(Color::Red)));
        }
        LoadState::Pending => {}
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn pane_border(app: &App, pane: Pane) -> Style {
    if app.focus == pane {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_summary_table(f: &mut Frame, area: Rect, app: &mut App) {
    let sort = app.dashboard.sort;
    let header_cells = [
        (SummaryField::Year, "1"),
        (SummaryField::TotalJobs, "2"),
        (SummaryField::AverageSalary, "3"),
    ]
    .into_iter()
    .map(|(field, key)| {
        let arrow = if sort.field == field { sort.direction.arrow() } else { "" };
        Cell::from(format!("{} [{}] {}", field.title(), key, arrow)).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selected_year = app.dashboard.selection.year();
    let rows = app.dashboard.summaries.iter().map(|s| {
        let style = if selected_year == Some(s.year.as_str()) {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };

        Row::new(vec![
            Cell::from(s.year.clone()),
            Cell::from(s.total_jobs.to_string()),
            Cell::from(format!("{:.2}", s.average_salary)),
        ])
        .style(style)
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(18),
            Constraint::Min(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(pane_border(app, Pane::Summary))
            .title(" Salaries "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.summary_state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let points = app.dashboard.chart_points();
    let data: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| p.year.parse::<f64>().ok().map(|y| (y, p.total_jobs as f64)))
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Job Trends ");

    if data.is_empty() {
        f.render_widget(Paragraph::new("  No data").block(block), area);
        return;
    }

    let (mut x_min, mut x_max) = (data[0].0, data[data.len() - 1].0);
    if x_min == x_max {
        x_min -= 1.0;
        x_max += 1.0;
    }
    let y_max = data.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1.0);

    let first = &points[0].year;
    let last = &points[points.len() - 1].year;

    let datasets = vec![Dataset::default()
        .name("total_jobs")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Red))
        .data(&data)];

    let axis_style = Style::default().fg(Color::Yellow);
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("Year")
                .style(axis_style)
                .bounds([x_min, x_max])
                .labels(vec![Span::raw(first.clone()), Span::raw(last.clone())]),
        )
        .y_axis(
            Axis::default()
                .title("Jobs")
                .style(axis_style)
                .bounds([0.0, y_max * 1.1])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", y_max / 2.0)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_breakdown(f: &mut Frame, area: Rect, app: &mut App) {
    let year = app.dashboard.selection.year().unwrap_or_default().to_string();

    let header = Row::new(["Job Title", "Number of Jobs"].into_iter().map(|h| {
        Cell::from(h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = app.dashboard.breakdown.iter().map(|b| {
        Row::new(vec![
            Cell::from(truncate(&b.title, 48)),
            Cell::from(b.count.to_string()),
        ])
        .height(1)
    });

    let title = format!(
        " Job Titles for {} ({}) ",
        year,
        app.dashboard.breakdown_order.label()
    );

    let table = Table::new(rows, [Constraint::Min(30), Constraint::Length(16)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border(app, Pane::Breakdown))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.breakdown_state);
}

fn render_failure(f: &mut Frame, area: Rect, message: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Could not load salary data",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("  {message}")),
        Line::from(""),
        Line::from(Span::styled(
            "  Check --source or SALARY_CSV and restart.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Salaries "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.focus {
        Pane::Summary => (app.summary_state.selected(), app.dashboard.summaries.len()),
        Pane::Breakdown => (app.breakdown_state.selected(), app.dashboard.breakdown.len()),
    };

    let key = Style::default().fg(Color::Yellow);
    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected.map(|i| i + 1).unwrap_or(0), total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", key),
        Span::raw(" Drill in | "),
        Span::styled("1-3", key),
        Span::raw(" Sort | "),
        Span::styled("o", key),
        Span::raw(" Title order | "),
        Span::styled("Tab", key),
        Span::raw(" Pane | "),
        Span::styled("x", key),
        Span::raw(" Clear | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use salary_dashboard::{LoadError, SalaryRecord, Selection};

    fn loaded_app() -> App {
        let records = vec![
            SalaryRecord::new("2023", "ML Engineer", "100000"),
            SalaryRecord::new("2023", "Data Scientist", "120000"),
            SalaryRecord::new("2024", "ML Engineer", "150000"),
        ];
        let state = update(
            DashboardState::new(),
            Action::LoadFinished {
                source: "salaries.csv".into(),
                result: Ok(records),
            },
        );
        App::new(state, "salaries.csv".into())
    }

    #[test]
    fn test_enter_drills_into_highlighted_year() {
        let mut app = loaded_app();
        assert_eq!(app.highlighted_year(), Some("2023"));

        app.handle_key(KeyCode::Enter);
        assert_eq!(app.dashboard.selection, Selection::YearSelected("2023".into()));
        assert_eq!(app.dashboard.breakdown.len(), 2);
        assert_eq!(app.breakdown_state.selected(), Some(0));

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.dashboard.selection.year(), Some("2024"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = loaded_app();
        app.handle_key(KeyCode::Up);
        assert_eq!(app.highlighted_year(), Some("2024"));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.highlighted_year(), Some("2023"));
    }

    #[test]
    fn test_sort_keeps_cursor_on_year() {
        let mut app = loaded_app();
        app.handle_key(KeyCode::Down); // 2024

        app.handle_key(KeyCode::Char('2')); // total jobs ascending
        assert_eq!(app.dashboard.summaries[0].year, "2024");
        assert_eq!(app.highlighted_year(), Some("2024"));
    }

    #[test]
    fn test_focus_needs_selection() {
        let mut app = loaded_app();
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focus, Pane::Summary);

        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.focus, Pane::Breakdown);

        app.handle_key(KeyCode::Char('x'));
        assert_eq!(app.focus, Pane::Summary);
        assert_eq!(app.dashboard.selection, Selection::NoSelection);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = loaded_app();
        assert!(!app.handle_key(KeyCode::Char('j')));
        assert!(app.handle_key(KeyCode::Char('q')));
        assert!(app.handle_key(KeyCode::Esc));
    }

    #[test]
    fn test_renders_failure_message() {
        let state = update(
            DashboardState::new(),
            Action::LoadFinished {
                source: "gone.csv".into(),
                result: Err(LoadError::fetch("gone.csv", "not found")),
            },
        );
        let mut app = App::new(state, "gone.csv".into());

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Could not load salary data"));
    }

    #[test]
    fn test_renders_dashboard_with_breakdown() {
        let mut app = loaded_app();
        app.handle_key(KeyCode::Enter);

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("110000.00"));
        assert!(text.contains("Job Titles for 2023"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Ingénieur ML", 20), "Ingénieur ML");
        assert_eq!(truncate("Ingénieur Machine Learning", 10), "Ingénie...");
    }
}
