// Salary Dashboard - Web Server
// JSON API over the same dashboard state the terminal UI drives

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use salary_dashboard::{
    init_tracing, update, Action, BreakdownOrder, CsvSource, DashboardConfig, DashboardState,
    DashboardView, SkippedRecord, SortDirection, SummaryField, SummarySort, TitleBreakdown,
    YearSummary,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
struct AppState {
    dashboard: Arc<Mutex<DashboardState>>,
}

impl AppState {
    fn new(dashboard: DashboardState) -> Self {
        Self {
            dashboard: Arc::new(Mutex::new(dashboard)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DashboardState>, ApiError> {
        self.dashboard
            .lock()
            .map_err(|_| ApiError::Internal("dashboard state lock poisoned".to_string()))
    }

    /// Apply an action atomically and return the resulting view.
    fn dispatch(&self, action: Action) -> Result<DashboardView, ApiError> {
        let mut guard = self.lock()?;
        let current = std::mem::take(&mut *guard);
        *guard = update(current, action);
        Ok(guard.view())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    /// The CSV load failed; there is nothing to serve.
    #[error("salary data unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATA_UNAVAILABLE"),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn require_loaded(dashboard: &DashboardState) -> Result<(), ApiError> {
    match dashboard.failure() {
        Some(message) => Err(ApiError::Unavailable(message.to_string())),
        None if !dashboard.is_loaded() => Err(ApiError::Unavailable("still loading".to_string())),
        None => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    sort: Option<SummaryField>,
    direction: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
struct TitlesQuery {
    order: Option<BreakdownOrder>,
}

#[derive(Debug, Deserialize)]
struct SelectYearRequest {
    year: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - Full render payload, including a failed load state
async fn get_dashboard(State(state): State<AppState>) -> ApiResult<DashboardView> {
    let dashboard = state.lock()?;
    Ok(Json(ApiResponse::ok(dashboard.view())))
}

/// GET /api/summary - Year summaries, sorted per query without changing state
async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Vec<YearSummary>> {
    let dashboard = state.lock()?;
    require_loaded(&dashboard)?;

    let sort = SummarySort::new(
        query.sort.unwrap_or(dashboard.sort.field),
        query.direction.unwrap_or(dashboard.sort.direction),
    );
    let mut summaries = dashboard.summaries.clone();
    sort.apply(&mut summaries);

    Ok(Json(ApiResponse::ok(summaries)))
}

/// GET /api/years/:year/titles - Title breakdown for any year (pure query)
async fn get_year_titles(
    State(state): State<AppState>,
    Path(year): Path<String>,
    Query(query): Query<TitlesQuery>,
) -> ApiResult<Vec<TitleBreakdown>> {
    let dashboard = state.lock()?;
    require_loaded(&dashboard)?;

    let rows = dashboard.breakdown_for(&year, query.order.unwrap_or_default());
    Ok(Json(ApiResponse::ok(rows)))
}

/// POST /api/selection - selectYear
async fn select_year(
    State(state): State<AppState>,
    Json(request): Json<SelectYearRequest>,
) -> ApiResult<DashboardView> {
    require_loaded(&*state.lock()?)?;

    let view = state.dispatch(Action::SelectYear(request.year))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// DELETE /api/selection - back to no selection
async fn clear_selection(State(state): State<AppState>) -> ApiResult<DashboardView> {
    let view = state.dispatch(Action::ClearSelection)?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/skipped - Rows left out of aggregation
async fn get_skipped(State(state): State<AppState>) -> ApiResult<Vec<SkippedRecord>> {
    let dashboard = state.lock()?;
    require_loaded(&dashboard)?;

    Ok(Json(ApiResponse::ok(dashboard.skipped().to_vec())))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/summary", get(get_summary))
        .route("/years/:year/titles", get(get_year_titles))
        .route("/selection", axum::routing::post(select_year).delete(clear_selection))
        .route("/skipped", get(get_skipped))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[derive(Parser, Debug)]
#[command(author, version, about = "Salary dashboard JSON API", long_about = None)]
struct Args {
    /// CSV file path or http(s) URL (overrides SALARY_CSV)
    #[arg(short, long)]
    source: Option<String>,

    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("salary_dashboard=info,salary_server=info,tower_http=info");

    let args = Args::parse();
    let mut config = DashboardConfig::from_env().context("Invalid configuration")?;
    if let Some(source) = args.source {
        config.source = CsvSource::parse(&source);
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // One blocking fetch per session; a failure stays visible through the API
    let source = config.source.clone();
    let dashboard = tokio::task::spawn_blocking(move || DashboardState::from_source(&source))
        .await
        .context("CSV load task panicked")?;

    if let Some(message) = dashboard.failure() {
        tracing::error!(%message, "serving without data");
    }

    let app = router(AppState::new(dashboard));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(%addr, source = %config.source, "salary API listening");

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
