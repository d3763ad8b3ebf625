use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gatling_shim_instruments::{MetricsError, PrometheusSink};
use gatling_shim_runner::prelude::{RunManager, RunState, StartRejected};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::report_files::{content_type_for, resolve_report_file};

/// Routes served by [router], with a short description for the startup log.
pub const ENDPOINTS: [(&str, &str, &str); 5] = [
    ("GET", "/status", "Get simulation status and active users"),
    ("POST", "/start", "Start a new simulation"),
    ("GET", "/report", "Get the latest report"),
    ("GET", "/metrics", "Prometheus metrics endpoint"),
    ("GET", "/metrics/active-users", "Get active users metrics (JSON)"),
];

#[derive(Clone)]
pub struct AppState {
    manager: RunManager,
    metrics: Arc<PrometheusSink>,
}

impl AppState {
    pub fn new(manager: RunManager, metrics: Arc<PrometheusSink>) -> Self {
        Self { manager, metrics }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start_simulation))
        .route("/status", get(status))
        .route("/report", get(report))
        .route("/metrics/active-users", get(active_users))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(3600))
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("A simulation is already running")]
    AlreadyRunning,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("simulationClass is required")]
    MissingSimulationClass,

    #[error("Failed to start simulation")]
    StartFailed,

    #[error("No report available")]
    NoReport,

    #[error("Invalid file path")]
    InvalidFilePath,

    #[error("File not found")]
    FileNotFound,

    #[error("Failed to encode metrics")]
    Metrics(#[from] MetricsError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AlreadyRunning => StatusCode::CONFLICT,
            ApiError::InvalidBody | ApiError::MissingSimulationClass => StatusCode::BAD_REQUEST,
            ApiError::NoReport | ApiError::FileNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidFilePath => StatusCode::FORBIDDEN,
            ApiError::StartFailed | ApiError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StartRejected> for ApiError {
    fn from(rejected: StartRejected) -> Self {
        match rejected {
            StartRejected::AlreadyRunning { .. } => ApiError::AlreadyRunning,
            StartRejected::InvalidInput => ApiError::MissingSimulationClass,
            StartRejected::NoRuntime => {
                log::error!("Start request handled outside an async runtime");
                ApiError::StartFailed
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Metrics(e) = &self {
            log::error!("Failed to serve metrics: {e}");
        }
        (self.status(), format!("{self}\n")).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default)]
    simulation_class: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    message: &'static str,
    simulation_class: String,
}

async fn start_simulation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    // Refuse early so a busy shim answers 409 whatever the body holds. The manager repeats the
    // check atomically when starting.
    if state.manager.is_running() {
        return Err(ApiError::AlreadyRunning);
    }

    let request: StartRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidBody)?;
    let simulation_class = request.simulation_class.unwrap_or_default();

    state.manager.request_start(&simulation_class)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            message: "Simulation started",
            simulation_class: simulation_class.trim().to_string(),
        }),
    ))
}

async fn status(State(state): State<AppState>) -> Json<RunState> {
    Json(state.manager.snapshot())
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    file: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportInfo {
    report_path: PathBuf,
    report_url: &'static str,
}

async fn report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let report_path = state
        .manager
        .snapshot()
        .report_path
        .ok_or(ApiError::NoReport)?;

    let Some(requested) = query.file.filter(|file| !file.is_empty()) else {
        return Ok(Json(ReportInfo {
            report_path,
            report_url: "/report?file=index.html",
        })
        .into_response());
    };

    let report_dir = report_path.parent().ok_or(ApiError::NoReport)?;
    let file_path =
        resolve_report_file(report_dir, &requested).ok_or(ApiError::InvalidFilePath)?;
    let contents = tokio::fs::read(&file_path).await.map_err(|e| {
        log::debug!("Cannot read report file '{}': {e}", file_path.display());
        ApiError::FileNotFound
    })?;

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&file_path))],
        contents,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActiveUsersMetrics {
    timestamp: i64,
    active_users: u64,
    is_running: bool,
}

async fn active_users(State(state): State<AppState>) -> Json<ActiveUsersMetrics> {
    let snapshot = state.manager.snapshot();

    Json(ActiveUsersMetrics {
        timestamp: chrono::Utc::now().timestamp(),
        active_users: snapshot.active_users,
        is_running: snapshot.running,
    })
}

async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.metrics.encode_text()?;

    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], text).into_response())
}
