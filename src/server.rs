//! HTTP API backing the monitoring dashboard.
//!
//! The dashboard front-end polls these endpoints on its refresh tick and
//! submits threshold edits from its settings form. A real sensor feed can
//! post readings instead of the built-in simulator.
//!
//! ```text
//! Dashboard ──→ GET /gases/{gas}/status ─┐
//! Settings  ──→ PUT /gases/{gas}/thresholds ──→ GasMonitor
//! Sensor    ──→ POST /gases/{gas}/readings ─┘
//! ```

use crate::activity::SharedActivityLog;
use crate::core::classifier::WindowedAssessment;
use crate::core::monitor::{GasStatus, MonitorSnapshot, SharedMonitor};
use crate::core::report::{MonitoringReport, ReportBuilder};
use crate::core::stats::SummaryStatistics;
use crate::core::thresholds::{Assessment, MonitorError, ThresholdSet};
use crate::sensor::types::{Gas, Reading};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Default span of the windowed average, in hours
    pub windowed_span_hours: u32,
    /// Timezone used in generated reports
    pub timezone: chrono_tz::Tz,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16) -> Self {
        Self {
            port,
            windowed_span_hours: 24,
            timezone: chrono_tz::Tz::UTC,
        }
    }
}

/// Shared server state
pub struct ServerState {
    monitor: SharedMonitor,
    activity: SharedActivityLog,
    reports: ReportBuilder,
    windowed_span_hours: u32,
}

impl ServerState {
    pub fn new(config: &ServerConfig, monitor: SharedMonitor, activity: SharedActivityLog) -> Self {
        Self {
            monitor,
            activity,
            reports: ReportBuilder::new().with_timezone(config.timezone),
            windowed_span_hours: config.windowed_span_hours,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::UnknownGas(_) => api_error(StatusCode::NOT_FOUND, "UNKNOWN_GAS", e),
            MonitorError::InvalidThresholdOrdering { .. } => {
                api_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_THRESHOLDS", e)
            }
            MonitorError::EmptyWindow => api_error(StatusCode::CONFLICT, "EMPTY_WINDOW", e),
        }
    }
}

fn parse_gas(raw: &str) -> Result<Gas, ApiError> {
    raw.parse::<Gas>()
        .map_err(|e| api_error(StatusCode::NOT_FOUND, "UNKNOWN_GAS", e))
}

/// Latest reading of a gas
#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub gas: Gas,
    pub reading: Option<Reading>,
    pub display: String,
}

/// Point classification of a gas
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub gas: Gas,
    pub assessment: Assessment,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

/// Reading submitted by a sensor feed
#[derive(Debug, Deserialize)]
pub struct ReadingRequest {
    pub value: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub zone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowedQuery {
    pub hours: Option<u32>,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /gases
async fn list_gases(State(state): State<Arc<ServerState>>) -> Json<MonitorSnapshot> {
    Json(state.monitor.snapshot())
}

/// GET /gases/:gas
async fn gas_status(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<GasStatus>, ApiError> {
    let gas = parse_gas(&gas)?;
    Ok(Json(state.monitor.status(gas)?))
}

/// GET /gases/:gas/latest
async fn latest(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<LatestResponse>, ApiError> {
    let gas = parse_gas(&gas)?;
    let reading = state.monitor.classifier(gas)?.latest();
    let display = match &reading {
        Some(r) => format!("{:.1} {}", r.value, gas.unit()),
        None => "N/A".to_string(),
    };
    Ok(Json(LatestResponse {
        gas,
        reading,
        display,
    }))
}

/// GET /gases/:gas/status
async fn classify(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let gas = parse_gas(&gas)?;
    let assessment = state.monitor.classifier(gas)?.classify();
    state.activity.record_classification();
    Ok(Json(StatusResponse {
        gas,
        assessment,
        label: assessment.label(),
        color: assessment.risk().ok().map(|level| level.color()),
    }))
}

/// GET /gases/:gas/summary
async fn summary(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<SummaryStatistics>, ApiError> {
    let gas = parse_gas(&gas)?;
    Ok(Json(state.monitor.classifier(gas)?.summary_statistics()))
}

/// GET /gases/:gas/windowed?hours=24
async fn windowed(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
    Query(query): Query<WindowedQuery>,
) -> Result<Json<WindowedAssessment>, ApiError> {
    let gas = parse_gas(&gas)?;
    let hours = query.hours.unwrap_or(state.windowed_span_hours);
    let span = chrono::Duration::hours(i64::from(hours));
    Ok(Json(state.monitor.classifier(gas)?.classify_windowed(span)))
}

/// GET /gases/:gas/readings
async fn readings(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let gas = parse_gas(&gas)?;
    Ok(Json(state.monitor.classifier(gas)?.readings()))
}

/// POST /gases/:gas/readings
async fn append_reading(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
    Json(request): Json<ReadingRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    let gas = parse_gas(&gas)?;
    let mut reading = Reading::at(request.timestamp.unwrap_or_else(Utc::now), request.value);
    reading.zone = request.zone;

    let assessment = state.monitor.record(gas, reading)?;
    state.activity.record_reading();
    tracing::debug!(gas = gas.id(), value = request.value, %assessment, "reading received");

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            gas,
            assessment,
            label: assessment.label(),
            color: assessment.risk().ok().map(|level| level.color()),
        }),
    ))
}

/// GET /gases/:gas/thresholds
async fn get_thresholds(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
) -> Result<Json<ThresholdSet>, ApiError> {
    let gas = parse_gas(&gas)?;
    Ok(Json(state.monitor.classifier(gas)?.thresholds()))
}

/// PUT /gases/:gas/thresholds
///
/// Echoes the stored set, which is what the settings form redisplays.
async fn put_thresholds(
    State(state): State<Arc<ServerState>>,
    Path(gas): Path<String>,
    Json(thresholds): Json<ThresholdSet>,
) -> Result<Json<ThresholdSet>, ApiError> {
    let gas = parse_gas(&gas)?;
    let stored = state
        .monitor
        .classifier(gas)?
        .update_thresholds(thresholds)
        .map_err(|e| {
            tracing::warn!(gas = gas.id(), "rejected threshold update: {e}");
            e
        })?;
    state.activity.record_threshold_update();
    tracing::info!(gas = gas.id(), thresholds = %stored, "thresholds updated");
    Ok(Json(stored))
}

/// GET /report
async fn report(State(state): State<Arc<ServerState>>) -> Json<MonitoringReport> {
    Json(state.reports.build(&state.monitor))
}

/// Build the API router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/gases", get(list_gases))
        .route("/gases/:gas", get(gas_status))
        .route("/gases/:gas/latest", get(latest))
        .route("/gases/:gas/status", get(classify))
        .route("/gases/:gas/summary", get(summary))
        .route("/gases/:gas/windowed", get(windowed))
        .route("/gases/:gas/readings", get(readings).post(append_reading))
        .route("/gases/:gas/thresholds", get(get_thresholds).put(put_thresholds))
        .route("/report", get(report))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                    HeaderValue::from_static("http://localhost:8050"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    monitor: SharedMonitor,
    activity: SharedActivityLog,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config, monitor, activity));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Gas monitor API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
