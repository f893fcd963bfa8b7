//! Web server module for Amaunator.
//!
//! JSON API over the [`MonitorService`] plus a Prometheus scrape endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::metrics::{CONTENT_TYPE, PrometheusExporter};
use crate::monitor::{MonitorError, SystemStats, TargetDefinition, TargetId, TargetSpec, TargetWithStatus};
use crate::service::MonitorService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: MonitorService,
    pub exporter: PrometheusExporter,
}

impl AppState {
    /// State whose exporter reads the service's own metrics.
    pub fn new(service: MonitorService) -> Self {
        let exporter = PrometheusExporter::new(Arc::clone(service.metrics()));
        Self { service, exporter }
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    accepting: bool,
}

/// JSON error body.
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// API error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MonitorError::InvalidTarget(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::ShuttingDown | MonitorError::QueueClosed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        let detail = match &self.0 {
            MonitorError::NotFound(_) => "Target not found".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let app_state = Arc::new(state);

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/targets", get(list_targets_handler).post(create_target_handler))
        .route(
            "/targets/{id}",
            get(get_target_handler).delete(delete_target_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Liveness check.
async fn healthz_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        accepting: state.service.is_accepting(),
    })
}

async fn create_target_handler(
    State(state): State<Arc<AppState>>,
    Json(spec): Json<TargetSpec>,
) -> Result<(StatusCode, Json<TargetDefinition>), ApiError> {
    let target = state.service.create(spec)?;
    Ok((StatusCode::CREATED, Json(target)))
}

async fn list_targets_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TargetWithStatus>> {
    Json(state.service.list())
}

async fn get_target_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TargetId>,
) -> Result<Json<TargetWithStatus>, ApiError> {
    state
        .service
        .get(&id)
        .map(Json)
        .ok_or(ApiError(MonitorError::NotFound(id)))
}

async fn delete_target_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<TargetId>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<SystemStats> {
    Json(state.service.stats())
}

/// Prometheus scrape endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    state
        .service
        .metrics()
        .set_queue_size(state.service.queue_depth());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], state.exporter.export()).into_response()
}
