//! HTTP API: dashboard REST routes, probes, Prometheus metrics and the
//! WebSocket endpoint

use crate::pipeline::Pipeline;
use crate::{security, ws};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::json;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use vigil_lib::{
    broadcast::MessageSubmission,
    error::InputError,
    health::{ComponentStatus, HealthRegistry},
    observability::DashboardMetrics,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const CONNECTION_HISTORY_LIMIT: usize = 20;
const TREND_WINDOW: Duration = Duration::from_secs(60 * 60);
const EXPORT_FILENAME: &str = "vigil-monitoring-export.json";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: DashboardMetrics,
    pub pipeline: Pipeline,
    /// Honor `X-Forwarded-For` when resolving the client address
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(pipeline: Pipeline, metrics: DashboardMetrics) -> Self {
        Self {
            health_registry: pipeline.health.clone(),
            metrics,
            pipeline,
            trust_forwarded_for: false,
        }
    }

    pub fn with_trusted_forwarding(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

/// Errors returned by REST handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Input(e) => {
                let status = match e {
                    InputError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                (
                    status,
                    Json(json!({ "error": e.to_string(), "code": e.code() })),
                )
                    .into_response()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "Request failed");
                internal_error_response()
            }
        }
    }
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal server error",
            "code": "INTERNAL_ERROR",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    error!(panic = %detail, "Request handler panicked");
    internal_error_response()
}

/// `{success, data, timestamp}` wrapper used by the monitoring routes
fn envelope<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": data,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(anyhow::Error::from)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Liveness; never touches the monitors
async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": VERSION,
        "uptime_seconds": state.pipeline.hub.uptime_seconds(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn composite_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.hub.composite_state())
}

async fn list_messages(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.hub.recent_messages())
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MessageSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(submission) = body.map_err(|e| InputError::Malformed(e.body_text()))?;
    let message = state.pipeline.hub.submit_message(None, submission)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn system_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    envelope(state.pipeline.monitors.system.sample())
}

async fn api_performance(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let api = &state.pipeline.monitors.api;
    envelope(json!({
        "summary": api.summary(),
        "trends": api.trends(TREND_WINDOW),
    }))
}

async fn agent_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let agents = &state.pipeline.monitors.agents;
    envelope(json!({
        "metrics": agents.metrics(),
        "connection_history": agents.connection_history(CONNECTION_HISTORY_LIMIT),
        "clients": state.pipeline.hub.clients(),
    }))
}

async fn security_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    envelope(state.pipeline.monitors.security.metrics())
}

async fn health_analytics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    envelope(state.pipeline.analytics.summary())
}

async fn dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let monitors = &state.pipeline.monitors;
    let system = monitors.system.sample();
    let api = monitors.api.summary();
    let agents = monitors.agents.metrics();
    let security = monitors.security.metrics();
    let analytics = state.pipeline.analytics.summary();

    let summary = json!({
        "overall_health": analytics.current.overall,
        "total_connected_agents": agents.connected,
        "system_uptime": system.uptime_secs,
        "system_health": system.health,
        "api_health": api.health,
        "gateway_stability": api.gateway_stability,
        "security_status": security.threat.status,
        "agent_health": agents.health,
    });

    envelope(json!({
        "system": system,
        "api": api,
        "agents": agents,
        "security": security,
        "health": analytics,
        "summary": summary,
    }))
}

async fn export(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pipeline = &state.pipeline;
    let body = json!({
        "exported_at": chrono::Utc::now().to_rfc3339(),
        "system": pipeline.monitors.system.sample(),
        "api": pipeline.monitors.api.export(),
        "agents": pipeline.monitors.agents.export(),
        "security": pipeline.monitors.security.export(),
        "analytics": pipeline.analytics.export(),
        "messages": pipeline.hub.recent_messages(),
    });

    (
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
        )],
        Json(body),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/health", get(api_health))
        .route("/api/state", get(composite_state))
        .route("/api/messages", get(list_messages).post(post_message))
        .route("/api/monitoring/system", get(system_metrics))
        .route("/api/monitoring/api-performance", get(api_performance))
        .route("/api/monitoring/agents", get(agent_metrics))
        .route("/api/monitoring/security", get(security_metrics))
        .route("/api/monitoring/health-analytics", get(health_analytics))
        .route("/api/monitoring/dashboard", get(dashboard))
        .route("/api/monitoring/export", get(export))
        .route("/ws", get(ws::ws_handler));

    with_middleware(routes, state)
}

/// Wrap routes in the shared layer stack
///
/// Request inspection sits outside panic recovery so a panicking handler is
/// still recorded as a connection attempt.
pub fn with_middleware(routes: Router<Arc<AppState>>, state: Arc<AppState>) -> Router {
    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::inspect_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
