//! Integration tests for the dashboard API endpoints

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    routing::get as get_route,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use vigil_lib::{
    clock::ManualClock,
    health::components,
    monitor::{EventKind, SourceKind},
    observability::DashboardMetrics,
    StructuredLogger,
};
use vigil_server::{create_router, with_middleware, AppState, Pipeline, VigilConfig};

const BROWSER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

async fn test_state(trust_forwarded_for: bool) -> Arc<AppState> {
    let config = VigilConfig {
        metric_source: SourceKind::Simulated,
        scan_host_logs: false,
        ..Default::default()
    };
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let pipeline = Pipeline::build(&config, clock, &StructuredLogger::default());
    pipeline.health.register_pipeline().await;

    Arc::new(
        AppState::new(pipeline, DashboardMetrics::new())
            .with_trusted_forwarding(trust_forwarded_for),
    )
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let state = test_state(false).await;
    let router = create_router(state.clone());

    (router, state)
}

fn with_peer(mut request: Request<Body>, peer: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    request
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::USER_AGENT, BROWSER_AGENT)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::USER_AGENT, BROWSER_AGENT)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"].as_object().unwrap().len(), 6);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::SECURITY_MONITOR, "security monitor unavailable")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    // Degraded is still operational
    assert_eq!(response.status(), StatusCode::OK);
    let health = json_body(response).await;
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::BROADCASTER, "channel closed")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_before_and_after_start() {
    let (app, state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let readiness = json_body(response).await;
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("vigil_snapshots_captured_total"));
}

#[tokio::test]
async fn test_api_health_liveness() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["uptime_seconds"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_composite_state() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/api/state")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    for key in ["system", "api", "agents", "security", "analytics"] {
        assert!(body.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(body["system"]["source"], "simulated");
    assert_eq!(body["api"]["apis"].as_array().unwrap().len(), 2);
    assert!(body["health"].is_null());
    assert_eq!(body["connected_clients"], 0);
}

#[tokio::test]
async fn test_post_message_then_list() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/messages",
            r#"{"text":"deploy <b>done</b>","author":"ops"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["text"], "deploy bdone/b");
    assert_eq!(created["author"], "ops");
    assert!(created["id"].is_string());

    let response = app.oneshot(get("/api/messages")).await.unwrap();
    let messages = json_body(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["id"], created["id"]);
}

#[tokio::test]
async fn test_post_empty_message_rejected() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json("/api/messages", r#"{"text":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "EMPTY_MESSAGE");
}

#[tokio::test]
async fn test_post_oversized_message_rejected() {
    let (app, state) = setup_test_app().await;

    let body = serde_json::json!({ "text": "x".repeat(1001) }).to_string();
    let response = app.oneshot(post_json("/api/messages", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(state.pipeline.hub.recent_messages().is_empty());
}

#[tokio::test]
async fn test_post_malformed_body_rejected() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json("/api/messages", r#"{"author":"ops"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "MALFORMED_BODY");
}

#[tokio::test]
async fn test_monitoring_envelope() {
    let (app, _state) = setup_test_app().await;

    for uri in [
        "/api/monitoring/system",
        "/api/monitoring/api-performance",
        "/api/monitoring/agents",
        "/api/monitoring/security",
        "/api/monitoring/health-analytics",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let body = json_body(response).await;
        assert_eq!(body["success"], true, "{}", uri);
        assert!(body["data"].is_object(), "{}", uri);
    }
}

#[tokio::test]
async fn test_health_analytics_neutral_before_first_capture() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(get("/api/monitoring/health-analytics"))
        .await
        .unwrap();
    let body = json_body(response).await;

    assert_eq!(body["data"]["snapshot_count"], 0);
    assert_eq!(body["data"]["current"]["overall"], 50.0);
    assert_eq!(body["data"]["trends"]["system"], "insufficient_data");
}

#[tokio::test]
async fn test_dashboard_summary_block() {
    let (app, state) = setup_test_app().await;
    state.pipeline.analytics.run_cycle().unwrap();

    let response = app.oneshot(get("/api/monitoring/dashboard")).await.unwrap();
    let body = json_body(response).await;

    let summary = &body["data"]["summary"];
    assert!(summary["overall_health"].is_number());
    assert_eq!(summary["total_connected_agents"], 0);
    assert!(summary["security_status"].is_string());
    assert!(summary["api_health"].is_string());
    assert_eq!(body["data"]["health"]["snapshot_count"], 1);
}

#[tokio::test]
async fn test_export_is_attachment() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/api/monitoring/export")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("monitoring-export.json"));

    let body = json_body(response).await;
    for key in ["system", "api", "agents", "security", "analytics", "messages"] {
        assert!(body.get(key).is_some(), "missing {}", key);
    }
}

#[tokio::test]
async fn test_injection_attempt_recorded() {
    let (app, state) = setup_test_app().await;

    let response = app
        .oneshot(get("/api/health?id=1%27%20OR%20%271%27%3D%271"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = state.pipeline.monitors.security.metrics();
    assert!(metrics
        .recent_events
        .iter()
        .any(|e| e.kind == EventKind::PotentialSqlInjection));
}

#[tokio::test]
async fn test_message_body_fields_inspected() {
    let (app, state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/messages",
            r#"{"text":"hi <script>alert(1)</script> ' OR '1'='1","author":"ops"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let kinds: Vec<EventKind> = state
        .pipeline
        .monitors
        .security
        .metrics()
        .recent_events
        .iter()
        .map(|e| e.kind)
        .collect();
    assert!(kinds.contains(&EventKind::PotentialSqlInjection));
    assert!(kinds.contains(&EventKind::XssAttempt));
}

#[tokio::test]
async fn test_form_body_fields_inspected() {
    let (app, state) = setup_test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header(header::USER_AGENT, BROWSER_AGENT)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("path=..%2F..%2Fetc%2Fpasswd"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(state
        .pipeline
        .monitors
        .security
        .metrics()
        .recent_events
        .iter()
        .any(|e| e.kind == EventKind::DirectoryTraversal));
}

#[tokio::test]
async fn test_body_over_frame_limit_rejected_before_handler() {
    let (app, state) = setup_test_app().await;

    let limit = state.pipeline.hub.max_frame_len();
    let body = serde_json::json!({ "text": "x".repeat(limit) }).to_string();
    let request = with_peer(post_json("/api/messages", &body), [192, 0, 2, 20]);
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(state.pipeline.hub.recent_messages().is_empty());

    let record = state
        .pipeline
        .monitors
        .security
        .connection("192.0.2.20")
        .unwrap();
    assert_eq!(record.failures, 1);
}

#[tokio::test]
async fn test_forwarded_for_ignored_unless_trusted() {
    let (app, state) = setup_test_app().await;

    for i in 0..30 {
        let request = Request::builder()
            .uri("/no-such-route")
            .header(header::USER_AGENT, BROWSER_AGENT)
            .header("x-forwarded-for", format!("203.0.113.{}", i))
            .body(Body::empty())
            .unwrap();
        let response = app
            .clone()
            .oneshot(with_peer(request, [192, 0, 2, 10]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let security = &state.pipeline.monitors.security;
    let record = security.connection("192.0.2.10").unwrap();
    assert_eq!(record.failures, 30);
    assert!(security.connection("203.0.113.0").is_none());
    assert!(security
        .metrics()
        .recent_events
        .iter()
        .any(|e| e.kind == EventKind::BruteForceDetected));
}

#[tokio::test]
async fn test_panicking_handler_still_recorded() {
    let state = test_state(false).await;
    async fn boom() -> &'static str {
        panic!("handler failure")
    }
    let routes = Router::new().route("/boom", get_route(boom));
    let app = with_middleware(routes, state.clone());

    let response = app
        .oneshot(with_peer(get("/boom"), [192, 0, 2, 30]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let record = state
        .pipeline
        .monitors
        .security
        .connection("192.0.2.30")
        .unwrap();
    assert_eq!(record.attempts, 1);
}

#[tokio::test]
async fn test_client_errors_count_as_failed_attempts() {
    let state = test_state(true).await;
    let app = create_router(state.clone());

    let request = Request::builder()
        .uri("/no-such-route")
        .header(header::USER_AGENT, BROWSER_AGENT)
        .header("x-forwarded-for", "198.51.100.9")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let record = state
        .pipeline
        .monitors
        .security
        .connection("198.51.100.9")
        .unwrap();
    assert_eq!(record.attempts, 1);
    assert_eq!(record.failures, 1);
}

#[tokio::test]
async fn test_missing_user_agent_flagged() {
    let (app, state) = setup_test_app().await;

    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap();

    let metrics = state.pipeline.monitors.security.metrics();
    assert!(metrics
        .recent_events
        .iter()
        .any(|e| e.kind == EventKind::SuspiciousUserAgent));
}
