//! Request inspection middleware
//!
//! Every request is analyzed for attack patterns before it is handled and
//! recorded as a connection attempt afterwards. A 4xx response counts as a
//! failed attempt. Bodies of write requests are buffered, bounded by the hub
//! frame limit, and their fields are inspected alongside the query string.

use crate::api::{ApiError, AppState};
use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;
use vigil_lib::error::InputError;
use vigil_lib::monitor::security::body_params;

pub async fn inspect_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request, state.trust_forwarded_for);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let path = request.uri().path().to_string();
    let target = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let security = &state.pipeline.monitors.security;

    let (request, params) = if carries_body(request.method()) {
        let limit = state.pipeline.hub.max_frame_len();
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, limit).await {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(ip = %ip, path = %path, limit, "Request body over limit");
                security.record_connection(&ip, false, user_agent.as_deref(), Some(&path));
                return ApiError::from(InputError::TooLarge {
                    max: state.pipeline.hub.max_message_len(),
                })
                .into_response();
            }
        };
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let params = body_params(content_type, &bytes);
        (Request::from_parts(parts, Body::from(bytes)), params)
    } else {
        (request, Vec::new())
    };

    let attacks = security.inspect_request(&ip, &target, &params, user_agent.as_deref());
    if !attacks.is_empty() {
        debug!(ip = %ip, path = %path, attacks = attacks.len(), "Suspicious request");
    }

    let response = next.run(request).await;

    let succeeded = !response.status().is_client_error();
    security.record_connection(&ip, succeeded, user_agent.as_deref(), Some(&path));

    response
}

fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Peer address, or the first `X-Forwarded-For` hop when the proxy is trusted
fn client_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(first) = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .filter(|first| !first.is_empty())
        {
            return first.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarded_request() -> Request {
        let mut request = Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        request
    }

    #[test]
    fn test_client_ip_forwarded_header_when_trusted() {
        assert_eq!(client_ip(&forwarded_request(), true), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_ignores_forwarded_header_by_default() {
        assert_eq!(client_ip(&forwarded_request(), false), "192.0.2.1");
    }

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&request, true), "192.0.2.1");
    }

    #[test]
    fn test_client_ip_unknown() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request, false), "unknown");
    }

    #[test]
    fn test_carries_body() {
        assert!(carries_body(&Method::POST));
        assert!(!carries_body(&Method::GET));
    }
}
