//! Health check and version endpoints
//!
//! Liveness only: the hub holds no external connections whose loss
//! would make it unready, so /health reports running state plus the
//! current verified subscriber count.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::server::AppState;

/// Health response body
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if the service is running)
    pub healthy: bool,
    /// Service version
    pub version: &'static str,
    /// Seconds since this instance started
    pub uptime_secs: u64,
    /// Node identifier
    pub node_id: String,
    /// Number of verified subscribers in the registry
    pub subscribers: usize,
    /// Base URL of the resubscription helper
    pub collaborator: String,
}

/// GET /health, /healthz - liveness probe
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        node_id: state.args.node_id.to_string(),
        subscribers: state.registry.len(),
        collaborator: state.collaborator.base_url().to_string(),
    };

    json_response(StatusCode::OK, &response)
}

/// GET /version - version info for deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error": "serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("static response")
}
