//! Health check and metrics endpoints.
//!
//! Used by load balancers and monitoring systems to verify the server is up
//! and to scrape its Prometheus metrics.

use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use pixwap_gallery::Backend;
use serde::Serialize;

/// Content type of the Prometheus text exposition format.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// `"loading"` until the first identity report is synchronised
    pub session: &'static str,
}

/// Liveness and session readiness.
///
/// Always 200; the session field tells whether guarded pages can answer yet.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0",
///   "session": "ready"
/// }
/// ```
pub async fn health<B: Backend>(State(state): State<AppState<B>>) -> Json<HealthResponse> {
    let loading = state.session.snapshot().await.loading;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        session: if loading { "loading" } else { "ready" },
    })
}

/// Prometheus metrics.
///
/// # Status Codes
///
/// - 200 OK: Rendered metrics
/// - 404 Not Found: No recorder installed
/// - 503 Service Unavailable: Recorder installed but not ready
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
pub async fn metrics<B: Backend>(State(state): State<AppState<B>>) -> Response {
    let Some(recorder) = state.metrics.as_ref() else {
        return (StatusCode::NOT_FOUND, "Metrics are disabled").into_response();
    };

    match recorder.render() {
        Some(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics recorder not ready").into_response(),
    }
}
