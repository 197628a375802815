use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::future::join_all;
use medbench_adapters::EndpointHealth;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub questions: usize,
    pub endpoints: Vec<EndpointHealth>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let endpoints = state.resolver.endpoints();
    let endpoints = join_all(endpoints.iter().map(|e| state.probe.probe(e))).await;

    // The service itself is up; unreachable inference endpoints only degrade it.
    let status = if endpoints.iter().all(|e| e.reachable) {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        questions: state.questions.len(),
        endpoints,
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "METRICS_DISABLED", "Metrics exporter is not installed"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response())
}
