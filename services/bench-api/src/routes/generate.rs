use axum::{extract::State, routing::post, Json, Router};
use medbench_core::{GenerationOptions, GenerationRequest, GenerationResponse, ResolveEndpoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub options: GenerationOptions,
    /// Explicit endpoint; the resolver decides when absent
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub model: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub generation: GenerationResponse,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/generate", post(generate))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    if body.model.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_INPUT", "model is required"));
    }
    if body.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("INVALID_INPUT", "prompt is required"));
    }

    let endpoint = body
        .endpoint
        .clone()
        .unwrap_or_else(|| state.resolver.resolve(&body.model));
    debug!(model = %body.model, endpoint = %endpoint, "Proxying generate call");

    let request = GenerationRequest::new(body.model.as_str(), body.prompt.as_str(), body.options);
    let generation = state.client.generate(&endpoint, &request).await?;

    Ok(Json(GenerateResponse {
        model: body.model,
        endpoint,
        generation,
    }))
}
