use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use medbench_benchmarks::{ResultStore, StoreError};
use medbench_core::{BenchmarkRun, TestResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub model: String,
    pub question_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/benchmark/results", get(list_results).delete(delete_all_results))
        .route("/api/benchmark/results/:id", get(get_result).delete(delete_result))
        .route("/api/benchmark/results/:id/rating", put(rate_result))
}

/// Run a store operation on the blocking pool.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ResultStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| ApiError::internal(format!("Storage task failed: {}", e)))?
        .map_err(ApiError::from)
}

async fn list_results(State(state): State<Arc<AppState>>) -> Result<Json<Vec<BenchmarkRun>>, ApiError> {
    Ok(Json(with_store(&state, |store| store.list()).await?))
}

async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BenchmarkRun>, ApiError> {
    Ok(Json(with_store(&state, move |store| store.load(&id)).await?))
}

async fn delete_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_id = id.clone();
    with_store(&state, move |store| store.delete(&id)).await?;
    info!(run_id = %deleted_id, "Benchmark run deleted");
    Ok(Json(DeleteResponse { deleted: 1 }))
}

async fn delete_all_results(State(state): State<Arc<AppState>>) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = with_store(&state, |store| store.delete_all()).await?;
    info!(deleted, "All benchmark runs deleted");
    Ok(Json(DeleteResponse { deleted }))
}

async fn rate_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RatingRequest>,
) -> Result<Json<TestResult>, ApiError> {
    let RatingRequest {
        model,
        question_id,
        rating,
        comment,
    } = body;

    let (model_key, question_key) = (model.clone(), question_id.clone());
    let run = with_store(&state, move |store| {
        store.rate(&id, &model, &question_id, rating, comment)
    })
    .await?;

    run.result(&model_key, &question_key)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::internal("Rated result missing after update"))
}
