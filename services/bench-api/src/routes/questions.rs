use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use medbench_core::{BenchmarkQuestion, Category};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QuestionFilter {
    pub category: Option<String>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/questions", get(list_questions))
}

async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<QuestionFilter>,
) -> Result<Json<Vec<BenchmarkQuestion>>, ApiError> {
    let questions = match filter.category {
        Some(category) => {
            let category: Category = category
                .parse()
                .map_err(|e: String| ApiError::bad_request("INVALID_CATEGORY", e))?;
            state.questions.by_category(category).into_iter().cloned().collect()
        }
        None => state.questions.all().to_vec(),
    };
    Ok(Json(questions))
}
