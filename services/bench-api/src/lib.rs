// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bench API service.
//!
//! Exposes the question bank, benchmark runs (batch and server-sent
//! events), stored results with reviewer ratings, a generate proxy and
//! Prometheus metrics over HTTP.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;
pub use state::AppState;

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::questions::routes())
        .merge(routes::benchmark::routes())
        .merge(routes::results::routes())
        .merge(routes::generate::routes())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use medbench_adapters::{EndpointHealth, HealthProbe};
    use medbench_benchmarks::{JsonFileStore, ResultStore};
    use medbench_core::config::AppConfig;
    use medbench_core::{
        BenchmarkRun, GenerationClient, GenerationError, GenerationRequest, GenerationResponse,
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    /// Answers every prompt after 50ms; models named `broken*` fail.
    #[derive(Default)]
    struct FakeClient {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl GenerationClient for FakeClient {
        async fn generate(
            &self,
            endpoint: &str,
            request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), request.model.clone()));
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            if request.model.starts_with("broken") {
                return Err(GenerationError::ConnectionRefused("no route".into()));
            }
            Ok(GenerationResponse {
                response: format!("{} says hi", request.model),
                eval_count: Some(5),
                ..Default::default()
            })
        }
    }

    struct FakeProbe;

    #[async_trait]
    impl HealthProbe for FakeProbe {
        async fn probe(&self, endpoint: &str) -> EndpointHealth {
            EndpointHealth {
                endpoint: endpoint.to_string(),
                reachable: !endpoint.contains("11436"),
                models: vec!["llama3".to_string()],
                latency_ms: 1,
                error: None,
            }
        }
    }

    struct Harness {
        app: Router,
        client: Arc<FakeClient>,
        store: Arc<JsonFileStore>,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
        let client = Arc::new(FakeClient::default());
        let state = AppState::new(
            AppConfig::default(),
            client.clone(),
            Arc::new(FakeProbe),
            store.clone(),
        );
        Harness {
            app: app(Arc::new(state)),
            client,
            store,
            _dir: dir,
        }
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_degraded_endpoints() {
        let h = harness();
        let response = h.app.oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["questions"], 12);
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_questions_filter_by_category() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(get("/api/questions?category=osteopathy"))
            .await
            .unwrap();
        let body = body_json(response).await;
        let questions = body.as_array().unwrap();
        assert!(!questions.is_empty());
        assert!(questions.iter().all(|q| q["category"] == "osteopathy"));

        let response = h.app.oneshot(get("/api/questions?category=astrology")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_CATEGORY");
        assert!(body["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_batch_run_returns_and_stores_run() {
        let h = harness();
        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run",
                json!({
                    "models": ["llama3", "broken-model"],
                    "question_ids": ["general_capital", "unknown_id"]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let run: BenchmarkRun =
            tokio_test::assert_ok!(serde_json::from_str(&body_string(response).await));
        assert_eq!(run.models_tested, 2);
        assert_eq!(run.questions_tested, 1);
        assert_eq!(run.dropped_question_ids, vec!["unknown_id".to_string()]);
        assert_eq!(run.summary.successful_tests, 1);
        assert_eq!(run.summary.failed_tests, 1);
        assert_eq!(h.store.load(&run.id).unwrap(), run);
    }

    #[tokio::test]
    async fn test_batch_run_rejects_empty_models_without_calls() {
        let h = harness();
        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run",
                json!({ "models": [], "question_ids": ["general_capital"] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
        assert!(h.client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_without_models_field_is_a_structured_400() {
        for uri in ["/api/benchmark/run", "/api/benchmark/run-stream"] {
            let h = harness();
            let response = h
                .app
                .oneshot(json_request(
                    "POST",
                    uri,
                    json!({ "question_ids": ["general_capital"] }),
                ))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["error"]["code"], "INVALID_INPUT");
            assert!(body["meta"]["timestamp"].is_string());
            assert!(h.client.calls.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/api/benchmark/run")
            .header("content-type", "application/json")
            .body(Body::from("{\"models\": [\"llama3\""))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_BODY");
        assert!(body["meta"]["timestamp"].is_string());

        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run",
                json!({ "models": "llama3", "question_ids": ["general_capital"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_BODY");
        assert!(h.client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_emits_ordered_events() {
        let h = harness();
        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run-stream",
                json!({
                    "models": ["llama3", "meditron:7b"],
                    "question_ids": ["general_capital", "osteo_principles"]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let body = body_string(response).await;
        let events: Vec<Value> = body
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|data| serde_json::from_str(data.trim_start()).unwrap())
            .collect();

        assert_eq!(events.first().unwrap()["type"], "start");
        assert_eq!(events.first().unwrap()["total"], 4);
        assert_eq!(events.last().unwrap()["type"], "complete");

        let completed: Vec<u64> = events
            .iter()
            .filter(|e| e["type"] == "progress")
            .map(|e| e["completed"].as_u64().unwrap())
            .collect();
        assert_eq!(completed, vec![1, 2, 3, 4]);
        assert!(body.contains("event:") && body.contains("progress"));

        let medical: Vec<_> = h
            .client
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, model)| model == "meditron:7b")
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        assert_eq!(medical, vec!["http://localhost:11435"; 2]);
    }

    #[tokio::test]
    async fn test_stream_rejects_invalid_input_before_streaming() {
        let h = harness();
        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run-stream",
                json!({ "models": ["llama3"], "question_ids": ["nope"] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_results_rating_and_deletion() {
        let h = harness();
        let run = h
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/benchmark/run",
                json!({ "models": ["llama3"], "question_ids": ["general_capital"] }),
            ))
            .await
            .unwrap();
        let run: BenchmarkRun = serde_json::from_str(&body_string(run).await).unwrap();

        let listed = body_json(h.app.clone().oneshot(get("/api/benchmark/results")).await.unwrap()).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let rating_uri = format!("/api/benchmark/results/{}/rating", run.id);
        let response = h
            .app
            .clone()
            .oneshot(json_request(
                "PUT",
                &rating_uri,
                json!({ "model": "llama3", "question_id": "general_capital", "rating": 4, "comment": "Correct" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let rated = body_json(response).await;
        assert_eq!(rated["user_rating"], 4);
        assert_eq!(rated["user_comment"], "Correct");

        let response = h
            .app
            .clone()
            .oneshot(json_request(
                "PUT",
                &rating_uri,
                json!({ "model": "llama3", "question_id": "general_capital", "rating": 7 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let uri = format!("/api/benchmark/results/{}", run.id);
        let response = h
            .app
            .clone()
            .oneshot(Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = h.app.oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_generate_proxy_resolves_endpoint() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/generate",
                json!({ "model": "biomistral", "prompt": "Hello", "options": { "temperature": 0.1 } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["endpoint"], "http://localhost:11435");
        assert_eq!(body["response"], "biomistral says hi");

        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/generate",
                json!({ "model": "broken", "prompt": "Hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "UPSTREAM_UNREACHABLE");
    }

    #[tokio::test]
    async fn test_metrics_without_exporter_is_not_found() {
        let h = harness();
        let response = h.app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
