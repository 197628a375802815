//! Single-test executor.
//!
//! Runs one question against one model and folds every outcome, including
//! timeouts and transport failures, into a [`TestResult`]. Nothing here
//! returns an error: the orchestrator must be able to keep going.

use medbench_core::config::ExecutionProfile;
use medbench_core::{
    BenchmarkQuestion, GenerationClient, GenerationError, GenerationRequest, TestResult,
};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Executes single (model, question) tests with a fixed profile.
#[derive(Clone)]
pub struct TestExecutor {
    client: Arc<dyn GenerationClient>,
    profile: ExecutionProfile,
}

impl std::fmt::Debug for TestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestExecutor")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl TestExecutor {
    /// Create an executor for one calling context.
    pub fn new(client: Arc<dyn GenerationClient>, profile: ExecutionProfile) -> Self {
        Self { client, profile }
    }

    /// Run one test. Never fails; failures are recorded in the result.
    #[instrument(skip(self, question, endpoint), fields(question_id = %question.id))]
    pub async fn execute(
        &self,
        model: &str,
        question: &BenchmarkQuestion,
        endpoint: &str,
    ) -> TestResult {
        if question.prompt.trim().is_empty() {
            warn!("Question has an empty prompt, skipping call");
            return self.record(model, TestResult::failure("Question has an empty prompt", 0));
        }

        let request = GenerationRequest::new(model, question.prompt.as_str(), self.profile.options);
        let timeout = self.profile.timeout();
        let start = Instant::now();

        let outcome = match tokio::time::timeout(timeout, self.client.generate(endpoint, &request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(GenerationError::Timeout(timeout)),
        };
        let response_time_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(response) => {
                // Character count stands in when the provider reports no token count.
                let tokens = response
                    .eval_count
                    .unwrap_or_else(|| response.response.chars().count() as u64);
                debug!(response_time_ms, tokens, "Test succeeded");
                TestResult::success(response.response, response_time_ms, tokens)
            }
            Err(err) => {
                warn!(
                    endpoint = %endpoint,
                    error_kind = err.kind(),
                    error = %err,
                    response_time_ms,
                    "Test failed"
                );
                TestResult::failure(err.to_string(), response_time_ms)
            }
        };

        self.record(model, result)
    }

    fn record(&self, model: &str, result: TestResult) -> TestResult {
        let outcome = if result.success { "success" } else { "failure" };
        metrics::counter!(
            "medbench_tests_total",
            "model" => model.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("medbench_test_duration_ms", "model" => model.to_string())
            .record(result.response_time_ms as f64);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medbench_core::{Category, Difficulty, GenerationResponse};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behaviour {
        Respond { delay_ms: u64, response: GenerationResponse },
        Fail(GenerationError),
        Hang,
    }

    struct ScriptedClient {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(
            &self,
            _endpoint: &str,
            _request: &GenerationRequest,
        ) -> Result<GenerationResponse, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Respond { delay_ms, response } => {
                    tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                    Ok(response.clone())
                }
                Behaviour::Fail(err) => Err(err.clone()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(GenerationResponse::text("too late"))
                }
            }
        }
    }

    fn question(prompt: &str) -> BenchmarkQuestion {
        BenchmarkQuestion::new("q1", prompt, Category::Medical, Difficulty::Easy, "text")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_uses_provider_token_count() {
        let client = ScriptedClient::new(Behaviour::Respond {
            delay_ms: 2000,
            response: GenerationResponse {
                response: "The sciatic nerve arises from L4-S3.".into(),
                eval_count: Some(100),
                ..Default::default()
            },
        });
        let executor = TestExecutor::new(client, ExecutionProfile::batch());

        let result = executor.execute("meditron:7b", &question("Describe the sciatic nerve."), "http://x").await;
        assert!(result.success);
        assert_eq!(result.response_time_ms, 2000);
        assert_eq!(result.tokens_generated, 100);
        assert_eq!(result.tokens_per_second, 50.0);
        assert!(result.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_falls_back_to_character_count() {
        let client = ScriptedClient::new(Behaviour::Respond {
            delay_ms: 500,
            response: GenerationResponse::text("Canberra"),
        });
        let executor = TestExecutor::new(client, ExecutionProfile::batch());

        let result = executor.execute("llama3", &question("Capital?"), "http://x").await;
        assert_eq!(result.tokens_generated, 8);
        assert_eq!(result.tokens_per_second, 16.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_failed_result() {
        let client = ScriptedClient::new(Behaviour::Hang);
        let executor = TestExecutor::new(client, ExecutionProfile::streaming());

        let result = executor.execute("slow-model", &question("Anything"), "http://x").await;
        assert!(!result.success);
        assert_eq!(result.response_time_ms, 30_000);
        assert_eq!(result.tokens_generated, 0);
        assert_eq!(result.tokens_per_second, 0.0);
        assert_eq!(result.error.as_deref(), Some("Request timed out after 30s"));
    }

    #[tokio::test]
    async fn test_transport_failures_are_described() {
        let client = ScriptedClient::new(Behaviour::Fail(GenerationError::HttpStatus {
            status: 500,
            body: "out of memory".into(),
        }));
        let executor = TestExecutor::new(client, ExecutionProfile::batch());

        let result = executor.execute("m", &question("Anything"), "http://x").await;
        assert!(!result.success);
        assert_eq!(result.response, "");
        assert_eq!(result.error.as_deref(), Some("HTTP 500: out of memory"));

        let client = ScriptedClient::new(Behaviour::Fail(GenerationError::ConnectionRefused(
            "tcp connect error".into(),
        )));
        let executor = TestExecutor::new(client, ExecutionProfile::batch());
        let result = executor.execute("m", &question("Anything"), "http://x").await;
        assert_eq!(result.error.as_deref(), Some("Connection refused: tcp connect error"));
    }

    #[tokio::test]
    async fn test_empty_prompt_makes_no_call() {
        let client = ScriptedClient::new(Behaviour::Hang);
        let executor = TestExecutor::new(client.clone(), ExecutionProfile::batch());

        let result = executor.execute("m", &question("   "), "http://x").await;
        assert!(!result.success);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_execution_issues_independent_calls() {
        let client = ScriptedClient::new(Behaviour::Respond {
            delay_ms: 10,
            response: GenerationResponse::text("ok"),
        });
        let executor = TestExecutor::new(client.clone(), ExecutionProfile::batch());

        let first = executor.execute("m", &question("Q"), "http://x").await;
        let second = executor.execute("m", &question("Q"), "http://x").await;
        assert_eq!(first, second);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }
}
