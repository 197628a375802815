//! Benchmark orchestrator.
//!
//! Runs the {models} x {questions} matrix, aggregates per-model and global
//! statistics and reports progress through an [`EventSink`].
//!
//! # Scheduling
//!
//! Tests are executed by workers. With [`ExecutionStrategy::Sequential`]
//! a single worker walks the whole matrix in caller order. With
//! [`ExecutionStrategy::PerEndpoint`] there is one worker per distinct
//! resolved endpoint, so models hosted on the same service still run one
//! after the other. In both cases a single aggregator receives worker
//! messages and is the only place events are emitted, which keeps the
//! `progress` counter strictly increasing by one.
//!
//! # Cancellation
//!
//! When the sink reports it is closed the aggregator stops and drops its
//! receiver. Workers notice on their next send and stop after the call they
//! have in flight. No further events are emitted.

use crate::event::BenchmarkEvent;
use crate::executor::TestExecutor;
use crate::io::ResultStore;
use crate::sink::{EventSink, SinkClosed};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use medbench_core::config::{ExecutionProfile, ExecutionStrategy};
use medbench_core::{
    BenchmarkQuestion, BenchmarkRun, Error, GenerationClient, ModelRunSummary, OrderedMap,
    QuestionBank, ResolveEndpoint, Result, RunSummary, TestResult,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Caller input for a run.
///
/// Absent fields deserialize as empty so validation, not parsing, rejects them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRequest {
    /// Model identifiers, in execution order
    pub models: Vec<String>,
    /// Question ids, in execution order
    pub question_ids: Vec<String>,
    /// Per-model endpoint URLs that win over the rule table
    pub endpoint_overrides: HashMap<String, String>,
}

impl RunRequest {
    /// Request without overrides.
    pub fn new<M, Q>(models: M, question_ids: Q) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        Q: IntoIterator,
        Q::Item: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            question_ids: question_ids.into_iter().map(Into::into).collect(),
            endpoint_overrides: HashMap::new(),
        }
    }
}

/// A validated run, ready to execute.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Run identifier
    pub run_id: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// De-duplicated models, in caller order
    pub models: Vec<String>,
    /// Resolved questions, in caller order
    pub questions: Vec<BenchmarkQuestion>,
    /// Requested question ids that were not found
    pub dropped_question_ids: Vec<String>,
    /// Per-model endpoint overrides
    pub endpoint_overrides: HashMap<String, String>,
}

impl RunPlan {
    /// Number of tests in the matrix.
    pub fn total_tests(&self) -> usize {
        self.models.len() * self.questions.len()
    }
}

/// Generate a run id from the creation time plus a random suffix.
pub fn generate_run_id(timestamp: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "run_{}_{}",
        timestamp.format("%Y%m%d_%H%M%S_%3f"),
        &suffix[..8]
    )
}

enum WorkerMessage {
    Starting {
        model: String,
        question_id: String,
    },
    Finished {
        model: String,
        question_id: String,
        result: TestResult,
    },
}

/// Runs benchmark matrices.
#[derive(Clone)]
pub struct BenchmarkOrchestrator {
    client: Arc<dyn GenerationClient>,
    resolver: Arc<dyn ResolveEndpoint>,
    questions: Arc<QuestionBank>,
    store: Option<Arc<dyn ResultStore>>,
    strategy: ExecutionStrategy,
}

impl std::fmt::Debug for BenchmarkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkOrchestrator")
            .field("questions", &self.questions.len())
            .field("store", &self.store.is_some())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl BenchmarkOrchestrator {
    /// Create an orchestrator without persistence, running sequentially.
    pub fn new(
        client: Arc<dyn GenerationClient>,
        resolver: Arc<dyn ResolveEndpoint>,
        questions: Arc<QuestionBank>,
    ) -> Self {
        Self {
            client,
            resolver,
            questions,
            store: None,
            strategy: ExecutionStrategy::Sequential,
        }
    }

    /// Persist finished runs to `store`.
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a different scheduling strategy.
    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Validate a request. No network activity happens here.
    pub fn plan(&self, request: &RunRequest) -> Result<RunPlan> {
        let mut seen = HashSet::new();
        let models: Vec<String> = request
            .models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .filter(|m| seen.insert(m.to_string()))
            .map(str::to_string)
            .collect();

        if models.is_empty() {
            return Err(Error::invalid_input("At least one model is required"));
        }
        if request.question_ids.is_empty() {
            return Err(Error::invalid_input("At least one question id is required"));
        }

        let resolution = self.questions.resolve(&request.question_ids);
        if resolution.questions.is_empty() {
            return Err(Error::invalid_input(format!(
                "None of the requested question ids are known: {}",
                resolution.dropped.join(", ")
            )));
        }
        if !resolution.dropped.is_empty() {
            warn!(dropped = ?resolution.dropped, "Ignoring unknown question ids");
        }

        let timestamp = Utc::now();
        Ok(RunPlan {
            run_id: generate_run_id(timestamp),
            timestamp,
            models,
            questions: resolution.questions,
            dropped_question_ids: resolution.dropped,
            endpoint_overrides: request.endpoint_overrides.clone(),
        })
    }

    /// Validate and execute a request.
    pub async fn run(
        &self,
        request: &RunRequest,
        profile: ExecutionProfile,
        sink: &mut dyn EventSink,
    ) -> Result<BenchmarkRun> {
        let plan = self.plan(request)?;
        self.run_plan(plan, profile, sink).await
    }

    /// Execute a validated plan.
    #[instrument(skip_all, fields(run_id = %plan.run_id))]
    pub async fn run_plan(
        &self,
        plan: RunPlan,
        profile: ExecutionProfile,
        sink: &mut dyn EventSink,
    ) -> Result<BenchmarkRun> {
        let started = Instant::now();
        let total = plan.total_tests();

        info!(
            models = plan.models.len(),
            questions = plan.questions.len(),
            total,
            strategy = ?self.strategy,
            timeout_ms = profile.timeout_ms,
            "Benchmark run started"
        );

        sink.emit(BenchmarkEvent::Start {
            run_id: plan.run_id.clone(),
            models: plan.models.clone(),
            question_ids: plan.questions.iter().map(|q| q.id.clone()).collect(),
            dropped_question_ids: plan.dropped_question_ids.clone(),
            total,
        })
        .await
        .map_err(|_| self.cancelled(&plan.run_id))?;

        let executor = TestExecutor::new(self.client.clone(), profile);
        let groups = self.worker_groups(&plan);
        let (tx, rx) = mpsc::channel(1);

        let workers: Vec<_> = groups
            .into_iter()
            .map(|group| run_worker(&executor, group, &plan.questions, tx.clone()))
            .collect();
        drop(tx);

        let (_, collected) = tokio::join!(join_all(workers), aggregate(rx, sink, total));
        let mut collected = collected.map_err(|_| self.cancelled(&plan.run_id))?;

        let mut results = OrderedMap::new();
        for model in &plan.models {
            let questions_results = collected.remove(model).unwrap_or_default();
            results.insert(model.clone(), ModelRunSummary::from_results(questions_results));
        }

        let total_duration_ms = started.elapsed().as_millis() as u64;
        let run = BenchmarkRun {
            id: plan.run_id,
            timestamp: plan.timestamp,
            models_tested: plan.models.len(),
            questions_tested: plan.questions.len(),
            summary: RunSummary::from_models(&results, total_duration_ms),
            results,
            dropped_question_ids: plan.dropped_question_ids,
        };

        if let Some(store) = self.store.clone() {
            let snapshot = run.clone();
            let saved = tokio::task::spawn_blocking(move || store.save(&snapshot))
                .await
                .map_err(|e| e.to_string())
                .and_then(|outcome| outcome.map_err(|e| e.to_string()));
            if let Err(e) = saved {
                error!(error = %e, "Failed to persist benchmark run");
                metrics::counter!("medbench_runs_total", "outcome" => "failed").increment(1);
                let message = format!("Failed to save benchmark run: {}", e);
                let _ = sink
                    .emit(BenchmarkEvent::Error {
                        message: message.clone(),
                    })
                    .await;
                return Err(Error::storage(message));
            }
        }

        info!(
            successful = run.summary.successful_tests,
            failed = run.summary.failed_tests,
            duration_ms = total_duration_ms,
            "Benchmark run completed"
        );
        metrics::counter!("medbench_runs_total", "outcome" => "completed").increment(1);

        if sink
            .emit(BenchmarkEvent::Complete {
                run: Box::new(run.clone()),
            })
            .await
            .is_err()
        {
            debug!("Event consumer left before the completion event");
        }

        Ok(run)
    }

    fn worker_groups(&self, plan: &RunPlan) -> Vec<Vec<(String, String)>> {
        let assignments: Vec<(String, String)> = plan
            .models
            .iter()
            .map(|model| {
                let endpoint = self.resolver.resolve_with(model, &plan.endpoint_overrides);
                (model.clone(), endpoint)
            })
            .collect();

        match self.strategy {
            ExecutionStrategy::Sequential => vec![assignments],
            ExecutionStrategy::PerEndpoint => {
                let mut groups: Vec<(String, Vec<(String, String)>)> = Vec::new();
                for (model, endpoint) in assignments {
                    match groups.iter_mut().find(|(e, _)| *e == endpoint) {
                        Some((_, group)) => group.push((model, endpoint)),
                        None => groups.push((endpoint.clone(), vec![(model, endpoint)])),
                    }
                }
                groups.into_iter().map(|(_, group)| group).collect()
            }
        }
    }

    fn cancelled(&self, run_id: &str) -> Error {
        warn!(run_id = %run_id, "Event consumer closed, abandoning benchmark run");
        metrics::counter!("medbench_runs_total", "outcome" => "cancelled").increment(1);
        Error::Cancelled
    }
}

async fn run_worker(
    executor: &TestExecutor,
    assignments: Vec<(String, String)>,
    questions: &[BenchmarkQuestion],
    tx: mpsc::Sender<WorkerMessage>,
) {
    for (model, endpoint) in assignments {
        for question in questions {
            let starting = WorkerMessage::Starting {
                model: model.clone(),
                question_id: question.id.clone(),
            };
            if tx.send(starting).await.is_err() {
                return;
            }

            let result = executor.execute(&model, question, &endpoint).await;

            let finished = WorkerMessage::Finished {
                model: model.clone(),
                question_id: question.id.clone(),
                result,
            };
            if tx.send(finished).await.is_err() {
                return;
            }
        }
    }
}

async fn aggregate(
    mut rx: mpsc::Receiver<WorkerMessage>,
    sink: &mut dyn EventSink,
    total: usize,
) -> std::result::Result<HashMap<String, OrderedMap<TestResult>>, SinkClosed> {
    let mut collected: HashMap<String, OrderedMap<TestResult>> = HashMap::new();
    let mut started = 0;
    let mut completed = 0;

    while let Some(message) = rx.recv().await {
        match message {
            WorkerMessage::Starting { model, question_id } => {
                started += 1;
                sink.emit(BenchmarkEvent::Testing {
                    model,
                    question_id,
                    started,
                    total,
                })
                .await?;
            }
            WorkerMessage::Finished {
                model,
                question_id,
                result,
            } => {
                completed += 1;
                collected
                    .entry(model.clone())
                    .or_default()
                    .insert(question_id.clone(), result.clone());
                sink.emit(BenchmarkEvent::Result {
                    model,
                    question_id,
                    result,
                })
                .await?;
                sink.emit(BenchmarkEvent::progress(completed, total)).await?;
            }
        }
    }

    Ok(collected)
}
