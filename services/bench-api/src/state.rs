// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared application state.

use medbench_adapters::HealthProbe;
use medbench_benchmarks::{BenchmarkOrchestrator, ResultStore};
use medbench_core::config::AppConfig;
use medbench_core::{EndpointResolver, GenerationClient, QuestionBank};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// State shared by every handler.
pub struct AppState {
    pub config: AppConfig,
    pub questions: Arc<QuestionBank>,
    pub resolver: Arc<EndpointResolver>,
    pub client: Arc<dyn GenerationClient>,
    pub probe: Arc<dyn HealthProbe>,
    pub store: Arc<dyn ResultStore>,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        client: Arc<dyn GenerationClient>,
        probe: Arc<dyn HealthProbe>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            resolver: Arc::new(config.endpoints.clone()),
            questions: Arc::new(QuestionBank::builtin()),
            config,
            client,
            probe,
            store,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Orchestrator persisting into the shared store.
    pub fn orchestrator(&self) -> BenchmarkOrchestrator {
        BenchmarkOrchestrator::new(
            self.client.clone(),
            self.resolver.clone(),
            self.questions.clone(),
        )
        .with_store(self.store.clone())
        .with_strategy(self.config.benchmark.strategy)
    }
}
