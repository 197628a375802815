// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bench API entry point.

use anyhow::Context;
use bench_api::{app, AppState};
use medbench_adapters::OllamaClient;
use medbench_benchmarks::JsonFileStore;
use medbench_core::config::AppConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::load(None).context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let store = Arc::new(
        JsonFileStore::open(&config.storage.results_dir)
            .context("failed to open results directory")?,
    );
    let client = Arc::new(OllamaClient::new()?);
    let addr = config.bind_address();

    info!(
        address = %addr,
        results_dir = %config.storage.results_dir.display(),
        strategy = ?config.benchmark.strategy,
        "Starting Bench API"
    );

    let state = AppState::new(config, client.clone(), client, store).with_metrics(metrics);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Bench API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
