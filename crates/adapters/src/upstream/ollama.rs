// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ollama-compatible inference adapter.
//!
//! Implements [`GenerationClient`] over HTTP against the Ollama API:
//!
//! - `POST {endpoint}/api/generate` for non-streaming generation
//! - `GET {endpoint}/api/tags` for health probes and installed models
//!
//! # Example
//!
//! ```ignore
//! use medbench_adapters::upstream::ollama::OllamaClient;
//! use medbench_core::{GenerationClient, GenerationOptions, GenerationRequest};
//!
//! let client = OllamaClient::new()?;
//! let request = GenerationRequest::new("meditron:7b", "Define sciatica.", GenerationOptions::default());
//! let response = client.generate("http://localhost:11435", &request).await?;
//! println!("{}", response.response);
//! ```

use async_trait::async_trait;
use medbench_core::{GenerationClient, GenerationError, GenerationRequest, GenerationResponse};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Default transport-level request timeout.
///
/// The executor applies its own, tighter per-test budget on top of this.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout used by health probes.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors that can occur while building the adapter.
#[derive(Debug, Error)]
pub enum OllamaAdapterError {
    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Result type for adapter construction.
pub type Result<T> = std::result::Result<T, OllamaAdapterError>;

/// Health of one inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointHealth {
    /// Endpoint base URL
    pub endpoint: String,
    /// Whether the endpoint answered the probe
    pub reachable: bool,
    /// Installed model names
    pub models: Vec<String>,
    /// Probe round-trip time
    pub latency_ms: u64,
    /// Probe failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// HTTP adapter for Ollama-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl OllamaClient {
    /// Create a client with default timeouts.
    pub fn new() -> Result<Self> {
        Self::with_timeouts(DEFAULT_REQUEST_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| OllamaAdapterError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout,
            health_timeout: HEALTH_TIMEOUT,
        })
    }

    /// Use a different budget for health probes.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// URL of the generate call for an endpoint.
    pub fn generate_url(endpoint: &str) -> String {
        format!("{}/api/generate", endpoint.trim_end_matches('/'))
    }

    /// URL of the model listing for an endpoint.
    pub fn tags_url(endpoint: &str) -> String {
        format!("{}/api/tags", endpoint.trim_end_matches('/'))
    }

    /// List installed models on an endpoint.
    pub async fn list_models(&self, endpoint: &str) -> std::result::Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(Self::tags_url(endpoint))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.health_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Probe an endpoint. Never fails; unreachable endpoints are reported as such.
    pub async fn health(&self, endpoint: &str) -> EndpointHealth {
        let start = Instant::now();
        let outcome = self.list_models(endpoint).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(models) => EndpointHealth {
                endpoint: endpoint.to_string(),
                reachable: true,
                models,
                latency_ms,
                error: None,
            },
            Err(e) => EndpointHealth {
                endpoint: endpoint.to_string(),
                reachable: false,
                models: Vec::new(),
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Classify a transport failure; `budget` is the timeout that applied to the call.
fn map_transport_error(err: reqwest::Error, budget: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(budget)
    } else if err.is_connect() {
        GenerationError::ConnectionRefused(err.to_string())
    } else if err.is_decode() {
        GenerationError::MalformedResponse(err.to_string())
    } else {
        GenerationError::Other(err.to_string())
    }
}

/// Reachability probe for inference endpoints.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe one endpoint. Never fails.
    async fn probe(&self, endpoint: &str) -> EndpointHealth;
}

#[async_trait]
impl HealthProbe for OllamaClient {
    async fn probe(&self, endpoint: &str) -> EndpointHealth {
        self.health(endpoint).await
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(
        &self,
        endpoint: &str,
        request: &GenerationRequest,
    ) -> std::result::Result<GenerationResponse, GenerationError> {
        let url = Self::generate_url(endpoint);
        debug!(url = %url, model = %request.model, "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_transport_error(e, self.request_timeout))?;

        serde_json::from_slice::<GenerationResponse>(&bytes)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }
}
