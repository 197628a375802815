// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Upstream inference service integrations.
//!
//! - **Ollama**: `/api/generate` and `/api/tags` over HTTP
//!
//! # Example
//!
//! ```ignore
//! use medbench_adapters::upstream::prelude::*;
//!
//! let client = OllamaClient::new()?;
//! let health = client.health("http://localhost:11434").await;
//! ```

pub mod ollama;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::ollama::{EndpointHealth, HealthProbe, OllamaAdapterError, OllamaClient};
}

pub use ollama::OllamaClient;
