// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered application configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults (an empty configuration is fully usable)
//! 2. Optional TOML file, `medbench.toml` or the path in `MEDBENCH_CONFIG`
//! 3. Environment variables such as `MEDBENCH__SERVER__PORT=9000`
//!
//! # Example
//!
//! ```toml
//! [endpoints]
//! default_endpoint = "http://gpu-box:11434"
//!
//! [[endpoints.rules]]
//! endpoint = "http://gpu-box:11435"
//! matcher = { kind = "contains", pattern = "meditron" }
//!
//! [benchmark]
//! strategy = "per_endpoint"
//! ```

use crate::client::GenerationOptions;
use crate::error::{Error, Result};
use crate::resolver::EndpointResolver;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "medbench.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "MEDBENCH_CONFIG";

/// Generation parameters and time budget for one calling context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionProfile {
    /// Sampling options applied to every question
    #[serde(default)]
    pub options: GenerationOptions,
    /// Hard timeout per test, in milliseconds
    pub timeout_ms: u64,
}

impl ExecutionProfile {
    /// Profile for batch runs (60 s per test).
    pub fn batch() -> Self {
        Self {
            options: GenerationOptions::default(),
            timeout_ms: 60_000,
        }
    }

    /// Profile for streaming runs (30 s per test).
    pub fn streaming() -> Self {
        Self {
            options: GenerationOptions::default(),
            timeout_ms: 30_000,
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Per-test timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How the (model, question) matrix is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One worker for the whole matrix.
    #[default]
    Sequential,
    /// One worker per distinct resolved endpoint.
    PerEndpoint,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Benchmark execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Scheduling strategy
    pub strategy: ExecutionStrategy,
    /// Profile used by batch runs
    pub batch: ExecutionProfile,
    /// Profile used by streaming runs
    pub streaming: ExecutionProfile,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::default(),
            batch: ExecutionProfile::batch(),
            streaming: ExecutionProfile::streaming(),
        }
    }
}

/// Result storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON file per run
    pub results_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("data/benchmarks"),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server
    pub server: ServerConfig,
    /// Endpoint rule table
    pub endpoints: EndpointResolver,
    /// Benchmark execution
    pub benchmark: BenchmarkConfig,
    /// Result storage
    pub storage: StorageConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// `path` wins over `MEDBENCH_CONFIG`, which wins over `medbench.toml`.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        debug!(path = %path.display(), "Loading configuration");

        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("MEDBENCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every benchmark fail.
    pub fn validate(&self) -> Result<()> {
        for (name, profile) in [
            ("batch", &self.benchmark.batch),
            ("streaming", &self.benchmark.streaming),
        ] {
            if profile.timeout_ms == 0 {
                return Err(Error::Config(format!(
                    "benchmark.{}.timeout_ms must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
