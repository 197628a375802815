// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Generation client seam.
//!
//! The executor talks to inference services only through
//! [`GenerationClient`]; the HTTP implementation lives in the adapters crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure classes of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The call exceeded its time budget.
    #[error("Request timed out after {}", format_budget(.0))]
    Timeout(Duration),

    /// The endpoint could not be reached.
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The body could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Anything else.
    #[error("Unknown error: {0}")]
    Other(String),
}

/// `30s` for whole seconds, `1500ms` otherwise.
fn format_budget(budget: &Duration) -> String {
    if budget.subsec_millis() == 0 {
        format!("{}s", budget.as_secs())
    } else {
        format!("{}ms", budget.as_millis())
    }
}

impl GenerationError {
    /// Short machine-readable class name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::ConnectionRefused(_) => "connection_refused",
            Self::HttpStatus { .. } => "http_status",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Other(_) => "unknown",
        }
    }
}

/// Sampling options sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling threshold
    pub top_p: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 500,
        }
    }
}

/// Wire body of a non-streaming generate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// Always false for benchmark calls.
    pub stream: bool,
    /// Sampling options
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Build a non-streaming request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options,
        }
    }
}

/// Decoded provider response. Only `response` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text
    pub response: String,
    /// Tokens generated, when reported
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Total duration in nanoseconds, when reported
    #[serde(default)]
    pub total_duration: Option<u64>,
    /// Generation duration in nanoseconds, when reported
    #[serde(default)]
    pub eval_duration: Option<u64>,
}

impl GenerationResponse {
    /// Response with text only.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Self::default()
        }
    }
}

/// Client able to run one generation call against an endpoint.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Issue one non-streaming generation request to `endpoint`.
    async fn generate(
        &self,
        endpoint: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req = GenerationRequest::new("meditron:7b", "hello", GenerationOptions::default());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "meditron:7b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["max_tokens"], 500);
        assert!(json["options"]["top_p"].is_number());
    }

    #[test]
    fn test_response_requires_only_text() {
        let resp: GenerationResponse = serde_json::from_str(r#"{"response":"hi","done":true}"#).unwrap();
        assert_eq!(resp.response, "hi");
        assert_eq!(resp.eval_count, None);
    }

    #[test]
    fn test_error_messages_name_the_failure_class() {
        assert_eq!(
            GenerationError::Timeout(Duration::from_secs(30)).to_string(),
            "Request timed out after 30s"
        );
        assert_eq!(
            GenerationError::Timeout(Duration::from_millis(1500)).to_string(),
            "Request timed out after 1500ms"
        );
        assert_eq!(
            GenerationError::HttpStatus { status: 404, body: "model not found".into() }.to_string(),
            "HTTP 404: model not found"
        );
        assert!(GenerationError::ConnectionRefused("x".into())
            .to_string()
            .starts_with("Connection refused"));
    }
}
