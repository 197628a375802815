// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! API error responses.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use medbench_benchmarks::StoreError;
use medbench_core::{Error, GenerationError};
use serde_json::json;
use tracing::error;

/// Error rendered as `{"error": {"code", "message"}, "meta": {"timestamp"}}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "Request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            },
            "meta": {
                "timestamp": Utc::now().to_rfc3339(),
            }
        }));
        (self.status, body).into_response()
    }
}

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("INVALID_BODY", rejection.body_text())
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(message) => Self::bad_request("INVALID_INPUT", message),
            Error::Cancelled => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "CANCELLED",
                "Benchmark run was cancelled",
            ),
            Error::Storage(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", message)
            }
            Error::Config(message) => Self::internal(message),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) | StoreError::ResultNotFound { .. } => {
                Self::not_found(err.to_string())
            }
            StoreError::InvalidRating(_) => Self::bad_request("INVALID_RATING", err.to_string()),
            StoreError::InvalidId(_) => Self::bad_request("INVALID_ID", err.to_string()),
            StoreError::Io(_) | StoreError::Serialization(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", err.to_string())
            }
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let status = match err {
            GenerationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };
        let code = match err.kind() {
            "timeout" => "UPSTREAM_TIMEOUT",
            "connection_refused" => "UPSTREAM_UNREACHABLE",
            "http_status" => "UPSTREAM_HTTP_ERROR",
            "malformed_response" => "UPSTREAM_MALFORMED_RESPONSE",
            _ => "UPSTREAM_ERROR",
        };
        Self::new(status, code, err.to_string())
    }
}
