// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run-level error type shared across the workspace.

use thiserror::Error;

/// Errors that abort a benchmark run or an operation around it.
///
/// Per-test failures are never represented here: they are captured into
/// [`crate::types::TestResult`] so the run can continue.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller input was rejected before any network activity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The event consumer went away and the run was abandoned.
    #[error("Run cancelled: event consumer closed")]
    Cancelled,

    /// Persisting or loading a run failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Whether this error was raised by input validation.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias using the workspace error.
pub type Result<T> = std::result::Result<T, Error>;
