//! Progress events emitted during a run.
//!
//! Events are serialized with a `type` discriminant so a streaming consumer
//! can dispatch on it directly.

use medbench_core::{BenchmarkRun, TestResult};
use serde::{Deserialize, Serialize};

/// One event of a run, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BenchmarkEvent {
    /// The run was accepted and is about to execute.
    Start {
        /// Run identifier
        run_id: String,
        /// Models in execution order
        models: Vec<String>,
        /// Resolved question ids in execution order
        question_ids: Vec<String>,
        /// Requested ids that were not found
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dropped_question_ids: Vec<String>,
        /// Number of tests in the matrix
        total: usize,
    },
    /// A test is about to be dispatched.
    Testing {
        /// Model under test
        model: String,
        /// Question being asked
        question_id: String,
        /// Number of tests dispatched so far, this one included
        started: usize,
        /// Number of tests in the matrix
        total: usize,
    },
    /// A test finished, successfully or not.
    Result {
        /// Model under test
        model: String,
        /// Question asked
        question_id: String,
        /// Outcome
        result: TestResult,
    },
    /// Matrix progress after a finished test.
    Progress {
        /// Finished tests
        completed: usize,
        /// Number of tests in the matrix
        total: usize,
        /// Rounded completion percentage
        percentage: u32,
    },
    /// The run finished and was assembled.
    Complete {
        /// The final run record
        run: Box<BenchmarkRun>,
    },
    /// The run was aborted by a run-level fault.
    Error {
        /// Human-readable description
        message: String,
    },
}

impl BenchmarkEvent {
    /// Progress event for `completed` out of `total`.
    pub fn progress(completed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            100
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u32
        };
        BenchmarkEvent::Progress {
            completed,
            total,
            percentage,
        }
    }

    /// The `type` discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Testing { .. } => "testing",
            Self::Result { .. } => "result",
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}
