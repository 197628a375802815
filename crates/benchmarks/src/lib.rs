//! Benchmark execution for MedBench.
//!
//! This crate runs questions from the bank against language models and
//! collects timing, throughput and success statistics.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use medbench_benchmarks::{BenchmarkOrchestrator, NullSink, RunRequest};
//! use medbench_core::config::ExecutionProfile;
//! use medbench_core::{EndpointResolver, GenerationClient, QuestionBank};
//!
//! # async fn demo(client: Arc<dyn GenerationClient>) -> medbench_core::Result<()> {
//! let orchestrator = BenchmarkOrchestrator::new(
//!     client,
//!     Arc::new(EndpointResolver::default()),
//!     Arc::new(QuestionBank::builtin()),
//! );
//!
//! let request = RunRequest::new(["meditron:7b"], ["osteo_principles", "med_red_flags_back_pain"]);
//! let run = orchestrator
//!     .run(&request, ExecutionProfile::batch(), &mut NullSink)
//!     .await?;
//! println!("{}/{} tests passed", run.summary.successful_tests, run.summary.total_tests);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`executor`] - Runs a single (model, question) test
//! - [`orchestrator`] - Runs the full matrix and aggregates statistics
//! - [`event`] - Progress events emitted during a run
//! - [`sink`] - Destinations for those events
//! - [`io`] - Result persistence and output files
//! - [`markdown`] - Markdown report generation

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod event;
pub mod executor;
pub mod io;
pub mod markdown;
pub mod orchestrator;
pub mod sink;

pub use event::BenchmarkEvent;
pub use executor::TestExecutor;
pub use io::{JsonFileStore, OutputFormat, ResultStore, StoreError};
pub use orchestrator::{generate_run_id, BenchmarkOrchestrator, RunPlan, RunRequest};
pub use sink::{ChannelSink, CollectingSink, EventSink, NullSink, SinkClosed};
