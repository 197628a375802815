// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for MedBench.
//!
//! This crate holds everything the benchmark engine needs that does not
//! touch the network or the filesystem:
//!
//! - [`types`] - Questions, per-test results and run records
//! - [`questions`] - The built-in question bank
//! - [`resolver`] - Model identifier to inference endpoint mapping
//! - [`client`] - The generation client seam implemented by adapters
//! - [`config`] - Layered application configuration
//! - [`error`] - Run-level errors

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod questions;
pub mod resolver;
pub mod types;

pub use client::{
    GenerationClient, GenerationError, GenerationOptions, GenerationRequest, GenerationResponse,
};
pub use error::{Error, Result};
pub use questions::{QuestionBank, Resolution};
pub use resolver::{EndpointResolver, EndpointRule, ModelMatcher, ResolveEndpoint};
pub use types::{
    BenchmarkQuestion, BenchmarkRun, Category, Difficulty, ModelRunSummary, OrderedMap,
    RunSummary, TestResult,
};
