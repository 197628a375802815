// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Inference service adapters for MedBench.
//!
//! The benchmark engine only knows the
//! [`GenerationClient`](medbench_core::GenerationClient) trait; this crate
//! provides the HTTP implementations behind it.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod upstream;

pub use upstream::ollama::{EndpointHealth, HealthProbe, OllamaAdapterError, OllamaClient};
