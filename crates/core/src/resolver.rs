// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Model endpoint resolution.
//!
//! Maps a model identifier to the base URL of the inference service that
//! hosts it. The rule table is plain configuration: an ordered list of
//! matchers, a default endpoint and per-model overrides.
//!
//! # Example
//!
//! ```
//! use medbench_core::resolver::{EndpointResolver, ResolveEndpoint};
//!
//! let resolver = EndpointResolver::default();
//! assert_eq!(resolver.resolve("meditron:7b"), "http://localhost:11435");
//! assert_eq!(resolver.resolve("llama3:8b"), "http://localhost:11434");
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default endpoint for general models.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Endpoint hosting medical-family models.
pub const MEDICAL_ENDPOINT: &str = "http://localhost:11435";

/// Endpoint hosting translator-family models.
pub const TRANSLATOR_ENDPOINT: &str = "http://localhost:11436";

/// Anything that can map a model identifier to an endpoint.
pub trait ResolveEndpoint: Send + Sync {
    /// Return the base URL for `model`. Never fails.
    fn resolve(&self, model: &str) -> String;

    /// Like [`resolve`](Self::resolve), but an entry in `overrides` wins.
    fn resolve_with(&self, model: &str, overrides: &HashMap<String, String>) -> String {
        override_or(overrides, model, || self.resolve(model))
    }
}

fn override_or(
    overrides: &HashMap<String, String>,
    model: &str,
    fallback: impl FnOnce() -> String,
) -> String {
    overrides.get(model).cloned().unwrap_or_else(fallback)
}

/// How a rule matches a model identifier. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum ModelMatcher {
    /// Identifier contains the pattern.
    Contains(String),
    /// Identifier starts with the pattern.
    Prefix(String),
}

impl ModelMatcher {
    /// Whether the matcher accepts `model`.
    pub fn matches(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        match self {
            Self::Contains(p) => model.contains(&p.to_lowercase()),
            Self::Prefix(p) => model.starts_with(&p.to_lowercase()),
        }
    }
}

/// One entry of the rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRule {
    /// Matcher applied to the model identifier.
    pub matcher: ModelMatcher,
    /// Endpoint used when the matcher accepts.
    pub endpoint: String,
}

impl EndpointRule {
    /// Rule matching identifiers that contain `pattern`.
    pub fn contains(pattern: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            matcher: ModelMatcher::Contains(pattern.into()),
            endpoint: endpoint.into(),
        }
    }

    /// Rule matching identifiers that start with `pattern`.
    pub fn prefix(pattern: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            matcher: ModelMatcher::Prefix(pattern.into()),
            endpoint: endpoint.into(),
        }
    }
}

/// The medical, translator and general buckets.
pub fn default_rules() -> Vec<EndpointRule> {
    let mut rules = Vec::new();
    for pattern in ["meditron", "medllama", "medical", "biomistral"] {
        rules.push(EndpointRule::contains(pattern, MEDICAL_ENDPOINT));
    }
    for pattern in ["translator", "nllb", "madlad"] {
        rules.push(EndpointRule::contains(pattern, TRANSLATOR_ENDPOINT));
    }
    rules
}

/// Rule-table resolver.
///
/// Resolution order is explicit override, then first matching rule, then
/// the default endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointResolver {
    /// Ordered rules; the first match wins.
    #[serde(default = "default_rules")]
    pub rules: Vec<EndpointRule>,
    /// Fallback endpoint.
    #[serde(default = "default_endpoint")]
    pub default_endpoint: String,
    /// Per-model URL overrides.
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            default_endpoint: default_endpoint(),
            overrides: HashMap::new(),
        }
    }
}

impl EndpointResolver {
    /// Create a resolver from a rule table and default endpoint.
    pub fn new(rules: Vec<EndpointRule>, default_endpoint: impl Into<String>) -> Self {
        Self {
            rules,
            default_endpoint: default_endpoint.into(),
            overrides: HashMap::new(),
        }
    }

    /// First matching rule, else the default endpoint. Overrides are ignored.
    pub fn match_rules(&self, model: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(model))
            .map(|rule| rule.endpoint.clone())
            .unwrap_or_else(|| self.default_endpoint.clone())
    }

    /// Every distinct endpoint this resolver can return.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![self.default_endpoint.clone()];
        for endpoint in self
            .rules
            .iter()
            .map(|r| &r.endpoint)
            .chain(self.overrides.values())
        {
            if !endpoints.contains(endpoint) {
                endpoints.push(endpoint.clone());
            }
        }
        endpoints
    }
}

impl ResolveEndpoint for EndpointResolver {
    fn resolve(&self, model: &str) -> String {
        override_or(&self.overrides, model, || self.match_rules(model))
    }
}
