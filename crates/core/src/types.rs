// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark data model.
//!
//! Questions are immutable catalog entries. A [`BenchmarkRun`] is built once
//! per run from the [`TestResult`]s of every (model, question) pair and is
//! the record that gets persisted and later rated by a reviewer.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Question category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// General medicine
    Medical,
    /// Osteopathic technique and theory
    Osteopathy,
    /// General knowledge control questions
    General,
    /// Programming control questions
    Coding,
    /// Logic and arithmetic control questions
    Reasoning,
}

impl Category {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medical => "medical",
            Self::Osteopathy => "osteopathy",
            Self::General => "general",
            Self::Coding => "coding",
            Self::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "medical" => Ok(Self::Medical),
            "osteopathy" => Ok(Self::Osteopathy),
            "general" => Ok(Self::General),
            "coding" => Ok(Self::Coding),
            "reasoning" => Ok(Self::Reasoning),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Question difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Easy
    Easy,
    /// Medium
    Medium,
    /// Hard
    Hard,
}

/// A single benchmark question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkQuestion {
    /// Unique question identifier.
    pub id: String,
    /// Prompt sent verbatim to the model.
    pub prompt: String,
    /// Category of the question.
    pub category: Category,
    /// Difficulty of the question.
    pub difficulty: Difficulty,
    /// Descriptive tag of the expected answer. Not validated.
    pub expected_type: String,
}

impl BenchmarkQuestion {
    /// Create a new question.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        category: Category,
        difficulty: Difficulty,
        expected_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            category,
            difficulty,
            expected_type: expected_type.into(),
        }
    }
}

/// Throughput estimate in tokens per second.
///
/// Defined as 0 when no time elapsed so the value is always finite.
pub fn tokens_per_second(tokens: u64, response_time_ms: u64) -> f64 {
    if response_time_ms == 0 {
        return 0.0;
    }
    tokens as f64 / (response_time_ms as f64 / 1000.0)
}

/// Outcome of one (model, question) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Whether the generation call succeeded.
    pub success: bool,
    /// Generated text, empty on failure.
    #[serde(default)]
    pub response: String,
    /// Wall-clock duration of the call.
    pub response_time_ms: u64,
    /// Provider-reported or estimated token count.
    pub tokens_generated: u64,
    /// Derived throughput.
    pub tokens_per_second: f64,
    /// Failure description, present iff `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Reviewer rating (1-5), attached after the run.
    #[serde(default)]
    pub user_rating: Option<u8>,
    /// Reviewer comment, attached after the run.
    #[serde(default)]
    pub user_comment: Option<String>,
}

impl TestResult {
    /// Build a successful result.
    pub fn success(response: impl Into<String>, response_time_ms: u64, tokens_generated: u64) -> Self {
        Self {
            success: true,
            response: response.into(),
            response_time_ms,
            tokens_generated,
            tokens_per_second: tokens_per_second(tokens_generated, response_time_ms),
            error: None,
            user_rating: None,
            user_comment: None,
        }
    }

    /// Build a failed result. Time is still recorded.
    pub fn failure(error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            success: false,
            response: String::new(),
            response_time_ms,
            tokens_generated: 0,
            tokens_per_second: 0.0,
            error: Some(error.into()),
            user_rating: None,
            user_comment: None,
        }
    }
}

/// Map keyed by string that keeps insertion order, including through JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedMap<V> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. An existing key keeps its position and the old value is returned.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a value mutably by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with string keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Per-model aggregate within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRunSummary {
    /// Results keyed by question id, in execution order.
    pub questions_results: OrderedMap<TestResult>,
    /// Sum over successful and failed tests.
    pub total_response_time_ms: u64,
    /// Mean over successful tests only, 0 when none succeeded.
    pub average_response_time_ms: f64,
    /// Mean over successful tests only, 0 when none succeeded.
    pub average_tokens_per_second: f64,
    /// Successful tests over attempted tests, as a percentage.
    pub success_rate_percent: f64,
}

impl ModelRunSummary {
    /// Aggregate the results of one model.
    ///
    /// Averages use the successful tests as denominator while the success
    /// rate uses every attempted test. Stored runs depend on this split, so
    /// it must not be unified with the all-tests average of [`RunSummary`].
    pub fn from_results(questions_results: OrderedMap<TestResult>) -> Self {
        let attempted = questions_results.len();
        let total_response_time_ms = questions_results
            .values()
            .map(|r| r.response_time_ms)
            .sum();

        let successful: Vec<&TestResult> = questions_results.values().filter(|r| r.success).collect();
        let (average_response_time_ms, average_tokens_per_second) = if successful.is_empty() {
            (0.0, 0.0)
        } else {
            let n = successful.len() as f64;
            (
                successful.iter().map(|r| r.response_time_ms as f64).sum::<f64>() / n,
                successful.iter().map(|r| r.tokens_per_second).sum::<f64>() / n,
            )
        };

        let success_rate_percent = if attempted == 0 {
            0.0
        } else {
            successful.len() as f64 / attempted as f64 * 100.0
        };

        Self {
            questions_results,
            total_response_time_ms,
            average_response_time_ms,
            average_tokens_per_second,
            success_rate_percent,
        }
    }
}

/// Global aggregate across every model of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tests attempted across the matrix.
    pub total_tests: usize,
    /// Tests that succeeded.
    pub successful_tests: usize,
    /// Tests that failed.
    pub failed_tests: usize,
    /// Mean response time over all tests, failures included.
    pub average_response_time_ms: f64,
    /// Wall-clock duration of the run.
    pub total_duration_ms: u64,
}

impl RunSummary {
    /// Aggregate across all model summaries.
    pub fn from_models(results: &OrderedMap<ModelRunSummary>, total_duration_ms: u64) -> Self {
        let all: Vec<&TestResult> = results
            .values()
            .flat_map(|m| m.questions_results.values())
            .collect();
        let total_tests = all.len();
        let successful_tests = all.iter().filter(|r| r.success).count();

        // Unlike the per-model figure this average includes failed tests.
        let average_response_time_ms = if total_tests == 0 {
            0.0
        } else {
            all.iter().map(|r| r.response_time_ms as f64).sum::<f64>() / total_tests as f64
        };

        Self {
            total_tests,
            successful_tests,
            failed_tests: total_tests - successful_tests,
            average_response_time_ms,
            total_duration_ms,
        }
    }
}

/// Top-level persisted record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Timestamp-derived unique identifier.
    pub id: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Number of models in the run.
    pub models_tested: usize,
    /// Number of resolved questions per model.
    pub questions_tested: usize,
    /// Per-model summaries, in caller model order.
    pub results: OrderedMap<ModelRunSummary>,
    /// Global aggregate.
    pub summary: RunSummary,
    /// Requested question ids that did not resolve against the bank.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_question_ids: Vec<String>,
}

impl BenchmarkRun {
    /// Look up the result of one (model, question) pair.
    pub fn result(&self, model: &str, question_id: &str) -> Option<&TestResult> {
        self.results
            .get(model)
            .and_then(|m| m.questions_results.get(question_id))
    }

    /// Mutable lookup of one (model, question) pair.
    pub fn result_mut(&mut self, model: &str, question_id: &str) -> Option<&mut TestResult> {
        self.results
            .get_mut(model)
            .and_then(|m| m.questions_results.get_mut(question_id))
    }
}
