// Copyright 2025 MedBench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Built-in benchmark question bank.
//!
//! The catalog is created once per process and never mutated. Runs only
//! reference questions by id.

use crate::types::{BenchmarkQuestion, Category, Difficulty};
use once_cell::sync::Lazy;
use std::collections::HashSet;

static BUILTIN: Lazy<Vec<BenchmarkQuestion>> = Lazy::new(|| {
    use Category::*;
    use Difficulty::*;

    vec![
        BenchmarkQuestion::new(
            "osteo_principles",
            "List and briefly explain the four core principles of osteopathic medicine.",
            Osteopathy,
            Easy,
            "structured list",
        ),
        BenchmarkQuestion::new(
            "osteo_lumbar_dysfunction",
            "A 42-year-old office worker presents with acute low back pain after lifting a box. \
             Describe the osteopathic structural examination you would perform and the somatic \
             dysfunctions you would look for.",
            Osteopathy,
            Medium,
            "clinical reasoning",
        ),
        BenchmarkQuestion::new(
            "osteo_contraindications_hvla",
            "What are the absolute and relative contraindications to high-velocity low-amplitude \
             (HVLA) thrust techniques of the cervical spine?",
            Osteopathy,
            Hard,
            "safety list",
        ),
        BenchmarkQuestion::new(
            "osteo_cranial",
            "Explain the primary respiratory mechanism as described in osteopathy in the cranial \
             field and summarise the current state of evidence for it.",
            Osteopathy,
            Hard,
            "critical explanation",
        ),
        BenchmarkQuestion::new(
            "med_red_flags_back_pain",
            "Which red flags in a patient with low back pain require urgent referral rather than \
             manual therapy?",
            Medical,
            Medium,
            "safety list",
        ),
        BenchmarkQuestion::new(
            "med_anatomy_sciatic",
            "Describe the course of the sciatic nerve from its origin to its terminal branches.",
            Medical,
            Medium,
            "anatomical description",
        ),
        BenchmarkQuestion::new(
            "med_physiology_baroreflex",
            "Explain how the baroreceptor reflex responds to a sudden drop in blood pressure.",
            Medical,
            Easy,
            "mechanism explanation",
        ),
        BenchmarkQuestion::new(
            "med_differential_chest_pain",
            "Give a differential diagnosis for left-sided chest pain that worsens on deep \
             inspiration in a 30-year-old, ordered from most to least urgent.",
            Medical,
            Hard,
            "ranked differential",
        ),
        BenchmarkQuestion::new(
            "general_capital",
            "What is the capital of Australia? Answer in one word.",
            General,
            Easy,
            "single word",
        ),
        BenchmarkQuestion::new(
            "general_summary",
            "Summarise in three sentences why sleep matters for tissue recovery.",
            General,
            Easy,
            "short summary",
        ),
        BenchmarkQuestion::new(
            "coding_fizzbuzz",
            "Write a Python function that prints the numbers 1 to 100, replacing multiples of 3 \
             with Fizz, multiples of 5 with Buzz and multiples of both with FizzBuzz.",
            Coding,
            Easy,
            "code",
        ),
        BenchmarkQuestion::new(
            "reasoning_dosage",
            "A patient weighs 70 kg and a drug is dosed at 15 mg/kg per day split into three \
             equal doses. How many milligrams is each dose? Show your reasoning.",
            Reasoning,
            Medium,
            "numeric answer with steps",
        ),
    ]
});

/// Outcome of resolving requested question ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Resolved questions, in caller order, without duplicates.
    pub questions: Vec<BenchmarkQuestion>,
    /// Requested ids with no matching question.
    pub dropped: Vec<String>,
}

/// Immutable catalog of benchmark questions.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<BenchmarkQuestion>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuestionBank {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self {
            questions: BUILTIN.clone(),
        }
    }

    /// A bank over custom questions. Later duplicates of an id are ignored.
    pub fn new(questions: Vec<BenchmarkQuestion>) -> Self {
        let mut seen = HashSet::new();
        let questions = questions
            .into_iter()
            .filter(|q| seen.insert(q.id.clone()))
            .collect();
        Self { questions }
    }

    /// Look up a question by id.
    pub fn get(&self, id: &str) -> Option<&BenchmarkQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// All questions in catalog order.
    pub fn all(&self) -> &[BenchmarkQuestion] {
        &self.questions
    }

    /// All question ids in catalog order.
    pub fn ids(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    /// Questions of one category.
    pub fn by_category(&self, category: Category) -> Vec<&BenchmarkQuestion> {
        self.questions
            .iter()
            .filter(|q| q.category == category)
            .collect()
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Resolve requested ids against the bank.
    ///
    /// Unknown ids are not an error; they are reported in
    /// [`Resolution::dropped`] so the caller can surface them.
    pub fn resolve<S: AsRef<str>>(&self, ids: &[S]) -> Resolution {
        let mut seen = HashSet::new();
        let mut questions = Vec::new();
        let mut dropped = Vec::new();

        for id in ids {
            let id = id.as_ref().trim();
            if !seen.insert(id.to_string()) {
                continue;
            }
            match self.get(id) {
                Some(q) => questions.push(q.clone()),
                None => dropped.push(id.to_string()),
            }
        }

        Resolution { questions, dropped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ids_unique_and_prompts_non_empty() {
        let bank = QuestionBank::builtin();
        let ids: HashSet<_> = bank.all().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), bank.len());
        assert!(bank.all().iter().all(|q| !q.prompt.trim().is_empty()));
    }

    #[test]
    fn test_repeated_lookup_is_identical() {
        let bank = QuestionBank::builtin();
        let first = bank.get("osteo_principles").cloned();
        let second = bank.get("osteo_principles").cloned();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(QuestionBank::builtin().get("osteo_principles").cloned(), first);
    }

    #[test]
    fn test_resolve_keeps_order_and_drops_unknown() {
        let bank = QuestionBank::builtin();
        let resolution = bank.resolve(&["general_capital", "nope", "osteo_principles", "general_capital"]);
        let ids: Vec<_> = resolution.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["general_capital", "osteo_principles"]);
        assert_eq!(resolution.dropped, vec!["nope".to_string()]);
    }

    #[test]
    fn test_by_category() {
        let bank = QuestionBank::builtin();
        let osteo = bank.by_category(Category::Osteopathy);
        assert!(!osteo.is_empty());
        assert!(osteo.iter().all(|q| q.category == Category::Osteopathy));
    }

    #[test]
    fn test_custom_bank_ignores_duplicate_ids() {
        let bank = QuestionBank::new(vec![
            BenchmarkQuestion::new("q1", "first", Category::General, Difficulty::Easy, "text"),
            BenchmarkQuestion::new("q1", "second", Category::General, Difficulty::Easy, "text"),
        ]);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.get("q1").map(|q| q.prompt.as_str()), Some("first"));
    }
}
