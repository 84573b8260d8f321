use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AnswerValue, GridRow, QuestionKey};

/// Error type for typed answer access.
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("Missing answer for question {0}")]
    MissingKey(QuestionKey),

    #[error("Type mismatch at question {key}: expected {expected}, got {actual}")]
    TypeMismatch {
        key: QuestionKey,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Answers of a single step, keyed by the local `section-question` key.
pub type StepAnswers = BTreeMap<String, AnswerValue>;

/// All answers of an application form.
///
/// Stored per step, then by local key, which is also the shape of the
/// answer document exchanged with the server:
///
/// ```json
/// { "0": { "0-0": "Dr Jane Doe", "0-1": true }, "1": { "2-0": [] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers {
    steps: BTreeMap<usize, StepAnswers>,
}

impl Answers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an answer for the given question.
    pub fn insert(&mut self, key: QuestionKey, value: impl Into<AnswerValue>) {
        self.steps
            .entry(key.step())
            .or_default()
            .insert(key.local(), value.into());
    }

    /// Builder-style insert, handy when assembling fixtures.
    pub fn with(mut self, key: QuestionKey, value: impl Into<AnswerValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &QuestionKey) -> Option<&AnswerValue> {
        self.steps.get(&key.step())?.get(&key.local())
    }

    pub fn contains(&self, key: &QuestionKey) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &QuestionKey) -> Option<AnswerValue> {
        let step = self.steps.get_mut(&key.step())?;
        let removed = step.remove(&key.local());
        if step.is_empty() {
            self.steps.remove(&key.step());
        }
        removed
    }

    /// Answers of one step, if any were given.
    pub fn step(&self, step: usize) -> Option<&StepAnswers> {
        self.steps.get(&step)
    }

    /// Iterate over all answers in document order.
    ///
    /// Entries whose local key is malformed (e.g. hand-edited drafts) are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionKey, &AnswerValue)> {
        self.steps.iter().flat_map(|(step, answers)| {
            answers.iter().filter_map(move |(local, value)| {
                QuestionKey::from_local(*step, local)
                    .ok()
                    .map(|key| (key, value))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.steps.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `other` into this collection; answers in `other` win.
    pub fn merge(&mut self, other: Answers) {
        for (step, answers) in other.steps {
            self.steps.entry(step).or_default().extend(answers);
        }
    }

    /// Check if the answer at `key` is present and not empty.
    pub fn has_value(&self, key: &QuestionKey) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    // === Convenience accessors ===

    pub fn get_text(&self, key: &QuestionKey) -> Result<&str, AnswerError> {
        match self.get(key) {
            Some(AnswerValue::Text(s)) => Ok(s),
            Some(other) => Err(AnswerError::TypeMismatch {
                key: *key,
                expected: "Text",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::MissingKey(*key)),
        }
    }

    pub fn get_bool(&self, key: &QuestionKey) -> Result<bool, AnswerError> {
        match self.get(key) {
            Some(AnswerValue::Bool(b)) => Ok(*b),
            Some(other) => Err(AnswerError::TypeMismatch {
                key: *key,
                expected: "Bool",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::MissingKey(*key)),
        }
    }

    pub fn get_grid(&self, key: &QuestionKey) -> Result<&[GridRow], AnswerError> {
        match self.get(key) {
            Some(AnswerValue::Grid(rows)) => Ok(rows),
            Some(other) => Err(AnswerError::TypeMismatch {
                key: *key,
                expected: "Grid",
                actual: other.type_name(),
            }),
            None => Err(AnswerError::MissingKey(*key)),
        }
    }
}
