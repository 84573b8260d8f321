//! Scripted backend for filling forms without user interaction.
//!
//! `ScriptedBackend` answers questions from a pre-defined script. It is
//! useful for testing sessions and questionnaires end to end.
//!
//! # Example
//!
//! ```rust,ignore
//! use aec_form::{FormSession, MemoryDraftStore, QuestionKey, ScriptedBackend};
//!
//! let backend = ScriptedBackend::new()
//!     .with_text(QuestionKey::new(0, 0, 0), "Quenda translocation")
//!     .with_bool(QuestionKey::new(0, 0, 1), true);
//!
//! session.run(&backend)?;
//! ```

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use aec_form_types::{
    AnswerValue, Answers, FormBackend, GridRow, Navigation, QuestionKey, StepContext,
};

/// A backend that fills steps from pre-configured answers.
///
/// Only visible questions are answered: a scripted answer to a follow-up
/// whose parent is falsy is never written.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    answers: HashMap<QuestionKey, AnswerValue>,
    back_at: RefCell<BTreeSet<usize>>,
}

/// Error type for ScriptedBackend.
#[derive(Debug, thiserror::Error)]
pub enum ScriptedBackendError {
    #[error("Validation failed for '{key}': {message}")]
    ValidationFailed { key: QuestionKey, message: String },

    #[error("Step {0} does not exist")]
    MissingStep(usize),
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an answer for a question.
    pub fn with_answer(mut self, key: QuestionKey, value: impl Into<AnswerValue>) -> Self {
        self.answers.insert(key, value.into());
        self
    }

    pub fn with_text(self, key: QuestionKey, value: impl Into<String>) -> Self {
        self.with_answer(key, AnswerValue::Text(value.into()))
    }

    pub fn with_bool(self, key: QuestionKey, value: bool) -> Self {
        self.with_answer(key, value)
    }

    pub fn with_number(self, key: QuestionKey, value: f64) -> Self {
        self.with_answer(key, AnswerValue::number(value))
    }

    pub fn with_grid(self, key: QuestionKey, rows: Vec<GridRow>) -> Self {
        self.with_answer(key, rows)
    }

    /// Go back (once) instead of continuing the first time `step` is filled.
    pub fn with_back_at(self, step: usize) -> Self {
        self.back_at.borrow_mut().insert(step);
        self
    }
}

impl FormBackend for ScriptedBackend {
    type Error = ScriptedBackendError;

    fn fill_step(
        &self,
        context: &StepContext<'_>,
        answers: &mut Answers,
    ) -> Result<Navigation, Self::Error> {
        // A script cannot correct itself, so a rejected step is final.
        if let Some((key, message)) = context.errors.first() {
            return Err(ScriptedBackendError::ValidationFailed {
                key: *key,
                message: message.to_string(),
            });
        }

        let step = context
            .form_step()
            .ok_or(ScriptedBackendError::MissingStep(context.step))?;

        for section in 0..step.sections.len() {
            for keyed in context.questionnaire.section_questions(context.step, section) {
                let visibility = context.section_visibility(section, answers);
                if !visibility.is_visible(&keyed.key) {
                    continue;
                }
                if let Some(value) = self.answers.get(&keyed.key) {
                    answers.insert(keyed.key, value.clone());
                }
            }
        }

        if !context.is_first() && self.back_at.borrow_mut().remove(&context.step) {
            return Ok(Navigation::Back);
        }
        Ok(Navigation::Continue)
    }
}
