use crate::{QuestionKey, QuestionType, ValidationErrors};

/// Error type for loading and checking questionnaire documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Malformed questionnaire document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema version mismatch: expected {expected}, got {found}")]
    SchemaVersion {
        expected: &'static str,
        found: String,
    },

    #[error("Questionnaire has no steps")]
    NoSteps,

    #[error("Select question {0} has no options")]
    MissingOptions(QuestionKey),

    #[error("Grid question {0} has no columns")]
    MissingColumns(QuestionKey),

    #[error("Grid question {0} allows zero rows")]
    ZeroMaxRows(QuestionKey),

    #[error("Grid question {key}: column '{column}' cannot be of type {kind}")]
    ColumnType {
        key: QuestionKey,
        column: String,
        kind: QuestionType,
    },

    #[error("Grid question {key}: select column '{column}' has no options")]
    MissingColumnOptions { key: QuestionKey, column: String },

    #[error("Question {key} depends on question {parent}, which does not come before it")]
    ForwardDependency { key: QuestionKey, parent: usize },
}

/// Error type for form operations.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// User cancelled the form (Ctrl+C, Escape, etc.)
    #[error("Form cancelled by user")]
    Cancelled,

    /// The answers do not pass validation.
    #[error("{} answer(s) need attention", .0.len())]
    Validation(ValidationErrors),

    /// Submission is only possible from the review page.
    #[error("The review page must be open to submit")]
    NotOnReview,

    /// The applicant has not confirmed the answers are accurate.
    #[error("Please confirm the information provided is accurate and complete")]
    NotConfirmed,

    /// The application is no longer editable.
    #[error("Application is read-only in its current status")]
    ReadOnly,

    /// Step index outside the questionnaire.
    #[error("Step {0} does not exist")]
    NoSuchStep(usize),

    /// Key that does not address a question of the questionnaire.
    #[error("Question {0} does not exist")]
    NoSuchQuestion(QuestionKey),

    /// Backend-specific failure (I/O, terminal, HTTP, draft storage, ...)
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl FormError {
    /// Create a backend error from any error type.
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }

    /// Check if this error represents user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
