//! Core types for the aec-form crate.
//!
//! This crate provides the foundational types for application forms:
//! - `Questionnaire` - The steps, sections and questions of a form
//! - `QuestionKey`, `AnswerValue` and `Answers` - Collected data and its keys
//! - `FollowupMap` and `VisibilityMap` - Which follow-up questions are shown
//! - `validate_step` - Required and type checks over visible questions
//! - `FormBackend` trait - For implementing ways to fill a form

mod question_key;
pub use question_key::{KeyParseError, QuestionKey};

mod answer_value;
pub use answer_value::{AnswerValue, GridRow, Primitive};

mod answers;
pub use answers::{AnswerError, Answers, StepAnswers};

mod question;
pub use question::{GridColumn, KeyedQuestion, Question, QuestionType, section_letter};

mod questionnaire;
pub use questionnaire::{FormSection, FormStep, Questionnaire, QuestionnaireData, SCHEMA_VERSION};

mod followup;
pub use followup::{FollowupMap, WalkbackTable};

mod visibility;
pub use visibility::VisibilityMap;

pub mod validation;
pub use validation::{ValidationErrors, parse_date, validate_all, validate_question, validate_step};

mod application;
pub use application::{ApplicationData, ApplicationStatus, Attachment, FormDocument};

mod error;
pub use error::{DocumentError, FormError};

mod traits;
pub use traits::{FormBackend, Navigation, StepContext};
