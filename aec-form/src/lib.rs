//! # aec-form
//!
//! Multi-step application forms for the Animal Ethics Committee.
//!
//! A questionnaire is a list of steps, each a list of titled sections of
//! questions. Some questions are follow-ups: they are only shown (and only
//! required) while an earlier question in the same section has a truthy
//! answer.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aec_form::{ClientConfig, FileDraftStore, FormSession, HttpApi};
//!
//! let config = ClientConfig::load_default()?.with_env_overrides();
//! let api = HttpApi::new(&config)?;
//! let application = api.get_application("a1b2")?;
//! let questionnaire = api.get_questionnaire(
//!     &application.questionnaire_slug,
//!     Some(application.questionnaire_version),
//! )?;
//!
//! let mut session = FormSession::open(&application, questionnaire, &table, drafts)?;
//! session.run(&backend)?;
//! println!("{}", session.review());
//! session.submit(&api, true)?;
//! ```
//!
//! ## Backends
//!
//! Backends are separate crates that implement `FormBackend`:
//! - `aec-wizard-dialoguer` - CLI prompts via dialoguer

// Re-export all types from aec-form-types
pub use aec_form_types::*;

mod api;
pub use api::{ApiError, ApplicationApi, AttachmentUpload, HttpApi, error_message};

mod config;
pub use config::{
    ClientConfig, ConfigError, DEFAULT_API_BASE, DEFAULT_CSRF_HEADER, DEFAULT_UPLOAD_MAX_SIZE,
    default_config_path, project_dirs,
};

mod draft_store;
pub use draft_store::{DraftError, DraftStore, FileDraftStore, MemoryDraftStore, draft_file_name};

mod review;
pub use review::{
    NOT_APPLICABLE, ReviewAnswer, ReviewItem, ReviewPage, ReviewSection, ReviewStep, UNANSWERED,
};

mod session;
pub use session::{ActivePage, FormSession};

// Scripted backend for filling forms without user interaction
mod test_backend;
pub use test_backend::{ScriptedBackend, ScriptedBackendError};
