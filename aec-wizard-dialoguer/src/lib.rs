//! # aec-wizard-dialoguer
//!
//! Dialoguer wizard backend for aec-form.
//!
//! This crate provides a command-line wizard for filling application forms
//! using the `dialoguer` library. Each step is presented question by
//! question; follow-up questions appear as soon as the question they depend
//! on is answered.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aec_form::{FormSession, MemoryDraftStore};
//! use aec_wizard_dialoguer::DialoguerBackend;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let questionnaire = aec_questionnaires::animal_ethics()?;
//!     let table = aec_questionnaires::animal_ethics_followups()?;
//!     let mut session =
//!         FormSession::new(questionnaire, "offline", &table, MemoryDraftStore::new());
//!     session.run(&DialoguerBackend::new())?;
//!     println!("{}", session.review());
//!     Ok(())
//! }
//! ```

mod backend;

pub use backend::{DEFAULT_UPLOAD_LIMIT, DialoguerBackend, DialoguerError};
