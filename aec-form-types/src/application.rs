use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Answers, SCHEMA_VERSION};

/// Lifecycle of an application on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[serde(alias = "NEW")]
    Draft,
    Discarded,
    Submitted,
    UnderReview,
    ActionRequired,
    Processing,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// No further transitions happen from these.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Discarded | Self::Approved | Self::Rejected)
    }

    /// Whether the applicant may still change answers.
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::ActionRequired)
    }
}

/// The answer document stored with an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDocument {
    pub answers: Answers,
    pub schema_version: String,
}

impl FormDocument {
    pub fn new(answers: Answers) -> Self {
        Self {
            answers,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

impl Default for FormDocument {
    fn default() -> Self {
        Self::new(Answers::new())
    }
}

/// An application as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub key: String,
    pub owner: String,
    pub questionnaire_slug: String,
    pub questionnaire_name: String,
    pub questionnaire_version: u32,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub document: FormDocument,
}

/// A file uploaded for a `file` question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub key: String,
    pub application_key: String,
    pub name: String,

    /// Key of the question the file answers.
    pub question: String,

    #[serde(default)]
    pub file: Option<String>,

    #[serde(default)]
    pub size: Option<u64>,

    pub created_at: DateTime<Utc>,
}
