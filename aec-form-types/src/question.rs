use std::fmt;

use serde::{Deserialize, Serialize};

use crate::QuestionKey;

/// The kind of input a question collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Single-line text input.
    Text,

    /// Multi-line text input.
    Textarea,

    /// Numeric input.
    Number,

    /// Yes/no tick box.
    Checkbox,

    /// Pick one of `select_options`.
    Select,

    /// Calendar date, stored as an ISO 8601 string.
    Date,

    /// Table of rows, one column per `grid_columns` entry.
    Grid,

    /// File upload, stored as the attachment name.
    File,
}

impl QuestionType {
    /// Types allowed as grid columns.
    pub fn is_cell_type(&self) -> bool {
        !matches!(self, Self::Grid | Self::File)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Date => "date",
            Self::Grid => "grid",
            Self::File => "file",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column of a grid question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    /// Column header; also the key of the cell in each answer row.
    pub label: String,

    #[serde(rename = "type")]
    pub kind: QuestionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<String>>,
}

impl GridColumn {
    pub fn new(label: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            label: label.into(),
            kind,
            description: None,
            select_options: None,
        }
    }

    pub fn options(&self) -> &[String] {
        self.select_options.as_deref().unwrap_or_default()
    }
}

/// A single question of a questionnaire section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// The prompt shown to the applicant.
    pub label: String,

    #[serde(rename = "type")]
    pub kind: QuestionType,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_options: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<Vec<GridColumn>>,

    /// Maximum number of rows for grid questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_max_rows: Option<usize>,

    /// Index, within the same section, of the question controlling this one.
    ///
    /// The question is only shown while that question is shown and answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<usize>,
}

impl Question {
    /// Create an optional question of the given type.
    pub fn new(label: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            label: label.into(),
            kind,
            is_required: false,
            description: None,
            select_options: None,
            grid_columns: None,
            grid_max_rows: None,
            depends_on: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_columns(mut self, columns: Vec<GridColumn>) -> Self {
        self.grid_columns = Some(columns);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.grid_max_rows = Some(max_rows);
        self
    }

    pub fn depending_on(mut self, index: usize) -> Self {
        self.depends_on = Some(index);
        self
    }

    pub fn options(&self) -> &[String] {
        self.select_options.as_deref().unwrap_or_default()
    }

    pub fn columns(&self) -> &[GridColumn] {
        self.grid_columns.as_deref().unwrap_or_default()
    }
}

/// A question together with its position in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyedQuestion<'a> {
    pub key: QuestionKey,
    pub question: &'a Question,
}

impl<'a> KeyedQuestion<'a> {
    pub fn new(key: QuestionKey, question: &'a Question) -> Self {
        Self { key, question }
    }

    /// Label prefixed with its 1-based number, with `*` for required questions.
    pub fn label_text(&self) -> String {
        let formatted = format!("{}. {}", self.key.question() + 1, self.question.label);
        if self.question.is_required {
            format!("{formatted} *")
        } else {
            formatted
        }
    }
}

/// Section heading prefix: `A)`, `B)`, ... `Z)`, then `AA)`, `AB)`, ...
pub fn section_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect::<String>() + ")"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_text_marks_required() {
        let q = Question::new("Project title", QuestionType::Text).required();
        let keyed = KeyedQuestion::new(QuestionKey::new(0, 0, 2), &q);
        assert_eq!(keyed.label_text(), "3. Project title *");

        let q = Question::new("Notes", QuestionType::Textarea);
        let keyed = KeyedQuestion::new(QuestionKey::new(0, 0, 0), &q);
        assert_eq!(keyed.label_text(), "1. Notes");
    }

    #[test]
    fn section_letters() {
        assert_eq!(section_letter(0), "A)");
        assert_eq!(section_letter(2), "C)");
        assert_eq!(section_letter(25), "Z)");
        assert_eq!(section_letter(26), "AA)");
    }

    #[test]
    fn deserialize_minimal_question() {
        let q: Question =
            serde_json::from_str(r#"{ "label": "Species", "type": "select", "select_options": ["Mouse", "Rat"] }"#)
                .unwrap();
        assert_eq!(q.kind, QuestionType::Select);
        assert!(!q.is_required);
        assert_eq!(q.options(), ["Mouse", "Rat"]);
        assert!(q.columns().is_empty());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<Question, _> =
            serde_json::from_str(r#"{ "label": "Signature", "type": "signature" }"#);
        assert!(result.is_err());
    }
}
