use serde::{Deserialize, Serialize};

use crate::{DocumentError, KeyedQuestion, Question, QuestionKey, QuestionType};

/// Version of the questionnaire document schema this crate understands.
pub const SCHEMA_VERSION: &str = "2025.07-1";

/// A titled group of questions inside a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSection {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub questions: Vec<Question>,
}

impl FormSection {
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            description: None,
            questions,
        }
    }
}

/// One page of the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormStep {
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub sections: Vec<FormSection>,
}

impl FormStep {
    pub fn new(title: impl Into<String>, sections: Vec<FormSection>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            sections,
        }
    }
}

/// The questionnaire document: all steps, sections and questions.
///
/// The document is presentation-agnostic; backends decide whether to render
/// it as a step-by-step wizard or as a printable review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub schema_version: String,
    pub steps: Vec<FormStep>,
}

impl Questionnaire {
    /// Create a document in the current schema version.
    pub fn new(steps: Vec<FormStep>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            steps,
        }
    }

    /// Parse a JSON document and check it with [`Questionnaire::check`].
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let questionnaire: Self = serde_json::from_str(json)?;
        questionnaire.check()?;
        Ok(questionnaire)
    }

    /// Check the structural rules serde cannot express.
    pub fn check(&self) -> Result<(), DocumentError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(DocumentError::SchemaVersion {
                expected: SCHEMA_VERSION,
                found: self.schema_version.clone(),
            });
        }
        if self.steps.is_empty() {
            return Err(DocumentError::NoSteps);
        }

        for keyed in self.questions() {
            let KeyedQuestion { key, question } = keyed;
            match question.kind {
                QuestionType::Select if question.options().is_empty() => {
                    return Err(DocumentError::MissingOptions(key));
                }
                QuestionType::Grid => {
                    if question.columns().is_empty() {
                        return Err(DocumentError::MissingColumns(key));
                    }
                    if question.grid_max_rows == Some(0) {
                        return Err(DocumentError::ZeroMaxRows(key));
                    }
                    for column in question.columns() {
                        if !column.kind.is_cell_type() {
                            return Err(DocumentError::ColumnType {
                                key,
                                column: column.label.clone(),
                                kind: column.kind,
                            });
                        }
                        if column.kind == QuestionType::Select && column.options().is_empty() {
                            return Err(DocumentError::MissingColumnOptions {
                                key,
                                column: column.label.clone(),
                            });
                        }
                    }
                }
                _ => {}
            }
            if let Some(parent) = question.depends_on
                && parent >= key.question()
            {
                return Err(DocumentError::ForwardDependency { key, parent });
            }
        }
        Ok(())
    }

    /// Get a step by index.
    pub fn step(&self, index: usize) -> Option<&FormStep> {
        self.steps.get(index)
    }

    /// Number of steps (the review page comes after the last one).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Look up a question by key.
    pub fn question(&self, key: &QuestionKey) -> Option<&Question> {
        self.steps
            .get(key.step())?
            .sections
            .get(key.section())?
            .questions
            .get(key.question())
    }

    /// Questions of one section, keyed, in order.
    pub fn section_questions(
        &self,
        step: usize,
        section: usize,
    ) -> impl Iterator<Item = KeyedQuestion<'_>> {
        self.steps
            .get(step)
            .and_then(|s| s.sections.get(section))
            .into_iter()
            .flat_map(move |s| {
                s.questions
                    .iter()
                    .enumerate()
                    .map(move |(q, question)| {
                        KeyedQuestion::new(QuestionKey::new(step, section, q), question)
                    })
            })
    }

    /// Questions of one step, keyed, in order.
    pub fn step_questions(&self, step: usize) -> impl Iterator<Item = KeyedQuestion<'_>> {
        let sections = self.steps.get(step).map_or(0, |s| s.sections.len());
        (0..sections).flat_map(move |section| self.section_questions(step, section))
    }

    /// All questions of the document, keyed, in order.
    pub fn questions(&self) -> impl Iterator<Item = KeyedQuestion<'_>> {
        (0..self.steps.len()).flat_map(move |step| self.step_questions(step))
    }
}

/// A questionnaire document together with its catalogue metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireData {
    pub slug: String,
    pub version: u32,
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    pub document: Questionnaire,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridColumn;

    fn sample() -> Questionnaire {
        Questionnaire::new(vec![
            FormStep::new(
                "Applicant",
                vec![FormSection::new(
                    "Contact",
                    vec![
                        Question::new("Name", QuestionType::Text).required(),
                        Question::new("Email", QuestionType::Text),
                    ],
                )],
            ),
            FormStep::new(
                "Animals",
                vec![
                    FormSection::new("Empty", vec![]),
                    FormSection::new(
                        "Species",
                        vec![Question::new("Animals used", QuestionType::Grid).with_columns(
                            vec![GridColumn::new("Species", QuestionType::Text)],
                        )],
                    ),
                ],
            ),
        ])
    }

    #[test]
    fn questions_in_document_order() {
        let keys: Vec<String> = sample().questions().map(|q| q.key.to_string()).collect();
        assert_eq!(keys, vec!["0.0-0", "0.0-1", "1.1-0"]);
    }

    #[test]
    fn lookup_by_key() {
        let q = sample();
        assert_eq!(
            q.question(&QuestionKey::new(1, 1, 0)).map(|q| q.label.as_str()),
            Some("Animals used")
        );
        assert!(q.question(&QuestionKey::new(5, 0, 0)).is_none());
    }

    #[test]
    fn check_accepts_sample() {
        assert!(sample().check().is_ok());
    }

    #[test]
    fn schema_version_mismatch() {
        let mut q = sample();
        q.schema_version = "2024.01-1".into();
        assert!(matches!(
            q.check(),
            Err(DocumentError::SchemaVersion { .. })
        ));
    }

    #[test]
    fn select_without_options() {
        let q = Questionnaire::new(vec![FormStep::new(
            "S",
            vec![FormSection::new(
                "A",
                vec![Question::new("Pick", QuestionType::Select)],
            )],
        )]);
        assert!(matches!(q.check(), Err(DocumentError::MissingOptions(_))));
    }

    #[test]
    fn grid_column_cannot_be_grid() {
        let q = Questionnaire::new(vec![FormStep::new(
            "S",
            vec![FormSection::new(
                "A",
                vec![Question::new("Table", QuestionType::Grid)
                    .with_columns(vec![GridColumn::new("Inner", QuestionType::Grid)])],
            )],
        )]);
        assert!(matches!(q.check(), Err(DocumentError::ColumnType { .. })));
    }

    #[test]
    fn dependency_must_point_backwards() {
        let q = Questionnaire::new(vec![FormStep::new(
            "S",
            vec![FormSection::new(
                "A",
                vec![
                    Question::new("First", QuestionType::Checkbox).depending_on(1),
                    Question::new("Second", QuestionType::Checkbox),
                ],
            )],
        )]);
        assert!(matches!(
            q.check(),
            Err(DocumentError::ForwardDependency { parent: 1, .. })
        ));
    }

    #[test]
    fn from_json_parses_and_checks() {
        let json = r#"{
            "schema_version": "2025.07-1",
            "steps": [{
                "title": "Project",
                "description": "About the project",
                "sections": [{
                    "title": "Overview",
                    "questions": [{ "label": "Title", "type": "text", "is_required": true }]
                }]
            }]
        }"#;
        let q = Questionnaire::from_json(json).unwrap();
        assert_eq!(q.len(), 1);
        assert!(Questionnaire::from_json(r#"{ "schema_version": "2025.07-1", "steps": [] }"#).is_err());
    }
}
