use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate};

use crate::{
    AnswerValue, Answers, FollowupMap, GridRow, Primitive, Question, QuestionKey, QuestionType,
    Questionnaire, VisibilityMap,
};

pub const REQUIRED: &str = "This field is required.";
pub const AT_LEAST_ONE_RECORD: &str = "At least one record must be provided.";
pub const INVALID_OPTION: &str = "Please choose one of the listed options.";
pub const NOT_A_NUMBER: &str = "Please enter a number.";
pub const INVALID_DATE: &str = "Please enter a valid date.";
pub const NOT_A_TABLE: &str = "Expected a table of records.";
pub const NOT_A_SINGLE_VALUE: &str = "Expected a single value.";

/// Per-question validation messages, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<QuestionKey, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: QuestionKey, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    pub fn get(&self, key: &QuestionKey) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The first failing question, where the applicant should be taken.
    pub fn first(&self) -> Option<(&QuestionKey, &str)> {
        self.0.iter().next().map(|(k, m)| (k, m.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionKey, &str)> {
        self.0.iter().map(|(k, m)| (k, m.as_str()))
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, message) in &self.0 {
            writeln!(f, "{key}: {message}")?;
        }
        Ok(())
    }
}

/// Parse a date answer: `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

/// Validate a single answer against its question.
pub fn validate_question(question: &Question, value: Option<&AnswerValue>) -> Result<(), String> {
    const NULL: &AnswerValue = &AnswerValue::Null;
    let value = value.unwrap_or(NULL);

    match question.kind {
        QuestionType::Checkbox => {
            if question.is_required && value.as_bool() != Some(true) {
                return Err(REQUIRED.into());
            }
            Ok(())
        }
        QuestionType::Grid => {
            let rows: &[GridRow] = match value {
                AnswerValue::Grid(rows) => rows,
                AnswerValue::Null => &[],
                _ => return Err(NOT_A_TABLE.into()),
            };
            if question.is_required && rows.is_empty() {
                return Err(AT_LEAST_ONE_RECORD.into());
            }
            if let Some(max) = question.grid_max_rows
                && rows.len() > max
            {
                return Err(format!("No more than {max} records may be provided."));
            }
            for (index, row) in rows.iter().enumerate() {
                for column in question.columns() {
                    let cell = row.get(&column.label);
                    if cell.is_empty() {
                        continue;
                    }
                    check_scalar(column.kind, column.options(), cell)
                        .map_err(|msg| format!("Row {}, {}: {msg}", index + 1, column.label))?;
                }
            }
            Ok(())
        }
        kind => {
            let Some(primitive) = value.as_primitive() else {
                return Err(NOT_A_SINGLE_VALUE.into());
            };
            if primitive.is_empty() {
                return if question.is_required {
                    Err(REQUIRED.into())
                } else {
                    Ok(())
                };
            }
            check_scalar(kind, question.options(), &primitive).map_err(Into::into)
        }
    }
}

fn check_scalar(kind: QuestionType, options: &[String], value: &Primitive) -> Result<(), &'static str> {
    match kind {
        QuestionType::Number if value.as_f64().is_none() => Err(NOT_A_NUMBER),
        QuestionType::Select
            if !value
                .as_str()
                .is_some_and(|s| options.iter().any(|o| o == s)) =>
        {
            Err(INVALID_OPTION)
        }
        QuestionType::Date if value.as_str().and_then(parse_date).is_none() => Err(INVALID_DATE),
        _ => Ok(()),
    }
}

/// Validate the visible questions of one step.
///
/// Hidden follow-ups are never required, whatever they hold.
pub fn validate_step(
    questionnaire: &Questionnaire,
    step: usize,
    followups: &FollowupMap,
    answers: &Answers,
) -> ValidationErrors {
    let visibility = VisibilityMap::for_step(questionnaire, step, followups, answers);
    let mut errors = ValidationErrors::new();
    for keyed in questionnaire.step_questions(step) {
        if !visibility.is_visible(&keyed.key) {
            continue;
        }
        if let Err(message) = validate_question(keyed.question, answers.get(&keyed.key)) {
            errors.insert(keyed.key, message);
        }
    }
    errors
}

/// Validate every step.
pub fn validate_all(
    questionnaire: &Questionnaire,
    followups: &FollowupMap,
    answers: &Answers,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for step in 0..questionnaire.len() {
        errors.extend(validate_step(questionnaire, step, followups, answers));
    }
    errors
}
