//! Read-only summary of an application's answers, shown before submission.

use std::fmt;

use aec_form_types::{
    AnswerValue, Answers, FollowupMap, GridColumn, GridRow, KeyedQuestion, Primitive, QuestionKey,
    QuestionType, Questionnaire, VisibilityMap, parse_date, section_letter,
};

pub const UNANSWERED: &str = "(unanswered)";
pub const NOT_APPLICABLE: &str = "N/A";

/// How one answer is shown on the review page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAnswer {
    Text(String),
    Unanswered,

    /// The stored value does not fit the question type.
    NotApplicable,

    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl ReviewAnswer {
    /// Display form of an answer to `question`.
    pub fn for_question(question: &KeyedQuestion<'_>, value: Option<&AnswerValue>) -> Self {
        const NULL: &AnswerValue = &AnswerValue::Null;
        let value = value.unwrap_or(NULL);
        let kind = question.question.kind;
        match kind {
            QuestionType::Grid => match value.as_grid() {
                None => Self::NotApplicable,
                Some([]) => Self::Unanswered,
                Some(rows) => Self::table(question.question.columns(), rows),
            },
            _ => match value.as_primitive() {
                None => Self::NotApplicable,
                Some(p) => Self::scalar(kind, &p),
            },
        }
    }

    fn scalar(kind: QuestionType, value: &Primitive) -> Self {
        match kind {
            QuestionType::Checkbox => match value.as_bool() {
                Some(b) => Self::Text(yes_no(b).to_string()),
                None => Self::NotApplicable,
            },
            _ if value.is_empty() => Self::Unanswered,
            QuestionType::Date => Self::Text(format_date(value)),
            _ => Self::Text(value.to_string()),
        }
    }

    fn table(columns: &[GridColumn], rows: &[GridRow]) -> Self {
        let header = columns.iter().map(|c| c.label.clone()).collect();
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| format_cell(column.kind, row.get(&column.label)))
                    .collect()
            })
            .collect();
        Self::Table {
            columns: header,
            rows,
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "Yes" } else { "No" }
}

fn format_date(value: &Primitive) -> String {
    match value.as_str().and_then(parse_date) {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None => value.to_string(),
    }
}

fn format_cell(kind: QuestionType, value: &Primitive) -> String {
    match kind {
        QuestionType::Checkbox => value.as_bool().map_or(NOT_APPLICABLE, yes_no).to_string(),
        _ if value.is_empty() => UNANSWERED.to_string(),
        QuestionType::Date => format_date(value),
        _ => value.to_string(),
    }
}

impl fmt::Display for ReviewAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Unanswered => f.write_str(UNANSWERED),
            Self::NotApplicable => f.write_str(NOT_APPLICABLE),
            Self::Table { columns, rows } => write_table(f, columns, rows),
        }
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, columns: &[String], rows: &[Vec<String>]) -> fmt::Result {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, label)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(label.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        writeln!(f, "| {} |", line.join(" | "))
    };

    write_row(f, columns)?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(f, "|-{}-|", rule.join("-|-"))?;
    for row in rows {
        write_row(f, row)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    pub key: QuestionKey,
    pub label: String,
    pub answer: ReviewAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSection {
    /// Title with its letter prefix, e.g. `B) Species`.
    pub title: String,
    pub items: Vec<ReviewItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewStep {
    pub index: usize,
    pub title: String,
    pub sections: Vec<ReviewSection>,
}

/// Every visible answer grouped by step and section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPage {
    pub steps: Vec<ReviewStep>,

    /// Whether steps can still be reopened for editing.
    pub can_edit: bool,
}

impl ReviewPage {
    /// Build the review page. Hidden follow-ups are left out.
    pub fn build(
        questionnaire: &Questionnaire,
        followups: &FollowupMap,
        answers: &Answers,
        can_edit: bool,
    ) -> Self {
        let visibility = VisibilityMap::for_questionnaire(questionnaire, followups, answers);

        let steps = questionnaire
            .steps
            .iter()
            .enumerate()
            .map(|(step_index, step)| {
                let sections = step
                    .sections
                    .iter()
                    .enumerate()
                    .map(|(section_index, section)| ReviewSection {
                        title: format!("{} {}", section_letter(section_index), section.title),
                        items: questionnaire
                            .section_questions(step_index, section_index)
                            .filter(|q| visibility.is_visible(&q.key))
                            .map(|q| ReviewItem {
                                key: q.key,
                                label: q.label_text(),
                                answer: ReviewAnswer::for_question(&q, answers.get(&q.key)),
                            })
                            .collect(),
                    })
                    .collect();
                ReviewStep {
                    index: step_index,
                    title: step.title.clone(),
                    sections,
                }
            })
            .collect();

        Self { steps, can_edit }
    }

    /// Look up the displayed answer for a question.
    pub fn item(&self, key: &QuestionKey) -> Option<&ReviewItem> {
        self.steps
            .get(key.step())?
            .sections
            .get(key.section())?
            .items
            .iter()
            .find(|item| item.key == *key)
    }
}

impl fmt::Display for ReviewPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review your answers")?;
        for step in &self.steps {
            writeln!(f)?;
            writeln!(f, "== {}. {} ==", step.index + 1, step.title)?;
            for section in &step.sections {
                writeln!(f)?;
                writeln!(f, "{}", section.title)?;
                for item in &section.items {
                    match &item.answer {
                        ReviewAnswer::Table { .. } => {
                            writeln!(f, "  {}", item.label)?;
                            write!(f, "{}", item.answer)?;
                        }
                        answer => writeln!(f, "  {}: {answer}", item.label)?,
                    }
                }
            }
        }
        if !self.can_edit {
            writeln!(f)?;
            writeln!(f, "This application is read-only.")?;
        }
        Ok(())
    }
}
