//! Dialoguer backend implementation for the FormBackend trait.

use std::path::Path;

use aec_form::{
    AnswerValue, Answers, FormBackend, GridColumn, GridRow, KeyedQuestion, Navigation, Primitive,
    QuestionType, StepContext, parse_date, section_letter, validate_question,
    validation::{INVALID_DATE, NOT_A_NUMBER},
};
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Confirm, Editor, Input, Select};
use thiserror::Error;

pub const DEFAULT_UPLOAD_LIMIT: u64 = 10 * 1024 * 1024;

/// Error type for the Dialoguer backend.
#[derive(Debug, Error)]
pub enum DialoguerError {
    /// User cancelled the form (e.g., pressed Ctrl+C or Escape).
    #[error("Form cancelled by user")]
    Cancelled,

    /// An I/O error occurred during prompting.
    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
}

/// Helper to check if a dialoguer error is a cancellation (Ctrl+C / Escape)
fn is_cancelled(err: &dialoguer::Error) -> bool {
    matches!(err, dialoguer::Error::IO(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted)
}

fn prompted<T>(result: dialoguer::Result<T>) -> Result<T, DialoguerError> {
    result.map_err(|e| {
        if is_cancelled(&e) {
            DialoguerError::Cancelled
        } else {
            DialoguerError::Dialoguer(e)
        }
    })
}

/// Dialoguer backend for interactive CLI prompts.
///
/// Steps are presented one question at a time. Visibility is recomputed
/// after every answer, so a follow-up is asked right after the question
/// that opens it.
#[derive(Debug, Clone)]
pub struct DialoguerBackend {
    /// Use colorful theme for prompts.
    colorful: bool,

    /// Largest file accepted for `file` questions, in bytes.
    upload_limit: u64,
}

impl Default for DialoguerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DialoguerBackend {
    /// Create a new Dialoguer backend with default (colorful) theme.
    pub fn new() -> Self {
        Self {
            colorful: true,
            upload_limit: DEFAULT_UPLOAD_LIMIT,
        }
    }

    /// Create a backend with plain (no color) theme.
    pub fn plain() -> Self {
        Self {
            colorful: false,
            ..Self::new()
        }
    }

    pub fn with_upload_limit(mut self, bytes: u64) -> Self {
        self.upload_limit = bytes;
        self
    }

    fn theme(&self) -> Box<dyn Theme> {
        if self.colorful {
            Box::new(ColorfulTheme::default())
        } else {
            Box::new(SimpleTheme)
        }
    }

    /// Ask one question until its answer passes validation.
    fn ask_question(
        &self,
        keyed: &KeyedQuestion<'_>,
        current: Option<&AnswerValue>,
        previous_error: Option<&str>,
    ) -> Result<AnswerValue, DialoguerError> {
        let question = keyed.question;
        let prompt = keyed.label_text();
        if let Some(description) = &question.description {
            println!("  {description}");
        }
        if let Some(msg) = previous_error {
            println!("Error: {msg}");
        }

        loop {
            let value = match question.kind {
                QuestionType::Grid => self.ask_grid(
                    &prompt,
                    question.columns(),
                    question.grid_max_rows,
                    current,
                )?,
                QuestionType::Textarea => self.ask_multiline(&prompt, current)?,
                QuestionType::File => self.ask_file(&prompt, current)?,
                kind => {
                    let current = current.and_then(AnswerValue::as_primitive);
                    self.ask_scalar(&prompt, kind, question.options(), current.as_ref())?
                        .into()
                }
            };

            match validate_question(question, Some(&value)) {
                Ok(()) => return Ok(value),
                Err(msg) => println!("Error: {msg}"),
            }
        }
    }

    /// Ask a basic question or a grid cell.
    fn ask_scalar(
        &self,
        prompt: &str,
        kind: QuestionType,
        options: &[String],
        current: Option<&Primitive>,
    ) -> Result<Primitive, DialoguerError> {
        match kind {
            QuestionType::Checkbox => self.ask_confirm(prompt, current.and_then(Primitive::as_bool)),
            QuestionType::Select => self.ask_select(prompt, options, current),
            QuestionType::Number => self.ask_number(prompt, current),
            QuestionType::Date => self.ask_date(prompt, current),
            _ => self.ask_text(prompt, current),
        }
    }

    fn input(&self, prompt: &str, current: Option<&Primitive>) -> Result<String, DialoguerError> {
        let theme = self.theme();
        let mut builder = Input::<String>::with_theme(theme.as_ref())
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(current) = current.filter(|c| !c.is_empty()) {
            builder = builder.with_initial_text(current.to_string());
        }
        prompted(builder.interact_text())
    }

    fn ask_text(&self, prompt: &str, current: Option<&Primitive>) -> Result<Primitive, DialoguerError> {
        let value = self.input(prompt, current)?;
        Ok(text_or_null(value))
    }

    fn ask_number(
        &self,
        prompt: &str,
        current: Option<&Primitive>,
    ) -> Result<Primitive, DialoguerError> {
        loop {
            match parse_number(&self.input(prompt, current)?) {
                Ok(value) => return Ok(value),
                Err(msg) => println!("Error: {msg}"),
            }
        }
    }

    fn ask_date(&self, prompt: &str, current: Option<&Primitive>) -> Result<Primitive, DialoguerError> {
        let prompt = format!("{prompt} (YYYY-MM-DD)");
        loop {
            match normalize_date(&self.input(&prompt, current)?) {
                Ok(value) => return Ok(value),
                Err(msg) => println!("Error: {msg}"),
            }
        }
    }

    fn ask_confirm(&self, prompt: &str, current: Option<bool>) -> Result<Primitive, DialoguerError> {
        let theme = self.theme();
        let answer = prompted(
            Confirm::with_theme(theme.as_ref())
                .with_prompt(prompt)
                .default(current.unwrap_or(false))
                .interact(),
        )?;
        Ok(Primitive::Bool(answer))
    }

    fn ask_select(
        &self,
        prompt: &str,
        options: &[String],
        current: Option<&Primitive>,
    ) -> Result<Primitive, DialoguerError> {
        let theme = self.theme();
        let default = current
            .and_then(Primitive::as_str)
            .and_then(|c| options.iter().position(|o| o == c))
            .unwrap_or(0);
        let index = prompted(
            Select::with_theme(theme.as_ref())
                .with_prompt(prompt)
                .items(options)
                .default(default)
                .interact(),
        )?;
        Ok(options
            .get(index)
            .map_or(Primitive::Null, |o| Primitive::Text(o.clone())))
    }

    fn ask_multiline(
        &self,
        prompt: &str,
        current: Option<&AnswerValue>,
    ) -> Result<AnswerValue, DialoguerError> {
        println!("{prompt}");
        let existing = current.and_then(AnswerValue::as_str).unwrap_or("");
        match prompted(Editor::new().edit(existing))? {
            Some(text) => Ok(text_or_null(text.trim_end().to_string()).into()),
            // Editor closed without saving: keep what was there.
            None => Ok(current.cloned().unwrap_or_default()),
        }
    }

    fn ask_file(
        &self,
        prompt: &str,
        current: Option<&AnswerValue>,
    ) -> Result<AnswerValue, DialoguerError> {
        let prompt = format!("{prompt} (path to file)");
        let current = current.and_then(AnswerValue::as_primitive);
        loop {
            let path = self.input(&prompt, current.as_ref())?;
            if path.trim().is_empty() {
                return Ok(AnswerValue::Null);
            }
            match check_file(Path::new(path.trim()), self.upload_limit) {
                Ok(()) => return Ok(AnswerValue::Text(path.trim().to_string())),
                Err(msg) => println!("Error: {msg}"),
            }
        }
    }

    fn ask_grid(
        &self,
        prompt: &str,
        columns: &[GridColumn],
        max_rows: Option<usize>,
        current: Option<&AnswerValue>,
    ) -> Result<AnswerValue, DialoguerError> {
        let theme = self.theme();
        println!("{prompt}");

        let mut rows: Vec<GridRow> = current
            .and_then(AnswerValue::as_grid)
            .map(<[GridRow]>::to_vec)
            .unwrap_or_default();
        if !rows.is_empty() {
            let keep = prompted(
                Confirm::with_theme(theme.as_ref())
                    .with_prompt(format!("Keep the {} existing record(s)?", rows.len()))
                    .default(true)
                    .interact(),
            )?;
            if !keep {
                rows.clear();
            }
        }

        while max_rows.is_none_or(|max| rows.len() < max) {
            let add = prompted(
                Confirm::with_theme(theme.as_ref())
                    .with_prompt(format!("Add record {}?", rows.len() + 1))
                    .default(rows.is_empty())
                    .interact(),
            )?;
            if !add {
                break;
            }

            let mut row = GridRow::new();
            for column in columns {
                let cell_prompt = format!("  [{}] {}", rows.len() + 1, column.label);
                let cell = self.ask_scalar(&cell_prompt, column.kind, column.options(), None)?;
                row.set(column.label.clone(), cell);
            }
            rows.push(row);
        }

        Ok(AnswerValue::Grid(rows))
    }

    fn ask_navigation(&self, context: &StepContext<'_>) -> Result<Navigation, DialoguerError> {
        let theme = self.theme();
        let items = navigation_items(context);
        let index = prompted(
            Select::with_theme(theme.as_ref())
                .with_prompt("What next?")
                .items(&items.iter().map(|(label, _)| *label).collect::<Vec<_>>())
                .default(0)
                .interact(),
        )?;
        Ok(items.get(index).map_or(Navigation::Continue, |(_, nav)| *nav))
    }
}

impl FormBackend for DialoguerBackend {
    type Error = DialoguerError;

    fn fill_step(
        &self,
        context: &StepContext<'_>,
        answers: &mut Answers,
    ) -> Result<Navigation, Self::Error> {
        let Some(step) = context.form_step() else {
            return Ok(Navigation::Continue);
        };

        println!();
        println!(
            "Step {} of {}: {}",
            context.step + 1,
            context.questionnaire.len(),
            step.title
        );
        if !step.description.is_empty() {
            println!("{}", step.description);
        }
        if !context.errors.is_empty() {
            println!("Please correct {} answer(s) before continuing.", context.errors.len());
        }

        for (section_index, section) in step.sections.iter().enumerate() {
            println!();
            println!("{} {}", section_letter(section_index), section.title);
            if let Some(description) = &section.description {
                println!("{description}");
            }

            for keyed in context.questionnaire.section_questions(context.step, section_index) {
                // Earlier answers in this section decide whether this one is shown.
                if !context
                    .section_visibility(section_index, answers)
                    .is_visible(&keyed.key)
                {
                    continue;
                }
                let value = self.ask_question(
                    &keyed,
                    answers.get(&keyed.key),
                    context.errors.get(&keyed.key),
                )?;
                answers.insert(keyed.key, value);
            }
        }

        self.ask_navigation(context)
    }
}

/// Choices offered at the end of a step.
fn navigation_items(context: &StepContext<'_>) -> Vec<(&'static str, Navigation)> {
    let forward = if context.is_last() {
        "Continue to review"
    } else {
        "Continue"
    };
    let mut items = vec![(forward, Navigation::Continue)];
    if !context.is_first() {
        items.push(("Back", Navigation::Back));
    }
    items
}

fn text_or_null(value: String) -> Primitive {
    if value.trim().is_empty() {
        Primitive::Null
    } else {
        Primitive::Text(value)
    }
}

fn parse_number(input: &str) -> Result<Primitive, &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Primitive::Null);
    }
    input
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Primitive::number)
        .ok_or(NOT_A_NUMBER)
}

/// Dates are stored as `YYYY-MM-DD` whatever accepted form was typed.
fn normalize_date(input: &str) -> Result<Primitive, &'static str> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Primitive::Null);
    }
    parse_date(input)
        .map(|date| Primitive::Text(date.format("%Y-%m-%d").to_string()))
        .ok_or(INVALID_DATE)
}

fn check_file(path: &Path, limit: u64) -> Result<(), String> {
    let metadata = std::fs::metadata(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    if !metadata.is_file() {
        return Err(format!("{} is not a file.", path.display()));
    }
    if metadata.len() > limit {
        return Err(format!(
            "File is too large ({} bytes); the limit is {} bytes.",
            metadata.len(),
            limit
        ));
    }
    Ok(())
}
