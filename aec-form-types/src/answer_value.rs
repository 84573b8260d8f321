use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A single scalar answer: the value of a basic question or of one grid cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    /// Cleared or never answered.
    #[default]
    Null,

    /// From checkbox questions.
    Bool(bool),

    /// From number questions once parsed.
    Number(Number),

    /// From text, textarea, select, date and file questions.
    Text(String),
}

impl Primitive {
    /// Build a number, mapping non-finite floats to `Null`.
    pub fn number(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }

    /// Truthiness as the visibility rules understand it.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// `Null` or a blank string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view: numbers directly, strings if they parse.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Number(_) => "Number",
            Self::Text(_) => "Text",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One row of a grid answer, keyed by column label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridRow(BTreeMap<String, Primitive>);

impl GridRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style cell setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Primitive>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Primitive>) {
        self.0.insert(column.into(), value.into());
    }

    /// Missing cells read as `Null`.
    pub fn get(&self, column: &str) -> &Primitive {
        const NULL: &Primitive = &Primitive::Null;
        self.0.get(column).unwrap_or(NULL)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Primitive)> {
        self.0.iter()
    }
}

/// An answer stored in the form state.
///
/// Basic questions hold a primitive; grid questions hold an ordered list of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Grid(Vec<GridRow>),
}

impl AnswerValue {
    /// Build a number, mapping non-finite floats to `Null`.
    pub fn number(value: f64) -> Self {
        Primitive::number(value).into()
    }

    /// Truthiness used to decide whether follow-ups of this answer are shown.
    ///
    /// `null`, `false`, `0` and `""` are falsy. A grid is judged by its rows:
    /// a grid with no records is falsy, so follow-ups of a table question stay
    /// hidden until a record is added. Presence alone is not enough; unlike
    /// loose truthiness, an empty list is falsy here.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Grid(rows) => !rows.is_empty(),
            other => other.as_primitive().is_some_and(|p| p.is_truthy()),
        }
    }

    /// Whether the answer counts as unanswered for required checks and review.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Grid(rows) => rows.is_empty(),
            other => other.as_primitive().is_none_or(|p| p.is_empty()),
        }
    }

    /// The scalar view of this answer, `None` for grids.
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Null => Some(Primitive::Null),
            Self::Bool(b) => Some(Primitive::Bool(*b)),
            Self::Number(n) => Some(Primitive::Number(n.clone())),
            Self::Text(s) => Some(Primitive::Text(s.clone())),
            Self::Grid(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_grid(&self) -> Option<&[GridRow]> {
        match self {
            Self::Grid(rows) => Some(rows),
            _ => None,
        }
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Number(_) => "Number",
            Self::Text(_) => "Text",
            Self::Grid(_) => "Grid",
        }
    }
}

impl From<Primitive> for AnswerValue {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::Null => Self::Null,
            Primitive::Bool(b) => Self::Bool(b),
            Primitive::Number(n) => Self::Number(n),
            Primitive::Text(s) => Self::Text(s),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($target:ident),*) => {$(
        impl From<String> for $target {
            fn from(s: String) -> Self {
                Self::Text(s)
            }
        }

        impl From<&str> for $target {
            fn from(s: &str) -> Self {
                Self::Text(s.to_string())
            }
        }

        impl From<bool> for $target {
            fn from(b: bool) -> Self {
                Self::Bool(b)
            }
        }

        impl From<i64> for $target {
            fn from(i: i64) -> Self {
                Self::Number(Number::from(i))
            }
        }

        impl From<i32> for $target {
            fn from(i: i32) -> Self {
                Self::Number(Number::from(i))
            }
        }

        impl From<f64> for $target {
            fn from(f: f64) -> Self {
                Self::number(f)
            }
        }
    )*};
}

impl_from_scalar!(Primitive, AnswerValue);

impl From<Vec<GridRow>> for AnswerValue {
    fn from(rows: Vec<GridRow>) -> Self {
        Self::Grid(rows)
    }
}
