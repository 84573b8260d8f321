use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a string is not a valid question key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid question key '{0}': expected 'step.section-question'")]
pub struct KeyParseError(pub String);

/// The position of a question inside a questionnaire, e.g. `"0.1-2"`.
///
/// Keys are composed of the step index, the section index within that step
/// and the question index within that section. They are unique across the
/// whole questionnaire and order the same way the questions appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionKey {
    step: usize,
    section: usize,
    question: usize,
}

impl QuestionKey {
    /// Create a key from its three indices.
    pub fn new(step: usize, section: usize, question: usize) -> Self {
        Self {
            step,
            section,
            question,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn question(&self) -> usize {
        self.question
    }

    /// The key used inside a per-step answer map, e.g. `"1-2"`.
    pub fn local(&self) -> String {
        format!("{}-{}", self.section, self.question)
    }

    /// Parse a local key (`"section-question"`) belonging to `step`.
    pub fn from_local(step: usize, local: &str) -> Result<Self, KeyParseError> {
        let (section, question) = local
            .split_once('-')
            .ok_or_else(|| KeyParseError(local.to_string()))?;
        let section = section
            .parse()
            .map_err(|_| KeyParseError(local.to_string()))?;
        let question = question
            .parse()
            .map_err(|_| KeyParseError(local.to_string()))?;
        Ok(Self::new(step, section, question))
    }

    /// Key of another question in the same section.
    pub fn sibling(&self, question: usize) -> Self {
        Self::new(self.step, self.section, question)
    }

    /// Check if both keys live in the same section of the same step.
    pub fn same_section(&self, other: &QuestionKey) -> bool {
        self.step == other.step && self.section == other.section
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}-{}", self.step, self.section, self.question)
    }
}

impl FromStr for QuestionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (step, local) = s.split_once('.').ok_or_else(|| KeyParseError(s.to_string()))?;
        let step = step.parse().map_err(|_| KeyParseError(s.to_string()))?;
        Self::from_local(step, local).map_err(|_| KeyParseError(s.to_string()))
    }
}

impl Serialize for QuestionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuestionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
