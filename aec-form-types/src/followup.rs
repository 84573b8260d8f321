//! Follow-up relations between questions.
//!
//! A follow-up question is only shown while its controlling (parent) question
//! is shown and answered. Parents are found either through a walk-back table
//! (`child key -> number of positions to look back in the same section`) or
//! through the `depends_on` index declared on the question itself.
//!
//! Both sources can only point to an earlier question in the same section,
//! so the relation is acyclic by construction. Entries that would break that
//! rule are dropped with a warning instead of failing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Question, QuestionKey, Questionnaire};

/// Static table of walk-back offsets, keyed by follow-up question.
///
/// Serialises as a JSON object, e.g. `{ "0.1-3": 1, "0.1-4": 2 }`.
/// Offsets are signed so that malformed (negative) entries still load and are
/// then ignored like any other out-of-range offset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalkbackTable(BTreeMap<QuestionKey, i64>);

impl WalkbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: QuestionKey, offset: i64) -> Self {
        self.insert(key, offset);
        self
    }

    pub fn insert(&mut self, key: QuestionKey, offset: i64) {
        self.0.insert(key, offset);
    }

    pub fn get(&self, key: &QuestionKey) -> Option<i64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QuestionKey, i64)> for WalkbackTable {
    fn from_iter<T: IntoIterator<Item = (QuestionKey, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Map of follow-up question key to the key of its controlling question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowupMap {
    parents: BTreeMap<QuestionKey, QuestionKey>,
}

impl FollowupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map for one section from a walk-back table.
    ///
    /// Only questions with an offset of at least one that stays inside the
    /// section get a parent.
    pub fn from_walkback(
        questions: &[Question],
        step: usize,
        section: usize,
        table: &WalkbackTable,
    ) -> Self {
        let mut map = Self::new();
        for index in 0..questions.len() {
            let key = QuestionKey::new(step, section, index);
            let Some(offset) = table.get(&key) else {
                continue;
            };
            match usize::try_from(offset) {
                Ok(offset) if offset >= 1 && offset <= index => {
                    map.parents.insert(key, key.sibling(index - offset));
                }
                _ => warn!(%key, offset, "ignoring out-of-range walk-back offset"),
            }
        }

        if !map.is_empty() {
            debug!(step, section, parents = ?map.parents, "computed follow-up map");
        }
        map
    }

    /// Build the map for one section from the questions' `depends_on` fields.
    pub fn from_declared(questions: &[Question], step: usize, section: usize) -> Self {
        let mut map = Self::new();
        for (index, question) in questions.iter().enumerate() {
            let Some(parent) = question.depends_on else {
                continue;
            };
            let key = QuestionKey::new(step, section, index);
            if parent < index {
                map.parents.insert(key, key.sibling(parent));
            } else {
                warn!(%key, parent, "ignoring dependency on a later question");
            }
        }
        map
    }

    /// Both sources combined; a declared dependency wins over the table.
    pub fn for_section(
        questions: &[Question],
        step: usize,
        section: usize,
        table: &WalkbackTable,
    ) -> Self {
        let mut map = Self::from_walkback(questions, step, section, table);
        map.extend(Self::from_declared(questions, step, section));
        map
    }

    /// The combined map for every section of a questionnaire.
    pub fn for_questionnaire(questionnaire: &Questionnaire, table: &WalkbackTable) -> Self {
        let mut map = Self::new();
        for (step_index, step) in questionnaire.steps.iter().enumerate() {
            for (section_index, section) in step.sections.iter().enumerate() {
                map.extend(Self::for_section(
                    &section.questions,
                    step_index,
                    section_index,
                    table,
                ));
            }
        }
        map
    }

    /// Record that `child` follows up on `parent`.
    ///
    /// Returns `false` (and records nothing) unless `parent` is an earlier
    /// question of the same section.
    pub fn insert(&mut self, child: QuestionKey, parent: QuestionKey) -> bool {
        if !child.same_section(&parent) || parent.question() >= child.question() {
            return false;
        }
        self.parents.insert(child, parent);
        true
    }

    fn extend(&mut self, other: FollowupMap) {
        self.parents.extend(other.parents);
    }

    /// The controlling question of `key`, if it is a follow-up.
    pub fn parent(&self, key: &QuestionKey) -> Option<&QuestionKey> {
        self.parents.get(key)
    }

    /// Follow-ups controlled directly by `key`.
    pub fn children<'a>(&'a self, key: &'a QuestionKey) -> impl Iterator<Item = &'a QuestionKey> {
        self.parents
            .iter()
            .filter(move |(_, parent)| *parent == key)
            .map(|(child, _)| child)
    }

    /// Every question whose answer influences visibility.
    pub fn parent_keys(&self) -> BTreeSet<QuestionKey> {
        self.parents.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionKey, &QuestionKey)> {
        self.parents.iter()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QuestionType;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question::new(format!("Q{i}"), QuestionType::Text))
            .collect()
    }

    #[test]
    fn walkback_points_to_earlier_sibling() {
        let table = WalkbackTable::new()
            .with(QuestionKey::new(0, 2, 3), 1)
            .with(QuestionKey::new(0, 2, 4), 2);
        let map = FollowupMap::from_walkback(&questions(5), 0, 2, &table);
        assert_eq!(map.len(), 2);
        assert_eq!(map.parent(&QuestionKey::new(0, 2, 3)), Some(&QuestionKey::new(0, 2, 2)));
        assert_eq!(map.parent(&QuestionKey::new(0, 2, 4)), Some(&QuestionKey::new(0, 2, 2)));
    }

    #[test]
    fn out_of_range_offsets_are_ignored() {
        let table = WalkbackTable::new()
            .with(QuestionKey::new(0, 0, 1), 2)
            .with(QuestionKey::new(0, 0, 2), 0)
            .with(QuestionKey::new(0, 0, 3), -1);
        let map = FollowupMap::from_walkback(&questions(4), 0, 0, &table);
        assert!(map.is_empty());
    }

    #[test]
    fn table_entries_for_other_sections_do_not_apply() {
        let table = WalkbackTable::new().with(QuestionKey::new(0, 1, 1), 1);
        let map = FollowupMap::from_walkback(&questions(2), 0, 0, &table);
        assert!(map.is_empty());
    }

    #[test]
    fn declared_dependency_wins_over_table() {
        let mut qs = questions(4);
        qs[3].depends_on = Some(0);
        let table = WalkbackTable::new().with(QuestionKey::new(1, 0, 3), 1);
        let map = FollowupMap::for_section(&qs, 1, 0, &table);
        assert_eq!(map.parent(&QuestionKey::new(1, 0, 3)), Some(&QuestionKey::new(1, 0, 0)));
    }

    #[test]
    fn insert_rejects_cross_section_and_forward_links() {
        let mut map = FollowupMap::new();
        assert!(!map.insert(QuestionKey::new(0, 0, 1), QuestionKey::new(0, 1, 0)));
        assert!(!map.insert(QuestionKey::new(0, 0, 1), QuestionKey::new(0, 0, 1)));
        assert!(!map.insert(QuestionKey::new(0, 0, 1), QuestionKey::new(0, 0, 2)));
        assert!(map.insert(QuestionKey::new(0, 0, 2), QuestionKey::new(0, 0, 1)));
        assert_eq!(map.parent_keys().len(), 1);
    }

    #[test]
    fn children_of_a_parent() {
        let mut map = FollowupMap::new();
        let parent = QuestionKey::new(0, 0, 0);
        map.insert(QuestionKey::new(0, 0, 1), parent);
        map.insert(QuestionKey::new(0, 0, 2), parent);
        map.insert(QuestionKey::new(0, 0, 3), QuestionKey::new(0, 0, 2));
        assert_eq!(map.children(&parent).count(), 2);
    }

    #[test]
    fn table_from_json() {
        let table: WalkbackTable = serde_json::from_str(r#"{ "0.1-3": 1, "2.0-5": -4 }"#).unwrap();
        assert_eq!(table.get(&QuestionKey::new(0, 1, 3)), Some(1));
        assert_eq!(table.get(&QuestionKey::new(2, 0, 5)), Some(-4));
    }
}
