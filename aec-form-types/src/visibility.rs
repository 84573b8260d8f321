use std::collections::BTreeMap;

use crate::{AnswerValue, Answers, FollowupMap, QuestionKey, Questionnaire};

/// Which questions are currently shown.
///
/// A question without a parent is always visible. A follow-up is visible iff
/// its parent is visible and the parent's current answer is truthy. The map
/// is a pure function of the follow-up map and the answers; recompute it
/// whenever an answer changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap {
    visible: BTreeMap<QuestionKey, bool>,
}

impl VisibilityMap {
    /// Resolve visibility for `keys` (and, transitively, their ancestors).
    pub fn compute<I>(followups: &FollowupMap, keys: I, answers: &Answers) -> Self
    where
        I: IntoIterator<Item = QuestionKey>,
    {
        let mut visible = BTreeMap::new();
        for key in keys {
            resolve(key, followups, answers, &mut visible);
        }
        Self { visible }
    }

    /// Visibility of every question in one section.
    pub fn for_section(
        questionnaire: &Questionnaire,
        step: usize,
        section: usize,
        followups: &FollowupMap,
        answers: &Answers,
    ) -> Self {
        let keys = questionnaire
            .section_questions(step, section)
            .map(|q| q.key);
        Self::compute(followups, keys, answers)
    }

    /// Visibility of every question in one step.
    pub fn for_step(
        questionnaire: &Questionnaire,
        step: usize,
        followups: &FollowupMap,
        answers: &Answers,
    ) -> Self {
        let keys = questionnaire.step_questions(step).map(|q| q.key);
        Self::compute(followups, keys, answers)
    }

    /// Visibility of every question in the questionnaire.
    pub fn for_questionnaire(
        questionnaire: &Questionnaire,
        followups: &FollowupMap,
        answers: &Answers,
    ) -> Self {
        let keys = questionnaire.questions().map(|q| q.key);
        Self::compute(followups, keys, answers)
    }

    /// Whether `key` is shown. Keys that were never resolved are shown.
    pub fn is_visible(&self, key: &QuestionKey) -> bool {
        self.visible.get(key).copied().unwrap_or(true)
    }

    pub fn get(&self, key: &QuestionKey) -> Option<bool> {
        self.visible.get(key).copied()
    }

    /// Keys currently hidden, in document order.
    pub fn hidden(&self) -> impl Iterator<Item = &QuestionKey> {
        self.visible
            .iter()
            .filter(|(_, visible)| !**visible)
            .map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionKey, bool)> {
        self.visible.iter().map(|(key, visible)| (key, *visible))
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

// Parents always sit at a lower index of the same section, so the recursion
// depth is bounded by the section length.
fn resolve(
    key: QuestionKey,
    followups: &FollowupMap,
    answers: &Answers,
    memo: &mut BTreeMap<QuestionKey, bool>,
) -> bool {
    if let Some(&visible) = memo.get(&key) {
        return visible;
    }

    let visible = match followups.parent(&key) {
        None => true,
        Some(&parent) => {
            let parent_has_value = answers.get(&parent).is_some_and(AnswerValue::is_truthy);
            let parent_is_visible = resolve(parent, followups, answers, memo);
            parent_has_value && parent_is_visible
        }
    };

    memo.insert(key, visible);
    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GridRow, Question, QuestionType, WalkbackTable};

    fn chain() -> (FollowupMap, [QuestionKey; 3]) {
        let questions: Vec<Question> = ["A", "B", "C"]
            .into_iter()
            .map(|l| Question::new(l, QuestionType::Text))
            .collect();
        let keys = [
            QuestionKey::new(0, 0, 0),
            QuestionKey::new(0, 0, 1),
            QuestionKey::new(0, 0, 2),
        ];
        let table = WalkbackTable::new().with(keys[1], 1).with(keys[2], 1);
        (FollowupMap::from_walkback(&questions, 0, 0, &table), keys)
    }

    #[test]
    fn falsy_root_hides_whole_chain() {
        let (map, [a, b, c]) = chain();
        let answers = Answers::new().with(a, "").with(b, "yes").with(c, "yes");
        let vis = VisibilityMap::compute(&map, [a, b, c], &answers);
        assert!(vis.is_visible(&a));
        assert!(!vis.is_visible(&b));
        assert!(!vis.is_visible(&c));
    }

    #[test]
    fn falsy_middle_hides_tail() {
        let (map, [a, b, c]) = chain();
        let answers = Answers::new().with(a, "yes").with(b, "");
        let vis = VisibilityMap::compute(&map, [a, b, c], &answers);
        assert!(vis.is_visible(&b));
        assert!(!vis.is_visible(&c));
    }

    #[test]
    fn truthy_chain_shows_everything() {
        let (map, [a, b, c]) = chain();
        let answers = Answers::new().with(a, "yes").with(b, "yes");
        let vis = VisibilityMap::compute(&map, [a, b, c], &answers);
        assert_eq!(vis.hidden().count(), 0);
    }

    #[test]
    fn missing_parent_answer_is_falsy() {
        let (map, [a, b, _]) = chain();
        let vis = VisibilityMap::compute(&map, [b], &Answers::new());
        assert!(!vis.is_visible(&b));
        // the parent got resolved on the way
        assert_eq!(vis.get(&a), Some(true));
    }

    #[test]
    fn checkbox_and_number_parents() {
        let (map, [a, b, _]) = chain();
        let vis = VisibilityMap::compute(&map, [b], &Answers::new().with(a, false));
        assert!(!vis.is_visible(&b));
        let vis = VisibilityMap::compute(&map, [b], &Answers::new().with(a, 0));
        assert!(!vis.is_visible(&b));
        let vis = VisibilityMap::compute(&map, [b], &Answers::new().with(a, 3));
        assert!(vis.is_visible(&b));
    }

    #[test]
    fn grid_parent_needs_a_record() {
        let (map, [a, b, _]) = chain();
        let empty = Answers::new().with(a, Vec::<GridRow>::new());
        assert!(!VisibilityMap::compute(&map, [b], &empty).is_visible(&b));

        let one_row = Answers::new().with(a, vec![GridRow::new().with("Species", "Quenda")]);
        assert!(VisibilityMap::compute(&map, [b], &one_row).is_visible(&b));
    }

    #[test]
    fn unresolved_keys_are_visible() {
        let vis = VisibilityMap::default();
        assert!(vis.is_visible(&QuestionKey::new(9, 9, 9)));
    }
}
