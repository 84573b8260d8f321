//! Property tests for the follow-up visibility resolver.

use aec_form_types::{
    AnswerValue, Answers, FollowupMap, Question, QuestionKey, QuestionType, VisibilityMap,
    WalkbackTable,
};
use proptest::prelude::*;

const STEP: usize = 1;
const SECTION: usize = 2;

fn key(index: usize) -> QuestionKey {
    QuestionKey::new(STEP, SECTION, index)
}

fn answer() -> impl Strategy<Value = Option<AnswerValue>> {
    prop_oneof![
        Just(None),
        Just(Some(AnswerValue::Null)),
        Just(Some(AnswerValue::from(""))),
        Just(Some(AnswerValue::from("yes"))),
        Just(Some(AnswerValue::from(true))),
        Just(Some(AnswerValue::from(false))),
        Just(Some(AnswerValue::from(0))),
        Just(Some(AnswerValue::from(2))),
    ]
}

/// A section of `n` questions, a walk-back offset (or none) per question and an answer per question.
fn section() -> impl Strategy<Value = (usize, Vec<Option<i64>>, Vec<Option<AnswerValue>>)> {
    (1usize..12).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(prop::option::of(-2i64..8), n),
            prop::collection::vec(answer(), n),
        )
    })
}

fn build(
    n: usize,
    offsets: &[Option<i64>],
    values: &[Option<AnswerValue>],
) -> (FollowupMap, Answers, WalkbackTable) {
    let questions: Vec<Question> = (0..n)
        .map(|i| Question::new(format!("Q{i}"), QuestionType::Text))
        .collect();
    let table: WalkbackTable = offsets
        .iter()
        .enumerate()
        .filter_map(|(i, o)| o.map(|o| (key(i), o)))
        .collect();
    let mut answers = Answers::new();
    for (i, value) in values.iter().enumerate() {
        if let Some(value) = value {
            answers.insert(key(i), value.clone());
        }
    }
    (
        FollowupMap::from_walkback(&questions, STEP, SECTION, &table),
        answers,
        table,
    )
}

proptest! {
    #[test]
    fn questions_without_parent_are_visible((n, offsets, values) in section()) {
        let (map, answers, _) = build(n, &offsets, &values);
        let vis = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        for i in 0..n {
            if map.parent(&key(i)).is_none() {
                prop_assert!(vis.is_visible(&key(i)));
            }
        }
    }

    #[test]
    fn hidden_parent_hides_child((n, offsets, values) in section()) {
        let (map, answers, _) = build(n, &offsets, &values);
        let vis = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        for (child, parent) in map.iter() {
            if !vis.is_visible(parent) {
                prop_assert!(!vis.is_visible(child));
            }
        }
    }

    #[test]
    fn out_of_range_offsets_mean_always_visible((n, offsets, values) in section()) {
        let (map, answers, table) = build(n, &offsets, &values);
        let vis = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        for i in 0..n {
            if let Some(offset) = table.get(&key(i))
                && (offset < 1 || offset > i as i64)
            {
                prop_assert!(map.parent(&key(i)).is_none());
                prop_assert!(vis.is_visible(&key(i)));
            }
        }
    }

    #[test]
    fn recomputation_is_idempotent((n, offsets, values) in section()) {
        let (map, answers, _) = build(n, &offsets, &values);
        let first = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        let second = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unrelated_answers_do_not_matter(
        (n, offsets, values) in section(),
        replacement in answer(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (map, answers, _) = build(n, &offsets, &values);
        let target = key(pick.index(n));
        prop_assume!(!map.parent_keys().contains(&target));

        let mut changed = answers.clone();
        match replacement {
            Some(value) => changed.insert(target, value),
            None => {
                changed.remove(&target);
            }
        }

        let before = VisibilityMap::compute(&map, (0..n).map(key), &answers);
        let after = VisibilityMap::compute(&map, (0..n).map(key), &changed);
        prop_assert_eq!(before, after);
    }
}

#[test]
fn three_question_chain() {
    let (map, _, _) = build(3, &[None, Some(1), Some(1)], &[None, None, None]);
    let cases = [
        ("", "yes", false, false),
        ("", "", false, false),
        ("yes", "", true, false),
        ("yes", "yes", true, true),
    ];
    for (a, b, b_visible, c_visible) in cases {
        let answers = Answers::new()
            .with(key(0), a)
            .with(key(1), b)
            .with(key(2), "anything");
        let vis = VisibilityMap::compute(&map, (0..3).map(key), &answers);
        assert!(vis.is_visible(&key(0)));
        assert_eq!(vis.is_visible(&key(1)), b_visible, "A={a:?} B={b:?}");
        assert_eq!(vis.is_visible(&key(2)), c_visible, "A={a:?} B={b:?}");
    }
}
