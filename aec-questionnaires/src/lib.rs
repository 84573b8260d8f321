//! Questionnaires bundled with the client.
//!
//! The Animal Ethics Committee application is shipped so forms can be
//! filled offline and so the engine has a realistic document to test
//! against.

use aec_form_types::{DocumentError, QuestionnaireData, WalkbackTable};

pub const ANIMAL_ETHICS_SLUG: &str = "aec";

const ANIMAL_ETHICS_JSON: &str = include_str!("../data/animal_ethics.json");
const ANIMAL_ETHICS_FOLLOWUPS_JSON: &str = include_str!("../data/followups.json");

/// The Animal Ethics Committee application questionnaire.
pub fn animal_ethics() -> Result<QuestionnaireData, DocumentError> {
    parse_questionnaire(ANIMAL_ETHICS_JSON)
}

/// Walk-back offsets of the follow-up questions in [`animal_ethics`].
pub fn animal_ethics_followups() -> Result<WalkbackTable, DocumentError> {
    Ok(serde_json::from_str(ANIMAL_ETHICS_FOLLOWUPS_JSON)?)
}

/// Parse questionnaire data and check its document.
pub fn parse_questionnaire(json: &str) -> Result<QuestionnaireData, DocumentError> {
    let data: QuestionnaireData = serde_json::from_str(json)?;
    data.document.check()?;
    Ok(data)
}

/// Every bundled questionnaire.
pub fn catalogue() -> Result<Vec<QuestionnaireData>, DocumentError> {
    Ok(vec![animal_ethics()?])
}

/// A bundled questionnaire by slug.
pub fn find(slug: &str) -> Result<Option<QuestionnaireData>, DocumentError> {
    Ok(catalogue()?.into_iter().find(|q| q.slug == slug))
}

/// The walk-back table that goes with a bundled questionnaire; empty for
/// unknown slugs.
pub fn followups_for(slug: &str) -> Result<WalkbackTable, DocumentError> {
    match slug {
        ANIMAL_ETHICS_SLUG => animal_ethics_followups(),
        _ => Ok(WalkbackTable::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aec_form_types::{FollowupMap, QuestionKey, QuestionType};

    #[test]
    fn bundled_document_is_valid() {
        let data = animal_ethics().unwrap();
        assert_eq!(data.slug, ANIMAL_ETHICS_SLUG);
        assert_eq!(data.document.len(), 4);
        assert_eq!(
            data.document.question(&QuestionKey::new(1, 0, 0)).map(|q| q.kind),
            Some(QuestionType::Grid)
        );
    }

    #[test]
    fn every_offset_resolves_to_a_parent() {
        let data = animal_ethics().unwrap();
        let table = animal_ethics_followups().unwrap();
        let map = FollowupMap::for_questionnaire(&data.document, &table);

        // Seven walk-back entries plus the declared euthanasia dependency.
        assert_eq!(map.len(), table.len() + 1);
        assert_eq!(
            map.parent(&QuestionKey::new(1, 0, 4)),
            Some(&QuestionKey::new(1, 0, 3))
        );
        assert_eq!(
            map.parent(&QuestionKey::new(1, 1, 2)),
            Some(&QuestionKey::new(1, 1, 1))
        );
    }

    #[test]
    fn find_by_slug() {
        assert!(find("aec").unwrap().is_some());
        assert!(find("fauna-permit").unwrap().is_none());
        assert!(followups_for("fauna-permit").unwrap().is_empty());
    }
}
