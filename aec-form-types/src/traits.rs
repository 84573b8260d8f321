use crate::{Answers, FollowupMap, FormStep, Questionnaire, ValidationErrors, VisibilityMap};

/// Where the applicant wants to go after filling a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Validate this step and move on (to the review page after the last step).
    Continue,

    /// Go back one step without validating.
    Back,
}

/// Everything a backend needs to present one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub questionnaire: &'a Questionnaire,

    /// Index of the step being filled.
    pub step: usize,

    pub followups: &'a FollowupMap,

    /// Messages from the last failed attempt to continue; empty on first visit.
    pub errors: &'a ValidationErrors,
}

impl StepContext<'_> {
    /// The step being filled.
    pub fn form_step(&self) -> Option<&FormStep> {
        self.questionnaire.step(self.step)
    }

    pub fn is_first(&self) -> bool {
        self.step == 0
    }

    pub fn is_last(&self) -> bool {
        self.step + 1 == self.questionnaire.len()
    }

    /// Visibility of one section for the given answers.
    ///
    /// Backends call this again after every answer so follow-ups appear and
    /// disappear as the applicant types.
    pub fn section_visibility(&self, section: usize, answers: &Answers) -> VisibilityMap {
        VisibilityMap::for_section(
            self.questionnaire,
            self.step,
            section,
            self.followups,
            answers,
        )
    }
}

/// Trait for backend implementations that collect answers step by step.
///
/// Backends receive one step at a time and edit the answers in place.
/// They decide how to present it (terminal prompts, scripted answers, ...).
/// The session validates the step when the backend asks to continue and
/// hands the step back with the messages if it fails.
pub trait FormBackend {
    /// The error type for this backend.
    type Error: Into<anyhow::Error>;

    /// Fill the step described by `context`.
    ///
    /// # Returns
    /// * `Ok(navigation)` once the applicant chose to continue or go back
    /// * `Err` on cancellation or backend failure
    fn fill_step(
        &self,
        context: &StepContext<'_>,
        answers: &mut Answers,
    ) -> Result<Navigation, Self::Error>;
}
