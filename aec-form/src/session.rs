//! The wizard: one application being filled step by step.

use aec_form_types::{
    AnswerValue, Answers, ApplicationData, FollowupMap, FormBackend, FormDocument, FormError,
    KeyedQuestion, Navigation, QuestionKey, QuestionType, QuestionnaireData, StepContext,
    ValidationErrors, VisibilityMap, WalkbackTable, validate_all, validate_step,
};
use tracing::{debug, info, warn};

use crate::{ApplicationApi, DraftStore, ReviewPage};

/// The page currently open in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePage {
    Step(usize),

    /// Comes after the last step.
    Review,
}

/// One application being filled.
///
/// The session owns the answers and decides when they are validated, saved
/// as a draft and pushed to the server. Backends only ever see one step.
#[derive(Debug)]
pub struct FormSession<S: DraftStore> {
    questionnaire: QuestionnaireData,
    application_key: String,
    followups: FollowupMap,
    answers: Answers,
    page: ActivePage,
    drafts: S,
    user_can_edit: bool,
    errors: ValidationErrors,
}

impl<S: DraftStore> FormSession<S> {
    /// Start an empty, editable session.
    pub fn new(
        questionnaire: QuestionnaireData,
        application_key: impl Into<String>,
        table: &WalkbackTable,
        drafts: S,
    ) -> Self {
        let followups = FollowupMap::for_questionnaire(&questionnaire.document, table);
        Self {
            questionnaire,
            application_key: application_key.into(),
            followups,
            answers: Answers::new(),
            page: ActivePage::Step(0),
            drafts,
            user_can_edit: true,
            errors: ValidationErrors::new(),
        }
    }

    /// Resume an application.
    ///
    /// A stored draft takes precedence over the answers the server has. A
    /// read-only application opens on the review page.
    pub fn open(
        application: &ApplicationData,
        questionnaire: QuestionnaireData,
        table: &WalkbackTable,
        drafts: S,
    ) -> Result<Self, FormError> {
        let mut session = Self::new(questionnaire, application.key.clone(), table, drafts);
        session.answers = application.document.answers.clone();
        session.restore_draft()?;

        session.user_can_edit = application.status.is_editable();
        if !session.user_can_edit {
            session.page = ActivePage::Review;
        }
        Ok(session)
    }

    /// Merge the stored draft, if any, over the current answers.
    ///
    /// Returns whether a draft was found.
    pub fn restore_draft(&mut self) -> Result<bool, FormError> {
        let Some(draft) = self
            .drafts
            .load(&self.application_key)
            .map_err(FormError::backend)?
        else {
            return Ok(false);
        };
        debug!(key = %self.application_key, answers = draft.len(), "restoring draft");
        self.answers.merge(draft);
        Ok(true)
    }

    pub fn questionnaire(&self) -> &QuestionnaireData {
        &self.questionnaire
    }

    pub fn application_key(&self) -> &str {
        &self.application_key
    }

    pub fn followups(&self) -> &FollowupMap {
        &self.followups
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn page(&self) -> ActivePage {
        self.page
    }

    pub fn user_can_edit(&self) -> bool {
        self.user_can_edit
    }

    /// Messages from the last failed attempt to continue.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn drafts(&self) -> &S {
        &self.drafts
    }

    pub fn answer(&self, key: &QuestionKey) -> Option<&AnswerValue> {
        self.answers.get(key)
    }

    /// Record an answer.
    pub fn set_answer(
        &mut self,
        key: QuestionKey,
        value: impl Into<AnswerValue>,
    ) -> Result<(), FormError> {
        if !self.user_can_edit {
            return Err(FormError::ReadOnly);
        }
        if self.questionnaire.document.question(&key).is_none() {
            return Err(FormError::NoSuchQuestion(key));
        }
        self.answers.insert(key, value);
        Ok(())
    }

    /// Visibility of every question in a step for the current answers.
    pub fn visibility(&self, step: usize) -> VisibilityMap {
        VisibilityMap::for_step(
            &self.questionnaire.document,
            step,
            &self.followups,
            &self.answers,
        )
    }

    /// Validate the open step and move to the next page.
    ///
    /// On failure the session stays on the step and the messages are kept
    /// for the next attempt.
    pub fn continue_step(&mut self) -> Result<ActivePage, FormError> {
        let ActivePage::Step(step) = self.page else {
            return Ok(self.page);
        };

        if self.user_can_edit {
            let errors = validate_step(
                &self.questionnaire.document,
                step,
                &self.followups,
                &self.answers,
            );
            if !errors.is_empty() {
                debug!(step, errors = errors.len(), "step rejected");
                self.errors = errors.clone();
                return Err(FormError::Validation(errors));
            }
            self.save_draft()?;
        }

        self.errors = ValidationErrors::new();
        self.page = if step + 1 >= self.questionnaire.document.len() {
            ActivePage::Review
        } else {
            ActivePage::Step(step + 1)
        };
        Ok(self.page)
    }

    /// Move back one page without validating.
    pub fn back(&mut self) -> Result<ActivePage, FormError> {
        if self.user_can_edit {
            self.save_draft()?;
        }
        self.errors = ValidationErrors::new();
        self.page = match self.page {
            ActivePage::Step(step) => ActivePage::Step(step.saturating_sub(1)),
            ActivePage::Review => {
                ActivePage::Step(self.questionnaire.document.len().saturating_sub(1))
            }
        };
        Ok(self.page)
    }

    /// Reopen a step from the review page.
    pub fn edit_step(&mut self, step: usize) -> Result<(), FormError> {
        if self.page != ActivePage::Review {
            return Err(FormError::NotOnReview);
        }
        if !self.user_can_edit {
            return Err(FormError::ReadOnly);
        }
        if step >= self.questionnaire.document.len() {
            return Err(FormError::NoSuchStep(step));
        }
        self.page = ActivePage::Step(step);
        Ok(())
    }

    pub fn review(&self) -> ReviewPage {
        ReviewPage::build(
            &self.questionnaire.document,
            &self.followups,
            &self.answers,
            self.user_can_edit,
        )
    }

    /// Validate every step against the current answers.
    pub fn validate(&self) -> ValidationErrors {
        validate_all(&self.questionnaire.document, &self.followups, &self.answers)
    }

    pub fn save_draft(&mut self) -> Result<(), FormError> {
        self.drafts
            .save(&self.application_key, &self.answers)
            .map_err(FormError::backend)?;
        info!(key = %self.application_key, answers = self.answers.len(), "draft saved");
        Ok(())
    }

    /// The answer document as stored on the server.
    pub fn document(&self) -> FormDocument {
        FormDocument::new(self.answers.clone())
    }

    /// Push the answers and submit the application.
    ///
    /// Only possible from the review page, once the applicant confirmed the
    /// answers. Every step is validated again first.
    pub fn submit(
        &mut self,
        api: &dyn ApplicationApi,
        confirmed: bool,
    ) -> Result<ApplicationData, FormError> {
        if self.page != ActivePage::Review {
            return Err(FormError::NotOnReview);
        }
        if !self.user_can_edit {
            return Err(FormError::ReadOnly);
        }
        if !confirmed {
            return Err(FormError::NotConfirmed);
        }

        let errors = self.validate();
        if !errors.is_empty() {
            return Err(FormError::Validation(errors));
        }

        api.update_application(&self.application_key, &self.document())
            .map_err(FormError::backend)?;
        let application = api
            .submit_application(&self.application_key)
            .map_err(FormError::backend)?;

        self.user_can_edit = application.status.is_editable();
        if let Err(e) = self.drafts.clear(&self.application_key) {
            warn!(key = %self.application_key, error = %e, "could not remove submitted draft");
        }
        info!(key = %self.application_key, status = ?application.status, "application submitted");
        Ok(application)
    }

    /// Let `backend` fill steps until the review page is reached.
    ///
    /// Answers collected before a backend failure are saved as a draft.
    pub fn run<B: FormBackend>(&mut self, backend: &B) -> Result<(), FormError> {
        while let ActivePage::Step(step) = self.page {
            let context = StepContext {
                questionnaire: &self.questionnaire.document,
                step,
                followups: &self.followups,
                errors: &self.errors,
            };

            let navigation = match backend.fill_step(&context, &mut self.answers) {
                Ok(navigation) => navigation,
                Err(e) => {
                    if self.user_can_edit
                        && let Err(draft_err) = self.save_draft()
                    {
                        warn!(error = %draft_err, "could not save draft after backend failure");
                    }
                    return Err(FormError::Backend(e.into()));
                }
            };

            match navigation {
                Navigation::Back => {
                    self.back()?;
                }
                Navigation::Continue => match self.continue_step() {
                    Ok(_) | Err(FormError::Validation(_)) => {}
                    Err(e) => return Err(e),
                },
            }
        }
        Ok(())
    }

    /// Answered `file` questions with the local path each one names.
    pub fn file_answers(&self) -> impl Iterator<Item = (KeyedQuestion<'_>, &str)> {
        self.questionnaire
            .document
            .questions()
            .filter(|q| q.question.kind == QuestionType::File)
            .filter_map(|q| {
                let path = self.answers.get(&q.key)?.as_str()?;
                (!path.trim().is_empty()).then_some((q, path))
            })
    }
}
