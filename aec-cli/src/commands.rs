use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use dialoguer::theme::{ColorfulTheme, SimpleTheme, Theme};
use dialoguer::{Confirm, Select};
use tracing::{info, warn};

use aec_form::{
    Answers, ApplicationApi, ApplicationData, AttachmentUpload, ClientConfig, DraftStore,
    FileDraftStore, FollowupMap, FormError, FormSession, HttpApi, MemoryDraftStore, Questionnaire,
    QuestionnaireData, VisibilityMap, WalkbackTable,
};
use aec_wizard_dialoguer::{DialoguerBackend, DialoguerError};

const CONFIRMATION: &str = "I confirm the information provided is accurate and complete";

/// The subcommands that talk to the API or the draft directory.
pub struct Wizard {
    config: ClientConfig,
    plain: bool,
}

impl Wizard {
    pub fn new(config: ClientConfig, plain: bool) -> Self {
        Self { config, plain }
    }

    fn api(&self) -> Result<HttpApi> {
        HttpApi::new(&self.config).context("configuring the API client")
    }

    fn drafts(&self) -> Result<FileDraftStore> {
        let dir = self
            .config
            .drafts_dir()
            .context("no drafts directory; pass --drafts-dir")?;
        Ok(FileDraftStore::new(dir))
    }

    fn theme(&self) -> Box<dyn Theme> {
        if self.plain {
            Box::new(SimpleTheme)
        } else {
            Box::new(ColorfulTheme::default())
        }
    }

    fn backend(&self) -> DialoguerBackend {
        let backend = if self.plain {
            DialoguerBackend::plain()
        } else {
            DialoguerBackend::new()
        };
        backend.with_upload_limit(self.config.upload_max_size)
    }

    pub fn questionnaires(&self, offline: bool) -> Result<()> {
        let questionnaires = if offline {
            aec_questionnaires::catalogue().context("loading bundled questionnaires")?
        } else {
            self.api()?
                .fetch_questionnaires()
                .context("fetching questionnaires")?
        };

        if questionnaires.is_empty() {
            println!("No questionnaires available.");
        }
        for q in &questionnaires {
            println!("{:<16} v{:<3} {}", q.slug, q.version, q.name);
        }
        Ok(())
    }

    pub fn applications(&self) -> Result<()> {
        let applications = self
            .api()?
            .fetch_applications()
            .context("fetching applications")?;

        if applications.is_empty() {
            println!("You have no applications yet. Start one with `aec new <slug>`.");
        }
        for app in &applications {
            println!(
                "{:<12} {:<16} {:<32} updated {}",
                app.key,
                format!("{:?}", app.status),
                app.questionnaire_name,
                app.updated_at.format("%d/%m/%Y"),
            );
        }
        Ok(())
    }

    pub fn create(&self, slug: &str) -> Result<()> {
        let application = self
            .api()?
            .create_application(slug)
            .with_context(|| format!("creating an application for {slug}"))?;
        info!(key = %application.key, slug, "application created");
        println!("Created application {}", application.key);
        println!("Fill it in with `aec fill {}`", application.key);
        Ok(())
    }

    pub fn fill(
        &self,
        key: &str,
        questionnaire: Option<&Path>,
        followups: Option<&Path>,
        offline: bool,
    ) -> Result<()> {
        let drafts = self.drafts()?;

        if offline {
            let data = match questionnaire {
                Some(path) => read_questionnaire(path)?,
                None => aec_questionnaires::animal_ethics()?,
            };
            let table = read_followups(followups, &data.slug)?;
            let mut session = FormSession::new(data, key, &table, drafts);
            if session.restore_draft()? {
                println!("Resuming draft {key}");
            }
            return self.drive(&mut session, None);
        }

        let api = self.api()?;
        let application = api
            .get_application(key)
            .with_context(|| format!("fetching application {key}"))?;
        let data = match questionnaire {
            Some(path) => read_questionnaire(path)?,
            None => fetch_questionnaire(&api, &application)?,
        };
        let table = read_followups(followups, &data.slug)?;
        let mut session = FormSession::open(&application, data, &table, drafts)?;
        let api: &dyn ApplicationApi = &api;
        self.drive(&mut session, Some(api))
    }

    /// Fill steps, then loop on the review page until the applicant
    /// submits or leaves.
    fn drive<S: DraftStore>(
        &self,
        session: &mut FormSession<S>,
        api: Option<&dyn ApplicationApi>,
    ) -> Result<()> {
        let backend = self.backend();
        let theme = self.theme();

        loop {
            if let Err(e) = session.run(&backend) {
                if is_cancelled(&e) {
                    println!(
                        "Draft saved. Continue later with `aec fill {}`.",
                        session.application_key()
                    );
                    return Ok(());
                }
                return Err(e.into());
            }

            println!("{}", session.review());
            if !session.user_can_edit() {
                return Ok(());
            }

            let mut items = vec!["Edit a step", "Save and exit"];
            if api.is_some() {
                items.insert(0, "Submit");
            }
            let Some(choice) = Select::with_theme(&*theme)
                .with_prompt("What next?")
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                session.save_draft()?;
                return Ok(());
            };

            match items[choice] {
                "Submit" => {
                    let Some(api) = api else { continue };
                    let confirmed = Confirm::with_theme(&*theme)
                        .with_prompt(CONFIRMATION)
                        .default(false)
                        .interact()?;
                    if !confirmed {
                        println!("{}", FormError::NotConfirmed);
                        continue;
                    }
                    match submit_with_files(session, api) {
                        Ok(application) => {
                            println!(
                                "Application {} submitted ({:?}).",
                                application.key, application.status
                            );
                            return Ok(());
                        }
                        Err(FormError::Validation(errors)) => {
                            eprintln!("Some answers need attention:\n{errors}");
                            if let Some((key, _)) = errors.first() {
                                session.edit_step(key.step())?;
                            }
                        }
                        Err(e) => return Err(e).context("submitting the application"),
                    }
                }
                "Edit a step" => {
                    let titles: Vec<String> = session
                        .questionnaire()
                        .document
                        .steps
                        .iter()
                        .enumerate()
                        .map(|(i, step)| format!("{}. {}", i + 1, step.title))
                        .collect();
                    if let Some(step) = Select::with_theme(&*theme)
                        .with_prompt("Which step?")
                        .items(&titles)
                        .default(0)
                        .interact_opt()?
                    {
                        session.edit_step(step)?;
                    }
                }
                _ => {
                    session.save_draft()?;
                    println!("Draft saved.");
                    return Ok(());
                }
            }
        }
    }

    pub fn review(
        &self,
        key: &str,
        questionnaire: Option<&Path>,
        followups: Option<&Path>,
        offline: bool,
    ) -> Result<()> {
        if offline {
            let data = match questionnaire {
                Some(path) => read_questionnaire(path)?,
                None => aec_questionnaires::animal_ethics()?,
            };
            let table = read_followups(followups, &data.slug)?;
            let mut session = FormSession::new(data, key, &table, self.drafts()?);
            if !session.restore_draft()? {
                bail!("no local draft for {key}");
            }
            println!("{}", session.review());
            return Ok(());
        }

        let api = self.api()?;
        let application = api
            .get_application(key)
            .with_context(|| format!("fetching application {key}"))?;
        let data = match questionnaire {
            Some(path) => read_questionnaire(path)?,
            None => fetch_questionnaire(&api, &application)?,
        };
        let table = read_followups(followups, &data.slug)?;
        let session = FormSession::open(&application, data, &table, MemoryDraftStore::new())?;
        println!("{}", session.review());
        Ok(())
    }
}

fn is_cancelled(err: &FormError) -> bool {
    match err {
        FormError::Backend(e) => matches!(
            e.downcast_ref::<DialoguerError>(),
            Some(DialoguerError::Cancelled)
        ),
        other => other.is_cancelled(),
    }
}

/// The questionnaire version an application was started on, checked like a
/// bundled or file-loaded one.
fn fetch_questionnaire(
    api: &dyn ApplicationApi,
    application: &ApplicationData,
) -> Result<QuestionnaireData> {
    let slug = &application.questionnaire_slug;
    let data = api
        .get_questionnaire(slug, Some(application.questionnaire_version))
        .with_context(|| format!("fetching questionnaire {slug}"))?;
    data.document
        .check()
        .with_context(|| format!("questionnaire {slug} from the server is malformed"))?;
    Ok(data)
}

/// Submit after the applicant confirmed. Files are only uploaded once every
/// step passes validation.
fn submit_with_files<S: DraftStore>(
    session: &mut FormSession<S>,
    api: &dyn ApplicationApi,
) -> Result<ApplicationData, FormError> {
    let errors = session.validate();
    if !errors.is_empty() {
        return Err(FormError::Validation(errors));
    }
    upload_files(session, api).map_err(FormError::Backend)?;
    session.submit(api, true)
}

/// Upload files answered with a local path that the server does not have yet.
fn upload_files<S: DraftStore>(session: &FormSession<S>, api: &dyn ApplicationApi) -> Result<()> {
    let key = session.application_key();
    let uploaded: BTreeSet<String> = api
        .list_attachments(key)
        .context("listing attachments")?
        .into_iter()
        .map(|a| a.question)
        .collect();

    for (question, path) in session.file_answers() {
        let question_key = question.key.to_string();
        if uploaded.contains(&question_key) {
            continue;
        }
        let path = Path::new(path);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&question.question.label);
        println!("Uploading {}", path.display());
        api.upload_attachment(&AttachmentUpload {
            application_key: key,
            name,
            question: &question_key,
            path,
        })
        .with_context(|| format!("uploading {}", path.display()))?;
    }
    Ok(())
}

/// Read questionnaire data, or a bare questionnaire document named after
/// the file.
pub fn read_questionnaire(path: &Path) -> Result<QuestionnaireData> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    if let Ok(data) = aec_questionnaires::parse_questionnaire(&json) {
        return Ok(data);
    }
    let document = Questionnaire::from_json(&json)
        .with_context(|| format!("parsing questionnaire {}", path.display()))?;
    let slug = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("questionnaire")
        .to_string();
    warn!(path = %path.display(), "no catalogue metadata, using file name as slug");
    Ok(QuestionnaireData {
        name: slug.clone(),
        slug,
        version: 1,
        description: String::new(),
        created_at: None,
        document,
    })
}

/// The walk-back table from `path`, else the bundled one for `slug`.
fn read_followups(path: Option<&Path>, slug: &str) -> Result<WalkbackTable> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
        }
        None => Ok(aec_questionnaires::followups_for(slug)?),
    }
}

pub fn visibility(
    questionnaire: &Path,
    answers: Option<&Path>,
    followups: Option<&Path>,
) -> Result<()> {
    let data = read_questionnaire(questionnaire)?;
    let table = read_followups(followups, &data.slug)?;
    let answers: Answers = match answers {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Answers::new(),
    };

    let followup_map = FollowupMap::for_questionnaire(&data.document, &table);
    let visibility = VisibilityMap::for_questionnaire(&data.document, &followup_map, &answers);

    for q in data.document.questions() {
        let state = if visibility.is_visible(&q.key) {
            "visible"
        } else {
            "hidden"
        };
        let parent = followup_map
            .parent(&q.key)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<8} {:<8} {:<8} {}", q.key, state, parent, q.question.label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aec_form::{
        ApiError, Attachment, FormDocument, FormSection, FormStep, Question, QuestionKey,
        QuestionType,
    };
    use std::cell::{Cell, RefCell};
    use std::fs;

    #[derive(Default)]
    struct RecordingApi {
        questionnaire: Option<QuestionnaireData>,
        listed: Cell<usize>,
        uploads: RefCell<Vec<String>>,
    }

    fn unavailable<T>() -> Result<T, ApiError> {
        Err(ApiError::Status {
            status: 503,
            message: "Service unavailable".into(),
        })
    }

    impl ApplicationApi for RecordingApi {
        fn fetch_questionnaires(&self) -> Result<Vec<QuestionnaireData>, ApiError> {
            unavailable()
        }

        fn get_questionnaire(&self, _: &str, _: Option<u32>) -> Result<QuestionnaireData, ApiError> {
            self.questionnaire.clone().map_or_else(unavailable, Ok)
        }

        fn fetch_applications(&self) -> Result<Vec<ApplicationData>, ApiError> {
            unavailable()
        }

        fn get_application(&self, _: &str) -> Result<ApplicationData, ApiError> {
            unavailable()
        }

        fn create_application(&self, _: &str) -> Result<ApplicationData, ApiError> {
            unavailable()
        }

        fn update_application(&self, _: &str, _: &FormDocument) -> Result<ApplicationData, ApiError> {
            unavailable()
        }

        fn submit_application(&self, _: &str) -> Result<ApplicationData, ApiError> {
            unavailable()
        }

        fn list_attachments(&self, _: &str) -> Result<Vec<Attachment>, ApiError> {
            self.listed.set(self.listed.get() + 1);
            Ok(Vec::new())
        }

        fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> Result<Attachment, ApiError> {
            self.uploads.borrow_mut().push(upload.question.to_string());
            unavailable()
        }
    }

    fn protocol_form() -> QuestionnaireData {
        QuestionnaireData {
            slug: "aec".into(),
            version: 2,
            name: "Animal Ethics".into(),
            description: String::new(),
            created_at: None,
            document: Questionnaire::new(vec![FormStep::new(
                "Project",
                vec![FormSection::new(
                    "Overview",
                    vec![
                        Question::new("Title", QuestionType::Text).required(),
                        Question::new("Protocol", QuestionType::File),
                    ],
                )],
            )]),
        }
    }

    fn application() -> ApplicationData {
        serde_json::from_value(serde_json::json!({
            "key": "a1",
            "owner": "jdoe",
            "questionnaire_slug": "aec",
            "questionnaire_name": "Animal Ethics",
            "questionnaire_version": 2,
            "status": "DRAFT",
            "created_at": "2025-07-01T02:00:00Z",
            "updated_at": "2025-07-01T02:00:00Z"
        }))
        .unwrap()
    }

    fn session_on_review() -> FormSession<MemoryDraftStore> {
        let mut session = FormSession::new(
            protocol_form(),
            "a1",
            &WalkbackTable::new(),
            MemoryDraftStore::new(),
        );
        session.set_answer(QuestionKey::new(0, 0, 0), "Quenda trapping").unwrap();
        session.set_answer(QuestionKey::new(0, 0, 1), "/tmp/protocol.pdf").unwrap();
        session.continue_step().unwrap();
        session
    }

    #[test]
    fn invalid_answers_upload_nothing() {
        let mut session = session_on_review();
        session.set_answer(QuestionKey::new(0, 0, 0), "").unwrap();
        let api = RecordingApi::default();

        let result = submit_with_files(&mut session, &api);
        assert!(matches!(result, Err(FormError::Validation(_))));
        assert_eq!(api.listed.get(), 0);
        assert!(api.uploads.borrow().is_empty());
    }

    #[test]
    fn valid_answers_upload_before_submitting() {
        let mut session = session_on_review();
        let api = RecordingApi::default();

        let result = submit_with_files(&mut session, &api);
        assert!(matches!(result, Err(FormError::Backend(_))));
        assert_eq!(api.listed.get(), 1);
        assert_eq!(*api.uploads.borrow(), vec!["0.0-1".to_string()]);
    }

    #[test]
    fn server_questionnaire_is_checked() {
        let mut broken = protocol_form();
        broken.document.steps[0].sections[0]
            .questions
            .push(Question::new("Sex", QuestionType::Select));
        let api = RecordingApi {
            questionnaire: Some(broken),
            ..RecordingApi::default()
        };
        assert!(fetch_questionnaire(&api, &application()).is_err());

        let api = RecordingApi {
            questionnaire: Some(protocol_form()),
            ..RecordingApi::default()
        };
        assert_eq!(fetch_questionnaire(&api, &application()).unwrap().version, 2);
    }

    #[test]
    fn followups_file_overrides_bundled_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("followups.json");
        fs::write(&path, r#"{ "0.0-1": 1 }"#).unwrap();

        let table = read_followups(Some(&path), aec_questionnaires::ANIMAL_ETHICS_SLUG).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&QuestionKey::new(0, 0, 1)), Some(1));
    }

    #[test]
    fn bare_questionnaire_takes_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fauna.json");
        fs::write(
            &path,
            r#"{ "schema_version": "2025.07-1", "steps": [ { "title": "Permit", "sections": [ { "title": "Holder",
                "questions": [ { "label": "Name", "type": "text" } ] } ] } ] }"#,
        )
        .unwrap();

        let data = read_questionnaire(&path).unwrap();
        assert_eq!(data.slug, "fauna");
        assert_eq!(data.document.len(), 1);
    }

    #[test]
    fn followups_default_to_bundled_table() {
        let table = read_followups(None, aec_questionnaires::ANIMAL_ETHICS_SLUG).unwrap();
        assert!(!table.is_empty());
        assert!(read_followups(None, "fauna").unwrap().is_empty());
    }

    #[test]
    fn cancellation_is_recognised() {
        assert!(is_cancelled(&FormError::backend(DialoguerError::Cancelled)));
        assert!(is_cancelled(&FormError::Cancelled));
        assert!(!is_cancelled(&FormError::NotConfirmed));
    }
}
