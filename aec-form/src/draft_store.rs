//! Local drafts of application answers.
//!
//! Answers are saved every time the applicant moves between steps so nothing
//! is lost if the terminal closes before the application is pushed.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use aec_form_types::Answers;
use tracing::debug;

/// Error type for draft storage.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Failed to access draft {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Draft {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Somewhere to keep answers between sessions, keyed by application.
pub trait DraftStore {
    /// Stored answers, or `None` if there is no draft.
    fn load(&self, application_key: &str) -> Result<Option<Answers>, DraftError>;

    fn save(&mut self, application_key: &str, answers: &Answers) -> Result<(), DraftError>;

    /// Forget the draft; clearing a missing draft is fine.
    fn clear(&mut self, application_key: &str) -> Result<(), DraftError>;
}

/// File name of the draft for an application: `answers_{key}.json`.
///
/// Characters that could escape the drafts directory are replaced.
pub fn draft_file_name(application_key: &str) -> String {
    let safe: String = application_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("answers_{safe}.json")
}

/// Drafts stored as JSON files in one directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, application_key: &str) -> PathBuf {
        self.dir.join(draft_file_name(application_key))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, application_key: &str) -> Result<Option<Answers>, DraftError> {
        let path = self.path_for(application_key);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DraftError::Io { path, source }),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|source| DraftError::Corrupt { path, source })
    }

    fn save(&mut self, application_key: &str, answers: &Answers) -> Result<(), DraftError> {
        let path = self.path_for(application_key);
        let io_err = |source| DraftError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let json = serde_json::to_vec_pretty(answers).map_err(|source| DraftError::Corrupt {
            path: path.clone(),
            source,
        })?;

        // Write next to the target and rename so a crash never leaves half a draft.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!(path = %path.display(), answers = answers.len(), "draft written");
        Ok(())
    }

    fn clear(&mut self, application_key: &str) -> Result<(), DraftError> {
        let path = self.path_for(application_key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DraftError::Io { path, source }),
        }
    }
}

/// Drafts kept in memory, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    drafts: HashMap<String, Answers>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a stored draft.
    pub fn with_draft(mut self, application_key: impl Into<String>, answers: Answers) -> Self {
        self.drafts.insert(application_key.into(), answers);
        self
    }

    pub fn get(&self, application_key: &str) -> Option<&Answers> {
        self.drafts.get(application_key)
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, application_key: &str) -> Result<Option<Answers>, DraftError> {
        Ok(self.drafts.get(application_key).cloned())
    }

    fn save(&mut self, application_key: &str, answers: &Answers) -> Result<(), DraftError> {
        self.drafts
            .insert(application_key.to_string(), answers.clone());
        Ok(())
    }

    fn clear(&mut self, application_key: &str) -> Result<(), DraftError> {
        self.drafts.remove(application_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aec_form_types::QuestionKey;

    #[test]
    fn file_names_stay_in_directory() {
        assert_eq!(draft_file_name("3f2a-77"), "answers_3f2a-77.json");
        assert_eq!(draft_file_name("../etc/passwd"), "answers____etc_passwd.json");
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileDraftStore::new(dir.path().join("drafts"));
        assert!(store.load("app-1").unwrap().is_none());

        let answers = Answers::new().with(QuestionKey::new(0, 0, 0), "Quenda survey");
        store.save("app-1", &answers).unwrap();
        assert!(store.path_for("app-1").exists());
        assert_eq!(store.load("app-1").unwrap(), Some(answers));

        store.clear("app-1").unwrap();
        assert!(store.load("app-1").unwrap().is_none());
        store.clear("app-1").unwrap();
    }

    #[test]
    fn corrupt_draft_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        std::fs::write(store.path_for("broken"), "{ not json").unwrap();
        assert!(matches!(
            store.load("broken"),
            Err(DraftError::Corrupt { .. })
        ));
    }

    #[test]
    fn memory_store() {
        let mut store = MemoryDraftStore::new();
        let answers = Answers::new().with(QuestionKey::new(1, 0, 0), true);
        store.save("k", &answers).unwrap();
        assert_eq!(store.get("k"), Some(&answers));
        store.clear("k").unwrap();
        assert!(store.load("k").unwrap().is_none());
    }
}
