//! Client for the application API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aec_form_types::{ApplicationData, Attachment, FormDocument, QuestionnaireData};
use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::ClientConfig;

/// Error type for API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid header configuration: {0}")]
    Header(String),

    #[error("{path} is {size} bytes; the upload limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file to attach to an application.
#[derive(Debug, Clone)]
pub struct AttachmentUpload<'a> {
    pub application_key: &'a str,

    /// Display name stored with the attachment.
    pub name: &'a str,

    /// Key of the `file` question the attachment answers.
    pub question: &'a str,

    pub path: &'a Path,
}

/// Operations the form needs from the server.
pub trait ApplicationApi {
    fn fetch_questionnaires(&self) -> Result<Vec<QuestionnaireData>, ApiError>;

    /// A questionnaire by slug; the latest version when `version` is `None`.
    fn get_questionnaire(
        &self,
        slug: &str,
        version: Option<u32>,
    ) -> Result<QuestionnaireData, ApiError>;

    /// Applications owned by the current user.
    fn fetch_applications(&self) -> Result<Vec<ApplicationData>, ApiError>;

    fn get_application(&self, key: &str) -> Result<ApplicationData, ApiError>;

    fn create_application(&self, questionnaire_slug: &str) -> Result<ApplicationData, ApiError>;

    /// Replace the stored answer document.
    fn update_application(
        &self,
        key: &str,
        document: &FormDocument,
    ) -> Result<ApplicationData, ApiError>;

    fn submit_application(&self, key: &str) -> Result<ApplicationData, ApiError>;

    fn list_attachments(&self, application_key: &str) -> Result<Vec<Attachment>, ApiError>;

    fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> Result<Attachment, ApiError>;
}

/// [`ApplicationApi`] over blocking HTTP.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: String,
    upload_max_size: u64,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if !config.csrf_token.is_empty() {
            let name = HeaderName::from_bytes(config.csrf_header.as_bytes())
                .map_err(|e| ApiError::Header(format!("{}: {e}", config.csrf_header)))?;
            let value = HeaderValue::from_str(&config.csrf_token)
                .map_err(|e| ApiError::Header(format!("CSRF token: {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base: config.api_base.trim_end_matches('/').to_string(),
            upload_max_size: config.upload_max_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send()?)?;
        Ok(response.json()?)
    }
}

impl ApplicationApi for HttpApi {
    fn fetch_questionnaires(&self) -> Result<Vec<QuestionnaireData>, ApiError> {
        self.send(self.client.get(self.url("questionnaires")))
    }

    fn get_questionnaire(
        &self,
        slug: &str,
        version: Option<u32>,
    ) -> Result<QuestionnaireData, ApiError> {
        let mut request = self.client.get(self.url(&format!("questionnaires/{slug}")));
        if let Some(version) = version {
            request = request.query(&[("version", version)]);
        }
        self.send(request)
    }

    fn fetch_applications(&self) -> Result<Vec<ApplicationData>, ApiError> {
        self.send(self.client.get(self.url("applications")))
    }

    fn get_application(&self, key: &str) -> Result<ApplicationData, ApiError> {
        self.send(self.client.get(self.url(&format!("applications/{key}"))))
    }

    fn create_application(&self, questionnaire_slug: &str) -> Result<ApplicationData, ApiError> {
        let application: ApplicationData = self.send(
            self.client
                .post(self.url("applications"))
                .json(&json!({ "questionnaire_slug": questionnaire_slug })),
        )?;
        info!(key = %application.key, questionnaire_slug, "application created");
        Ok(application)
    }

    fn update_application(
        &self,
        key: &str,
        document: &FormDocument,
    ) -> Result<ApplicationData, ApiError> {
        debug!(key, answers = document.answers.len(), "updating application");
        self.send(
            self.client
                .put(self.url(&format!("applications/{key}")))
                .json(&json!({ "document": document })),
        )
    }

    fn submit_application(&self, key: &str) -> Result<ApplicationData, ApiError> {
        self.send(
            self.client
                .patch(self.url(&format!("applications/{key}")))
                .json(&json!({ "status": "SUBMITTED" })),
        )
    }

    fn list_attachments(&self, application_key: &str) -> Result<Vec<Attachment>, ApiError> {
        self.send(
            self.client
                .get(self.url("attachments"))
                .query(&[("application_key", application_key)]),
        )
    }

    fn upload_attachment(&self, upload: &AttachmentUpload<'_>) -> Result<Attachment, ApiError> {
        let io_err = |source| ApiError::Io {
            path: upload.path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(upload.path).map_err(io_err)?.len();
        if size > self.upload_max_size {
            return Err(ApiError::FileTooLarge {
                path: upload.path.to_path_buf(),
                size,
                limit: self.upload_max_size,
            });
        }

        let form = multipart::Form::new()
            .text("application_key", upload.application_key.to_string())
            .text("name", upload.name.to_string())
            .text("question", upload.question.to_string())
            .file("file", upload.path)
            .map_err(io_err)?;

        let attachment: Attachment =
            self.send(self.client.post(self.url("attachments")).multipart(form))?;
        info!(
            application_key = upload.application_key,
            question = upload.question,
            size,
            "attachment uploaded"
        );
        Ok(attachment)
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
    })
}

/// The human-readable message in an error response body.
///
/// The server reports failures as `{"status": ["..."]}`, `{"detail": "..."}`
/// or `{"message": "..."}`.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let text = |v: &Value| v.as_str().map(str::to_string);

    if let Some(first) = value.get("status").and_then(|s| s.as_array()?.first().cloned()) {
        return text(&first);
    }
    value
        .get("detail")
        .and_then(text)
        .or_else(|| value.get("message").and_then(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(r#"{"status": ["Cannot submit a rejected application."]}"#).as_deref(),
            Some("Cannot submit a rejected application.")
        );
        assert_eq!(
            error_message(r#"{"detail": "Not found."}"#).as_deref(),
            Some("Not found.")
        );
        assert_eq!(
            error_message(r#"{"message": "Bad request"}"#).as_deref(),
            Some("Bad request")
        );
        assert_eq!(error_message("<html>502</html>"), None);
        assert_eq!(error_message(r#"{"other": 1}"#), None);
    }

    #[test]
    fn urls_join_cleanly() {
        let config = ClientConfig {
            api_base: "http://localhost:8000/api/v1/".to_string(),
            ..ClientConfig::default()
        };
        let api = HttpApi::new(&config).unwrap();
        assert_eq!(
            api.url("/applications/abc"),
            "http://localhost:8000/api/v1/applications/abc"
        );
    }

    #[test]
    fn bad_csrf_header_is_rejected() {
        let config = ClientConfig {
            csrf_header: "not a header".to_string(),
            csrf_token: "t".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(HttpApi::new(&config), Err(ApiError::Header(_))));
    }

    #[test]
    fn oversized_upload_is_refused_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protocol.pdf");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let config = ClientConfig {
            upload_max_size: 16,
            ..ClientConfig::default()
        };
        let api = HttpApi::new(&config).unwrap();
        let result = api.upload_attachment(&AttachmentUpload {
            application_key: "a1",
            name: "protocol.pdf",
            question: "2.0-1",
            path: &path,
        });
        assert!(matches!(
            result,
            Err(ApiError::FileTooLarge { size: 64, limit: 16, .. })
        ));
    }
}
