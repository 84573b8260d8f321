//! Client configuration: where the API lives and how to authenticate to it.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Error type for loading the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Config blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for talking to the application API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL all API paths are relative to.
    #[serde(alias = "base_url")]
    pub api_base: String,

    /// Name of the header carrying the CSRF token.
    pub csrf_header: String,

    /// CSRF token sent with every request; empty to send none.
    pub csrf_token: String,

    /// Largest attachment accepted, in bytes.
    pub upload_max_size: u64,

    /// Where drafts are kept; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drafts_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            csrf_token: String::new(),
            upload_max_size: DEFAULT_UPLOAD_MAX_SIZE,
            drafts_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Read `config.toml` from the platform config directory, if there is one.
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Decode the bootstrap blob a web page embeds: base64-encoded JSON,
    /// optionally wrapped in a JSON string literal.
    pub fn from_base64_json(blob: &str) -> Result<Self, ConfigError> {
        let blob = blob.trim();
        let encoded = if blob.starts_with('"') {
            serde_json::from_str::<String>(blob)?
        } else {
            blob.to_string()
        };
        let decoded = STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&decoded)?)
    }

    /// Apply `AEC_API_BASE`, `AEC_CSRF_HEADER` and `AEC_CSRF_TOKEN`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("AEC_API_BASE") {
            self.api_base = base;
        }
        if let Some(header) = lookup("AEC_CSRF_HEADER") {
            self.csrf_header = header;
        }
        if let Some(token) = lookup("AEC_CSRF_TOKEN") {
            self.csrf_token = token;
        }
        self
    }

    /// Directory holding local drafts.
    pub fn drafts_dir(&self) -> Option<PathBuf> {
        self.drafts_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("drafts")))
    }
}

/// Platform directories for this application.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("au.gov.wa", "DBCA", "aec-form")
}

/// `config.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}
