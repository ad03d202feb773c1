//! Configuration structures
//!
//! Every section has serde defaults so a file only needs `auth.client_id`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZATION_ENDPOINT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_REDIRECT_URI, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCOPES, DEFAULT_STORAGE_NAMESPACE,
    DEFAULT_TOKEN_ENDPOINT,
};
use crate::errors::{Result, TuneStatsError};

/// Root application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub auth: AuthSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Build a configuration with defaults for everything but the client id.
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            auth: AuthSettings::new(client_id),
            api: ApiSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }

    /// Check the values serde cannot check on its own.
    ///
    /// # Errors
    /// Returns `TuneStatsError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.auth.client_id.trim().is_empty() {
            return Err(TuneStatsError::Config("auth.client_id must not be empty".into()));
        }
        for (field, value) in [
            ("auth.redirect_uri", &self.auth.redirect_uri),
            ("auth.authorization_endpoint", &self.auth.authorization_endpoint),
            ("auth.token_endpoint", &self.auth.token_endpoint),
            ("api.base_url", &self.api.base_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(TuneStatsError::Config(format!(
                    "{field} must be an http(s) URL, got {value:?}"
                )));
            }
        }
        if self.auth.request_timeout_secs == 0 || self.api.timeout_secs == 0 {
            return Err(TuneStatsError::Config("timeouts must be greater than zero".into()));
        }
        if self.api.max_attempts == 0 {
            return Err(TuneStatsError::Config("api.max_attempts must be at least 1".into()));
        }
        if self.storage.namespace.trim().is_empty() {
            return Err(TuneStatsError::Config("storage.namespace must not be empty".into()));
        }
        Ok(())
    }
}

/// OAuth client registration and token endpoint behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Upper bound for a single token exchange or refresh call
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AuthSettings {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            authorization_endpoint: default_authorization_endpoint(),
            token_endpoint: default_token_endpoint(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Resource API client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Where session credentials are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    /// JSON file in the user's config directory
    #[default]
    File,
    /// Operating system keychain
    Keychain,
    /// Process memory only; nothing survives a restart
    Memory,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = TuneStatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keychain" => Ok(Self::Keychain),
            "memory" => Ok(Self::Memory),
            other => Err(TuneStatsError::Config(format!("unknown storage backend: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Explicit session file path; defaults to the platform config directory
    #[serde(default)]
    pub path: Option<String>,
    /// Prefix for every persisted key; use one namespace per account
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { backend: StorageBackendKind::default(), path: None, namespace: default_namespace() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(ToString::to_string).collect()
}

fn default_authorization_endpoint() -> String {
    DEFAULT_AUTHORIZATION_ENDPOINT.to_string()
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_namespace() -> String {
    DEFAULT_STORAGE_NAMESPACE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
