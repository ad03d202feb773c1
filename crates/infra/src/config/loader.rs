//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `TUNESTATS_CLIENT_ID` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TUNESTATS_CLIENT_ID`: OAuth client id (required)
//! - `TUNESTATS_REDIRECT_URI`: Registered redirect URI
//! - `TUNESTATS_SCOPES`: Space or comma separated scopes
//! - `TUNESTATS_AUTHORIZE_URL`: Authorization endpoint
//! - `TUNESTATS_TOKEN_URL`: Token endpoint
//! - `TUNESTATS_API_BASE_URL`: Resource API base URL
//! - `TUNESTATS_REQUEST_TIMEOUT_SECS`: Timeout for token and API requests
//! - `TUNESTATS_STORAGE_BACKEND`: `file`, `keychain` or `memory`
//! - `TUNESTATS_STORAGE_PATH`: Session file for the file backend
//! - `TUNESTATS_STORAGE_NAMESPACE`: Key prefix inside the backend
//! - `TUNESTATS_LOG_LEVEL`: Default tracing filter
//! - `TUNESTATS_LOG_JSON`: JSON log output (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tunestats.toml`
//! 2. `./config/tunestats.toml`
//! 3. `./tunestats.json`
//! 4. `<user config dir>/tunestats/config.toml`

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tunestats_domain::{Config, Result, TuneStatsError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the client id is
/// missing there, falls back to loading from a config file.
///
/// # Errors
/// Returns `TuneStatsError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The loaded configuration fails validation
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `TUNESTATS_CLIENT_ID` is required; everything else falls back to its
/// default.
///
/// # Errors
/// Returns `TuneStatsError::Config` if the client id is missing or a value
/// is invalid.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::with_client_id(env_var("TUNESTATS_CLIENT_ID")?);

    if let Some(uri) = env_opt("TUNESTATS_REDIRECT_URI") {
        config.auth.redirect_uri = uri;
    }
    if let Some(scopes) = env_opt("TUNESTATS_SCOPES") {
        config.auth.scopes = parse_scopes(&scopes);
    }
    if let Some(url) = env_opt("TUNESTATS_AUTHORIZE_URL") {
        config.auth.authorization_endpoint = url;
    }
    if let Some(url) = env_opt("TUNESTATS_TOKEN_URL") {
        config.auth.token_endpoint = url;
    }
    if let Some(url) = env_opt("TUNESTATS_API_BASE_URL") {
        config.api.base_url = url;
    }
    if let Some(secs) = env_opt("TUNESTATS_REQUEST_TIMEOUT_SECS") {
        let secs = secs
            .parse::<u64>()
            .map_err(|e| TuneStatsError::Config(format!("Invalid request timeout: {e}")))?;
        config.auth.request_timeout_secs = secs;
        config.api.timeout_secs = secs;
    }
    if let Some(backend) = env_opt("TUNESTATS_STORAGE_BACKEND") {
        config.storage.backend = backend.parse()?;
    }
    if let Some(path) = env_opt("TUNESTATS_STORAGE_PATH") {
        config.storage.path = Some(path);
    }
    if let Some(namespace) = env_opt("TUNESTATS_STORAGE_NAMESPACE") {
        config.storage.namespace = namespace;
    }
    if let Some(level) = env_opt("TUNESTATS_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("TUNESTATS_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TuneStatsError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing or fail validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TuneStatsError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TuneStatsError::Config(
                "No config file found and TUNESTATS_CLIENT_ID is not set".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TuneStatsError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TuneStatsError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TuneStatsError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TuneStatsError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("tunestats.toml"),
            cwd.join("config").join("tunestats.toml"),
            cwd.join("tunestats.json"),
        ]);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "tunestats") {
        candidates.push(dirs.config_dir().join("config.toml"));
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Split a scope list on whitespace and commas.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `TuneStatsError::Config` if the variable is not set or empty.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        TuneStatsError::Config(format!("Missing required environment variable: {key}"))
    })
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use tempfile::NamedTempFile;
    use tunestats_domain::StorageBackendKind;

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 12] = [
        "TUNESTATS_CLIENT_ID",
        "TUNESTATS_REDIRECT_URI",
        "TUNESTATS_SCOPES",
        "TUNESTATS_AUTHORIZE_URL",
        "TUNESTATS_TOKEN_URL",
        "TUNESTATS_API_BASE_URL",
        "TUNESTATS_REQUEST_TIMEOUT_SECS",
        "TUNESTATS_STORAGE_BACKEND",
        "TUNESTATS_STORAGE_PATH",
        "TUNESTATS_STORAGE_NAMESPACE",
        "TUNESTATS_LOG_LEVEL",
        "TUNESTATS_LOG_JSON",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_TS_BOOL_TRUE", "yes");
        std::env::set_var("TEST_TS_BOOL_UPPER", "TRUE");
        std::env::set_var("TEST_TS_BOOL_FALSE", "off");
        std::env::remove_var("TEST_TS_BOOL_MISSING");

        assert!(env_bool("TEST_TS_BOOL_TRUE", false));
        assert!(env_bool("TEST_TS_BOOL_UPPER", false));
        assert!(!env_bool("TEST_TS_BOOL_FALSE", true));
        assert!(env_bool("TEST_TS_BOOL_MISSING", true));

        std::env::remove_var("TEST_TS_BOOL_TRUE");
        std::env::remove_var("TEST_TS_BOOL_UPPER");
        std::env::remove_var("TEST_TS_BOOL_FALSE");
    }

    #[test]
    fn test_load_from_env_minimal() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("TUNESTATS_CLIENT_ID", "abc");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.auth.client_id, "abc");
        assert_eq!(config.auth.redirect_uri, "http://127.0.0.1:8888/callback");
        assert_eq!(
            config.auth.scopes,
            vec!["user-read-private", "user-read-email", "user-top-read"]
        );
        assert_eq!(config.storage.backend, StorageBackendKind::File);

        clear_env();
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("TUNESTATS_CLIENT_ID", "abc");
        std::env::set_var("TUNESTATS_REDIRECT_URI", "http://localhost:9000/cb");
        std::env::set_var("TUNESTATS_SCOPES", "user-top-read, user-read-email");
        std::env::set_var("TUNESTATS_TOKEN_URL", "http://127.0.0.1:1234/token");
        std::env::set_var("TUNESTATS_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("TUNESTATS_STORAGE_BACKEND", "memory");
        std::env::set_var("TUNESTATS_STORAGE_NAMESPACE", "test-ns");
        std::env::set_var("TUNESTATS_LOG_LEVEL", "debug");
        std::env::set_var("TUNESTATS_LOG_JSON", "1");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.auth.redirect_uri, "http://localhost:9000/cb");
        assert_eq!(config.auth.scopes, vec!["user-top-read", "user-read-email"]);
        assert_eq!(config.auth.token_endpoint, "http://127.0.0.1:1234/token");
        assert_eq!(config.auth.request_timeout_secs, 5);
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.storage.backend, StorageBackendKind::Memory);
        assert_eq!(config.storage.namespace, "test-ns");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_client_id() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, TuneStatsError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("TUNESTATS_CLIENT_ID", "abc");

        std::env::set_var("TUNESTATS_REQUEST_TIMEOUT_SECS", "soon");
        assert!(matches!(load_from_env(), Err(TuneStatsError::Config(_))));

        std::env::set_var("TUNESTATS_REQUEST_TIMEOUT_SECS", "0");
        assert!(matches!(load_from_env(), Err(TuneStatsError::Config(_))));

        std::env::remove_var("TUNESTATS_REQUEST_TIMEOUT_SECS");
        std::env::set_var("TUNESTATS_REDIRECT_URI", "callback");
        assert!(matches!(load_from_env(), Err(TuneStatsError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml() {
        let (_temp, path) = temp_config(
            r#"
[auth]
client_id = "from-file"
scopes = ["user-top-read"]

[storage]
backend = "keychain"
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("config from TOML");
        assert_eq!(config.auth.client_id, "from-file");
        assert_eq!(config.auth.scopes, vec!["user-top-read"]);
        assert_eq!(config.storage.backend, StorageBackendKind::Keychain);
        assert_eq!(config.api.base_url, "https://api.spotify.com/v1");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let (_temp, path) = temp_config(
            r#"{ "auth": { "client_id": "json-id" }, "logging": { "json": true } }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("config from JSON");
        assert_eq!(config.auth.client_id, "json-id");
        assert!(config.logging.json);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_rejects_empty_client_id() {
        let (_temp, path) = temp_config("[auth]\nclient_id = \"\"\n", "toml");

        assert!(matches!(load_from_file(Some(path.clone())), Err(TuneStatsError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/tunestats.toml")));
        assert!(matches!(result, Err(TuneStatsError::Config(_))));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("auth: {}", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_parse_scopes() {
        assert_eq!(parse_scopes("a b,c ,, d"), vec!["a", "b", "c", "d"]);
        assert!(parse_scopes("  ").is_empty());
    }
}
