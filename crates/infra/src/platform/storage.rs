//! Token store construction from configuration
//!
//! The backend is chosen once, here; everything downstream only sees a
//! [`TokenStore`].

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use tracing::debug;
use tunestats_common::auth::{FileBackend, MemoryBackend, StorageBackend, TokenStore};
use tunestats_domain::constants::TOKEN_FILE_NAME;
use tunestats_domain::{Result, StorageBackendKind, StorageSettings, TuneStatsError};

/// Per-user data directory location of the session file.
pub fn default_storage_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tunestats").map(|dirs| dirs.data_dir().join(TOKEN_FILE_NAME))
}

/// Build the configured [`TokenStore`].
///
/// # Errors
/// `TuneStatsError::Config` if the file backend has no usable path, or the
/// keychain backend is selected in a build without the `keychain` feature.
pub fn open_token_store(settings: &StorageSettings) -> Result<TokenStore> {
    let backend: Arc<dyn StorageBackend> = match settings.backend {
        StorageBackendKind::Memory => Arc::new(MemoryBackend::default()),
        StorageBackendKind::File => {
            let path = match &settings.path {
                Some(path) => PathBuf::from(path),
                None => default_storage_path().ok_or_else(|| {
                    TuneStatsError::Config(
                        "no home directory found; set storage.path for the file backend".into(),
                    )
                })?,
            };
            debug!(path = %path.display(), "Using file token storage");
            Arc::new(FileBackend::new(path))
        }
        StorageBackendKind::Keychain => keychain_backend()?,
    };

    Ok(TokenStore::new(backend, settings.namespace.clone()))
}

#[cfg(feature = "keychain")]
fn keychain_backend() -> Result<Arc<dyn StorageBackend>> {
    Ok(Arc::new(tunestats_common::auth::KeychainBackend::default()))
}

#[cfg(not(feature = "keychain"))]
fn keychain_backend() -> Result<Arc<dyn StorageBackend>> {
    Err(TuneStatsError::Config(
        "keychain storage is not available in this build; enable the `keychain` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use tunestats_common::auth::TokenPair;

    use super::*;

    #[tokio::test]
    async fn file_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");
        let settings = StorageSettings {
            backend: StorageBackendKind::File,
            path: Some(path.to_string_lossy().into_owned()),
            namespace: "cli".into(),
        };

        let store = open_token_store(&settings).unwrap();
        assert_eq!(store.backend_name(), "file");
        assert_eq!(store.namespace(), "cli");

        store.persist(&TokenPair::new("AT1", None)).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn memory_backend_is_selectable() {
        let settings = StorageSettings { backend: StorageBackendKind::Memory, ..StorageSettings::default() };
        assert_eq!(open_token_store(&settings).unwrap().backend_name(), "memory");
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_without_feature_is_config_error() {
        let settings =
            StorageSettings { backend: StorageBackendKind::Keychain, ..StorageSettings::default() };
        assert!(matches!(open_token_store(&settings), Err(TuneStatsError::Config(_))));
    }
}
