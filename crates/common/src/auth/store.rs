//! Durable session storage
//!
//! [`TokenStore`] is the only place credentials are written. It namespaces
//! its keys, serializes the token pair as one record and guards writes with
//! an async `RwLock` so a reader never observes a half-cleared session.
//!
//! Backends:
//! - [`MemoryBackend`]: process-local, for tests and throwaway sessions
//! - [`FileBackend`]: JSON document, replaced atomically, mode 0600 on Unix
//! - `KeychainBackend`: OS keychain (`platform` feature)

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::StoreError;
use super::traits::StorageBackend;
use super::types::TokenPair;

const VERIFIER_SLOT: &str = "verifier";
const TOKENS_SLOT: &str = "tokens";
const PROFILE_SLOT: &str = "profile";

/// Namespaced credential storage over a pluggable backend
///
/// Cheap to clone; clones share the backend and the lock.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn StorageBackend>,
    namespace: Arc<str>,
    lock: Arc<RwLock<()>>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: Arc::from(namespace.into()),
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Store backed by process memory only.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryBackend::default()), namespace)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn key(&self, slot: &str) -> String {
        format!("{}.{slot}", self.namespace)
    }

    /// Replace the stored token pair.
    ///
    /// # Errors
    /// Returns the backend's error; the previous pair is then left in place.
    pub async fn persist(&self, pair: &TokenPair) -> Result<(), StoreError> {
        let record = serde_json::to_string(pair)?;
        let _guard = self.lock.write().await;
        self.backend.set(&self.key(TOKENS_SLOT), &record).await?;
        debug!(backend = self.backend.name(), namespace = %self.namespace, "Tokens persisted");
        Ok(())
    }

    /// Read the stored token pair, `None` if the session is empty.
    ///
    /// # Errors
    /// `StoreError::Serialization` if the record is corrupt.
    pub async fn load(&self) -> Result<Option<TokenPair>, StoreError> {
        let _guard = self.lock.read().await;
        match self.backend.get(&self.key(TOKENS_SLOT)).await? {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    /// Remove tokens, pending verifier and cached profile. Idempotent.
    ///
    /// Every slot is attempted; the first failure is returned afterwards.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut first_error = None;
        for slot in [TOKENS_SLOT, VERIFIER_SLOT, PROFILE_SLOT] {
            if let Err(e) = self.backend.remove(&self.key(slot)).await {
                warn!(slot, error = %e, "Failed to clear session slot");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!(namespace = %self.namespace, "Session storage cleared");
                Ok(())
            }
        }
    }

    /// Store the verifier of the authorization attempt in flight, replacing
    /// any earlier one.
    pub async fn save_verifier(&self, verifier: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        self.backend.set(&self.key(VERIFIER_SLOT), verifier).await
    }

    /// Pending verifier; an empty value counts as absent.
    pub async fn load_verifier(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.backend.get(&self.key(VERIFIER_SLOT)).await?.filter(|v| !v.is_empty()))
    }

    pub async fn clear_verifier(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        self.backend.remove(&self.key(VERIFIER_SLOT)).await
    }

    pub async fn persist_profile<T: Serialize + Sync>(&self, profile: &T) -> Result<(), StoreError> {
        let record = serde_json::to_string(profile)?;
        let _guard = self.lock.write().await;
        self.backend.set(&self.key(PROFILE_SLOT), &record).await
    }

    pub async fn clear_profile(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        self.backend.remove(&self.key(PROFILE_SLOT)).await
    }

    pub async fn load_profile<T: DeserializeOwned>(&self) -> Result<Option<T>, StoreError> {
        let _guard = self.lock.read().await;
        match self.backend.get(&self.key(PROFILE_SLOT)).await? {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("backend", &self.backend.name())
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Number of stored keys (test helper)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// JSON file backend
///
/// The whole document is rewritten to a sibling temp file and renamed over
/// the existing one, so a crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Document to modify. An unparsable file is replaced wholesale; the
    /// flag tells the caller it must be rewritten even if nothing changes.
    async fn document_for_update(&self) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match self.read_document().await {
            Ok(document) => Ok((document, false)),
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Session file is unreadable; replacing it");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, serde_json::to_vec_pretty(document)?).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_document().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let (mut document, _) = self.document_for_update().await?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let (mut document, damaged) = self.document_for_update().await?;
        if document.remove(key).is_some() || damaged {
            self.write_document(&document).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
