//! OS keychain storage backend
//!
//! Each store key becomes one credential entry under a fixed service name:
//! macOS Keychain, Windows Credential Manager or the Linux Secret Service,
//! depending on the platform features `keyring` is built with.

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::error::StoreError;
use super::traits::StorageBackend;

/// Service name credential entries are filed under
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "TuneStats";

/// [`StorageBackend`] over the platform keychain
pub struct KeychainBackend {
    service_name: String,
}

impl KeychainBackend {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            StoreError::Backend(format!("failed to open keychain entry {key}: {e}"))
        })
    }
}

impl Default for KeychainBackend {
    fn default() -> Self {
        Self::new(DEFAULT_KEYCHAIN_SERVICE)
    }
}

#[async_trait]
impl StorageBackend for KeychainBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("failed to read {key}: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        debug!(service = %self.service_name, key = %key, "Writing keychain entry");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StoreError::Backend(format!("failed to write {key}: {e}")))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service_name, key = %key, "Keychain entry removed");
                Ok(())
            }
            Err(e) => Err(StoreError::Backend(format!("failed to delete {key}: {e}"))),
        }
    }

    fn name(&self) -> &'static str {
        "keychain"
    }
}
