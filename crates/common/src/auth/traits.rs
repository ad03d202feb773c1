//! Traits at the seams of the credential lifecycle
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (token endpoint, browser, key/value storage,
//! resource API).

use async_trait::async_trait;
use tunestats_domain::UserProfile;
use url::Url;

use super::error::{AuthError, StoreError};
use super::types::TokenPair;

/// Trait for token endpoint operations
///
/// Implemented by [`OAuthClient`](super::client::OAuthClient) over HTTP and by
/// mocks in tests.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange authorization code for tokens
    ///
    /// Uses the verifier stored by the authorization redirect and clears it
    /// on success.
    ///
    /// # Errors
    /// - `MissingVerifier` if no verifier is stored
    /// - `TokenExchangeFailed` on a non-2xx response
    /// - `Timeout` / `Network` on transport failures
    async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenPair, AuthError>;

    /// Obtain a new access token with a refresh token
    ///
    /// The returned pair carries the rotated refresh token if the provider
    /// issued one, otherwise `refresh_token` itself.
    ///
    /// # Errors
    /// - `NoRefreshToken` if `refresh_token` is `None` or empty
    /// - `RefreshFailed` on a non-2xx response
    /// - `Timeout` / `Network` on transport failures
    async fn refresh_tokens(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError>;
}

/// Sends the user agent to the authorization page
///
/// For a browser-hosted client this is a full-page redirect; for the CLI it
/// opens the system browser.
pub trait Navigator: Send + Sync {
    /// # Errors
    /// Returns `AuthError::Navigation` if the page could not be opened.
    fn navigate(&self, url: &Url) -> Result<(), AuthError>;
}

/// Durable key/value storage behind the [`TokenStore`](super::store::TokenStore)
///
/// Values are opaque strings. A backend must survive a process restart unless
/// it is explicitly ephemeral.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Fetches the signed-in user's profile with a given access token
///
/// Used by [`SessionGuard::validate_session`](super::session::SessionGuard::validate_session).
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// # Errors
    /// Must return `AuthError::Unauthorized` for a 401 so the guard can
    /// refresh; other failures map to their own variants.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError>;
}
