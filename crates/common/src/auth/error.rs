//! Error taxonomy for the credential lifecycle.
//!
//! `AuthError` is `Clone` because one refresh result is handed to every
//! caller that was waiting on it.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while obtaining, storing or refreshing credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No PKCE verifier is stored for the returning authorization code.
    #[error("no PKCE verifier stored; restart authorization")]
    MissingVerifier,

    /// The token endpoint rejected the authorization code.
    #[error("token exchange failed with status {status}{}", fmt_provider_error(.error))]
    TokenExchangeFailed { status: u16, error: Option<String> },

    /// A refresh was requested but the session holds no refresh token.
    #[error("no refresh token available; full authorization required")]
    NoRefreshToken,

    /// The token endpoint rejected the refresh token.
    #[error("token refresh failed with status {status}{}", fmt_provider_error(.error))]
    RefreshFailed { status: u16, error: Option<String> },

    /// A protected call was rejected with 401.
    #[error("protected call rejected: unauthorized")]
    Unauthorized,

    /// No session exists; the user has to log in.
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("randomness source unavailable: {0}")]
    RandomnessUnavailable(String),

    #[error("PKCE verifier length {0} outside 43..=128")]
    InvalidVerifierLength(usize),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid token endpoint response: {0}")]
    InvalidResponse(String),

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("failed to open authorization page: {0}")]
    Navigation(String),

    #[error("OAuth configuration error: {0}")]
    Config(String),
}

fn fmt_provider_error(error: &Option<String>) -> String {
    error.as_deref().map(|e| format!(" ({e})")).unwrap_or_default()
}

impl AuthError {
    /// True when the session is gone and only a fresh login can recover it.
    #[must_use]
    pub const fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Self::MissingVerifier
                | Self::TokenExchangeFailed { .. }
                | Self::NoRefreshToken
                | Self::RefreshFailed { .. }
                | Self::AuthenticationRequired
        )
    }

    /// True for transient transport failures worth retrying by the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

/// Lets the session guard recognise a 401 in a caller's own error type.
pub trait UnauthorizedSignal {
    /// Whether this error is the resource API rejecting the access token.
    fn is_unauthorized(&self) -> bool;
}

impl UnauthorizedSignal for AuthError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Errors raised by a `StorageBackend`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("stored value is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<AuthError> for tunestats_domain::TuneStatsError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Network(_) | AuthError::Timeout(_) => Self::Network(err.to_string()),
            AuthError::Storage(_) => Self::Storage(err.to_string()),
            AuthError::Config(_) | AuthError::InvalidVerifierLength(_) => Self::Config(err.to_string()),
            AuthError::RandomnessUnavailable(_) => Self::Internal(err.to_string()),
            _ => Self::Auth(err.to_string()),
        }
    }
}
