//! OAuth 2.0 types and structures
//!
//! Token pair, token endpoint response and client configuration.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tunestats_domain::config::AuthSettings;
use tunestats_domain::constants::{
    DEFAULT_AUTHORIZATION_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOKEN_ENDPOINT,
};

use super::pkce::DEFAULT_VERIFIER_LENGTH;

/// Access and refresh token held by the current session
///
/// Persisted as a single record so the access and refresh fields are always
/// written together. `Debug` redacts both tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer credential for the resource API
    pub access_token: String,

    /// Long-lived credential; `None` when the provider issued none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiration (UTC), computed from `expires_in` at receipt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token, expires_at: None }
    }

    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check if the access token is expired or will expire within the given
    /// threshold. Pairs without an expiry are never considered expired.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            Utc::now() + chrono::Duration::seconds(threshold_seconds) >= expires_at
        })
    }

    /// Seconds until expiry, `None` when the expiry is unknown.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }

    /// Whether the session can be renewed without user interaction.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response (RFC 6749 §5.1)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a pair, keeping `previous_refresh` when the response does
    /// not rotate the refresh token.
    #[must_use]
    pub fn into_pair(self, previous_refresh: Option<&str>) -> TokenPair {
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_owned));
        let expires_at = self
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        TokenPair { access_token: self.access_token, refresh_token, expires_at }
    }
}

/// OAuth error response from the authorization server (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Public-client OAuth configuration
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,

    /// Where the provider sends the user back with `?code=`
    pub redirect_uri: String,

    pub scopes: Vec<String>,

    pub authorization_endpoint: String,

    pub token_endpoint: String,

    /// PKCE verifier length, 43..=128
    pub verifier_length: usize,

    /// Upper bound for one token exchange or refresh call
    pub request_timeout: Duration,
}

impl OAuthConfig {
    /// Create a configuration against the default provider endpoints.
    #[must_use]
    pub fn new(client_id: String, redirect_uri: String, scopes: Vec<String>) -> Self {
        Self {
            client_id,
            redirect_uri,
            scopes,
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            verifier_length: DEFAULT_VERIFIER_LENGTH,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Point the client at different provider endpoints.
    #[must_use]
    pub fn with_endpoints(
        mut self,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
    ) -> Self {
        self.authorization_endpoint = authorization_endpoint.into();
        self.token_endpoint = token_endpoint.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_verifier_length(mut self, length: usize) -> Self {
        self.verifier_length = length;
        self
    }

    /// Get scopes as space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

impl From<&AuthSettings> for OAuthConfig {
    fn from(settings: &AuthSettings) -> Self {
        Self::new(settings.client_id.clone(), settings.redirect_uri.clone(), settings.scopes.clone())
            .with_endpoints(&settings.authorization_endpoint, &settings.token_endpoint)
            .with_request_timeout(Duration::from_secs(settings.request_timeout_secs))
    }
}
