//! OAuth 2.0 token endpoint client
//!
//! Handles the two grant types a public PKCE client uses:
//! - `authorization_code` with the stored code verifier
//! - `refresh_token`
//!
//! Every request is form-encoded and bounded by the configured timeout.
//! Nothing here retries; the session guard decides what happens next.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::store::TokenStore;
use super::traits::TokenExchanger;
use super::types::{OAuthConfig, OAuthErrorBody, TokenPair, TokenResponse};

/// Token endpoint client
///
/// Reads and clears the pending PKCE verifier through the shared
/// [`TokenStore`].
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
    store: TokenStore,
}

impl OAuthClient {
    /// Create a new client for `config`, using `store` for the verifier.
    ///
    /// # Examples
    /// ```
    /// use tunestats_common::auth::{OAuthClient, OAuthConfig, TokenStore};
    ///
    /// let config = OAuthConfig::new(
    ///     "client_id".to_string(),
    ///     "http://127.0.0.1:8888/callback".to_string(),
    ///     vec!["user-top-read".to_string()],
    /// );
    /// let client = OAuthClient::new(config, TokenStore::in_memory("docs"));
    /// ```
    #[must_use]
    pub fn new(config: OAuthConfig, store: TokenStore) -> Self {
        let http = Client::builder()
            .user_agent(concat!("tunestats/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_http_client(config, store, http)
    }

    /// Create a client sharing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(config: OAuthConfig, store: TokenStore, http: Client) -> Self {
        Self { config, http, store }
    }

    /// Get a reference to the OAuth configuration
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange authorization code for tokens
    ///
    /// # Errors
    /// See [`TokenExchanger::exchange_code_for_tokens`].
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenPair, AuthError> {
        let verifier = self.store.load_verifier().await?.ok_or(AuthError::MissingVerifier)?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];
        let (status, body) = self.token_request(&params).await?;

        if !status.is_success() {
            let error = provider_error(&body);
            warn!(status = status.as_u16(), error = ?error, "Authorization code exchange rejected");
            return Err(AuthError::TokenExchangeFailed { status: status.as_u16(), error });
        }

        let response = parse_token_response(&body)?;

        // The verifier is single-use; a stale one must never be replayed.
        if let Err(e) = self.store.clear_verifier().await {
            warn!(error = %e, "Failed to clear consumed PKCE verifier");
        }

        info!(rotated = response.refresh_token.is_some(), "Authorization code exchanged for tokens");
        Ok(response.into_pair(None))
    }

    /// Refresh access token using refresh token
    ///
    /// # Errors
    /// See [`TokenExchanger::refresh_tokens`].
    pub async fn refresh_tokens(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        let refresh_token = refresh_token.filter(|t| !t.is_empty()).ok_or(AuthError::NoRefreshToken)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        let (status, body) = self.token_request(&params).await?;

        if !status.is_success() {
            let error = provider_error(&body);
            warn!(status = status.as_u16(), error = ?error, "Token refresh rejected");
            return Err(AuthError::RefreshFailed { status: status.as_u16(), error });
        }

        let response = parse_token_response(&body)?;
        debug!(rotated = response.refresh_token.is_some(), "Access token refreshed");
        Ok(response.into_pair(Some(refresh_token)))
    }

    /// POST a form to the token endpoint and read the whole body, bounded by
    /// the request timeout.
    async fn token_request(&self, params: &[(&str, &str)]) -> Result<(StatusCode, String), AuthError> {
        let limit = self.config.request_timeout;
        let exchange = async {
            let response = self
                .http
                .post(&self.config.token_endpoint)
                .form(params)
                .send()
                .await
                .map_err(|e| transport_error(&e, limit))?;
            let status = response.status();
            let body = response.text().await.map_err(|e| transport_error(&e, limit))?;
            Ok::<_, AuthError>((status, body))
        };

        match tokio::time::timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?limit, endpoint = %self.config.token_endpoint, "Token endpoint timed out");
                Err(AuthError::Timeout(limit))
            }
        }
    }
}

fn transport_error(err: &reqwest::Error, limit: Duration) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout(limit)
    } else {
        AuthError::Network(err.to_string())
    }
}

fn provider_error(body: &str) -> Option<String> {
    serde_json::from_str::<OAuthErrorBody>(body).ok().map(|e| e.to_string())
}

fn parse_token_response(body: &str) -> Result<TokenResponse, AuthError> {
    let response: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
    if response.access_token.is_empty() {
        return Err(AuthError::InvalidResponse("empty access_token".to_string()));
    }
    Ok(response)
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenPair, AuthError> {
        self.exchange_code_for_tokens(code).await
    }

    async fn refresh_tokens(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        self.refresh_tokens(refresh_token).await
    }
}
