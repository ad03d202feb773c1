//! Authorization request redirect
//!
//! Starts a login attempt: a fresh PKCE pair, the verifier parked in the
//! store's single slot, and the user agent sent to the provider's
//! authorization page.

use std::sync::Arc;

use tracing::info;
use url::Url;

use super::error::AuthError;
use super::pkce::PKCEChallenge;
use super::store::TokenStore;
use super::traits::Navigator;
use super::types::OAuthConfig;

/// Builds and issues authorization requests
#[derive(Clone)]
pub struct AuthorizationRedirector {
    config: OAuthConfig,
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
}

impl AuthorizationRedirector {
    pub fn new(config: OAuthConfig, store: TokenStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { config, store, navigator }
    }

    /// Begin a new authorization attempt.
    ///
    /// Any earlier pending verifier is overwritten, so only the latest
    /// attempt can complete.
    ///
    /// # Errors
    /// - `RandomnessUnavailable` / `InvalidVerifierLength` from PKCE generation
    /// - `Storage` if the verifier cannot be persisted (nothing is opened then)
    /// - `Navigation` if the navigator fails
    pub async fn begin_authorization(&self) -> Result<(), AuthError> {
        let pkce = PKCEChallenge::generate(self.config.verifier_length)?;
        self.store.save_verifier(&pkce.code_verifier).await?;

        let url = self.authorization_url(&pkce)?;
        info!(endpoint = %self.config.authorization_endpoint, "Redirecting to authorization page");
        self.navigator.navigate(&url)
    }

    /// Authorization URL carrying `pkce`'s challenge.
    ///
    /// # Errors
    /// `AuthError::Config` if the authorization endpoint is not a valid URL.
    pub fn authorization_url(&self, pkce: &PKCEChallenge) -> Result<Url, AuthError> {
        let scope = self.config.scope_string();
        Url::parse_with_params(
            &self.config.authorization_endpoint,
            [
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("code_challenge_method", pkce.challenge_method()),
                ("code_challenge", pkce.code_challenge.as_str()),
            ],
        )
        .map_err(|e| {
            AuthError::Config(format!(
                "invalid authorization endpoint {}: {e}",
                self.config.authorization_endpoint
            ))
        })
    }
}

impl std::fmt::Debug for AuthorizationRedirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRedirector")
            .field("authorization_endpoint", &self.config.authorization_endpoint)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
