//! Mock implementations of the auth seams

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tunestats_domain::UserProfile;
use url::Url;

use crate::auth::{AuthError, Navigator, ProfileSource, TokenExchanger, TokenPair};

/// Scripted [`TokenExchanger`]
///
/// Responses are consumed in the order they were queued. An exhausted queue
/// answers with a 500 from the matching grant.
#[derive(Debug, Default)]
pub struct MockTokenExchanger {
    exchange_responses: Mutex<VecDeque<Result<TokenPair, AuthError>>>,
    refresh_responses: Mutex<VecDeque<Result<TokenPair, AuthError>>>,
    exchange_delay: Option<Duration>,
    refresh_delay: Option<Duration>,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    codes_seen: Mutex<Vec<String>>,
    refresh_tokens_seen: Mutex<Vec<Option<String>>>,
}

impl MockTokenExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next code exchange.
    #[must_use]
    pub fn with_exchange(self, response: Result<TokenPair, AuthError>) -> Self {
        self.exchange_responses.lock().push_back(response);
        self
    }

    /// Queue a response for the next refresh.
    #[must_use]
    pub fn with_refresh(self, response: Result<TokenPair, AuthError>) -> Self {
        self.refresh_responses.lock().push_back(response);
        self
    }

    /// Hold every grant for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.exchange_delay = Some(delay);
        self.refresh_delay = Some(delay);
        self
    }

    /// Hold only refresh grants; code exchanges answer at once.
    #[must_use]
    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = Some(delay);
        self
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn codes_seen(&self) -> Vec<String> {
        self.codes_seen.lock().clone()
    }

    pub fn refresh_tokens_seen(&self) -> Vec<Option<String>> {
        self.refresh_tokens_seen.lock().clone()
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TokenExchanger for MockTokenExchanger {
    async fn exchange_code_for_tokens(&self, code: &str) -> Result<TokenPair, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.codes_seen.lock().push(code.to_string());
        Self::pause(self.exchange_delay).await;

        let next = self.exchange_responses.lock().pop_front();
        next.unwrap_or(Err(AuthError::TokenExchangeFailed { status: 500, error: None }))
    }

    async fn refresh_tokens(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen.lock().push(refresh_token.map(str::to_string));
        Self::pause(self.refresh_delay).await;

        if refresh_token.map_or(true, str::is_empty) {
            return Err(AuthError::NoRefreshToken);
        }
        let next = self.refresh_responses.lock().pop_front();
        next.unwrap_or(Err(AuthError::RefreshFailed { status: 500, error: None }))
    }
}

/// [`Navigator`] that records URLs instead of opening them
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<Url>>,
    failure: Option<String>,
}

impl RecordingNavigator {
    /// Navigator whose every navigation fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self { urls: Mutex::default(), failure: Some(message.into()) }
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.urls.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) -> Result<(), AuthError> {
        if let Some(message) = &self.failure {
            return Err(AuthError::Navigation(message.clone()));
        }
        self.urls.lock().push(url.clone());
        Ok(())
    }
}

/// [`ProfileSource`] that accepts a single access token
#[derive(Debug)]
pub struct MockProfileSource {
    valid_token: Mutex<String>,
    profile: UserProfile,
    calls: AtomicUsize,
}

impl MockProfileSource {
    /// Returns a profile with id `user_id` for `token`, 401 for anything else.
    pub fn accepting(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            valid_token: Mutex::new(token.into()),
            profile: UserProfile {
                display_name: Some(format!("{user_id} (test)")),
                id: user_id,
                email: None,
                country: None,
                product: None,
                images: Vec::new(),
                followers: tunestats_domain::Followers::default(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// Rotate the accepted token, e.g. to simulate expiry.
    pub fn accept_only(&self, token: impl Into<String>) {
        *self.valid_token.lock() = token.into();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileSource for MockProfileSource {
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.valid_token.lock() == access_token {
            Ok(self.profile.clone())
        } else {
            Err(AuthError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exchanger_replays_queue_then_fails() {
        let exchanger = MockTokenExchanger::new().with_refresh(Ok(TokenPair::new("AT2", None)));

        assert!(exchanger.refresh_tokens(Some("RT1")).await.is_ok());
        assert_eq!(
            exchanger.refresh_tokens(Some("RT1")).await.unwrap_err(),
            AuthError::RefreshFailed { status: 500, error: None }
        );
        assert_eq!(exchanger.refresh_calls(), 2);
    }

    #[tokio::test]
    async fn test_exchanger_without_refresh_token() {
        let exchanger = MockTokenExchanger::new().with_refresh(Ok(TokenPair::new("AT2", None)));

        assert_eq!(exchanger.refresh_tokens(None).await.unwrap_err(), AuthError::NoRefreshToken);
        assert_eq!(exchanger.refresh_tokens_seen(), vec![None]);
    }

    #[tokio::test]
    async fn test_profile_source_rejects_other_tokens() {
        let source = MockProfileSource::accepting("AT1", "user");
        assert!(source.fetch_profile("AT1").await.is_ok());

        source.accept_only("AT2");
        assert_eq!(source.fetch_profile("AT1").await.unwrap_err(), AuthError::Unauthorized);
        assert_eq!(source.calls(), 2);
    }
}
