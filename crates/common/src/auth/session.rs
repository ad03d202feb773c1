//! Session guard
//!
//! Owns the in-memory session (token pair, cached profile, derived state)
//! and orchestrates login, logout and recovery from expired access tokens.
//!
//! ```text
//!  Unauthenticated ──login()──► Authenticating ──code exchanged──► Authenticated
//!        ▲                            │                               │
//!        │                      exchange failed                  401 from a
//!        ├────────────────────────────┘                        protected call
//!        │                                                            ▼
//!        └──────────── refresh failed / logout() ◄──────────────── Expired
//!                                                     refresh ok ──► Authenticated
//! ```
//!
//! Refresh is single-flight: the first caller to see a 401 parks a shared
//! future in `refresh_in_flight`; later callers await that same future.
//!
//! Every login and logout starts a new session generation. A refresh only
//! applies its result to the generation it was started for, so a refresh
//! that outlives its session cannot resurrect it.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use tunestats_domain::UserProfile;

use super::client::OAuthClient;
use super::error::{AuthError, UnauthorizedSignal};
use super::redirector::AuthorizationRedirector;
use super::store::TokenStore;
use super::traits::{Navigator, ProfileSource, TokenExchanger};
use super::types::{OAuthConfig, TokenPair};

/// Derived authentication state of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No tokens are held
    Unauthenticated,
    /// An authorization attempt is under way
    Authenticating,
    /// Tokens are held and assumed valid
    Authenticated,
    /// The resource API rejected the access token; a refresh is running
    Expired,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// Result of [`SessionGuard::login`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The user agent was sent to the authorization page; complete the login
    /// with the returned code.
    Redirected,
    /// The authorization code was exchanged and the session is live.
    Authenticated,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenPair, AuthError>>>;

/// Session state machine and single owner of the live token pair
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: TokenStore,
    redirector: AuthorizationRedirector,
    exchanger: Arc<dyn TokenExchanger>,
    tokens: RwLock<Option<TokenPair>>,
    /// Bumped by login and logout; only changed under the `tokens` write lock.
    generation: AtomicU64,
    profile: RwLock<Option<UserProfile>>,
    state: watch::Sender<SessionState>,
    refresh_in_flight: Mutex<Option<(u64, RefreshFuture)>>,
}

impl SessionGuard {
    /// Create a guard in the `Unauthenticated` state. Call
    /// [`initialize`](Self::initialize) to pick up a persisted session.
    pub fn new(
        store: TokenStore,
        redirector: AuthorizationRedirector,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            inner: Arc::new(SessionInner {
                store,
                redirector,
                exchanger,
                tokens: RwLock::new(None),
                generation: AtomicU64::new(0),
                profile: RwLock::new(None),
                state,
                refresh_in_flight: Mutex::new(None),
            }),
        }
    }

    /// Wire a guard against a real token endpoint.
    pub fn for_provider(config: OAuthConfig, store: TokenStore, navigator: Arc<dyn Navigator>) -> Self {
        let redirector = AuthorizationRedirector::new(config.clone(), store.clone(), navigator);
        let exchanger = Arc::new(OAuthClient::new(config, store.clone()));
        Self::new(store, redirector, exchanger)
    }

    /// Load the persisted session.
    ///
    /// The guard becomes `Authenticated` (optimistically; nothing is checked
    /// against the API yet) when an access token is stored. A corrupt record
    /// is discarded and the guard starts `Unauthenticated`.
    ///
    /// # Errors
    /// `AuthError::Storage` if the backend cannot be read or cleared.
    pub async fn initialize(&self) -> Result<SessionState, AuthError> {
        let inner = &self.inner;
        let stored = match inner.store.load().await {
            Ok(stored) => stored,
            Err(super::error::StoreError::Serialization(e)) => {
                warn!(error = %e, "Stored session is unreadable; discarding it");
                inner.store.clear().await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let state = match stored.filter(|pair| !pair.access_token.is_empty()) {
            Some(pair) => {
                let profile = inner.store.load_profile::<UserProfile>().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Cached profile is unreadable; ignoring it");
                    None
                });
                *inner.tokens.write().await = Some(pair);
                *inner.profile.write().await = profile;
                SessionState::Authenticated
            }
            None => SessionState::Unauthenticated,
        };

        inner.transition(state);
        info!(state = %state, backend = inner.store.backend_name(), "Session initialized");
        Ok(state)
    }

    /// Start or complete a login.
    ///
    /// Without a code the user agent is redirected to the authorization page
    /// and the guard stays `Authenticating` until the code comes back. With
    /// a code (the post-redirect request) it is exchanged directly. A failed
    /// exchange is not retried; the user has to start over.
    ///
    /// # Errors
    /// Redirect or exchange failures, see [`AuthError`].
    pub async fn login(&self, authorization_code: Option<&str>) -> Result<LoginOutcome, AuthError> {
        let inner = &self.inner;
        inner.transition(SessionState::Authenticating);

        let Some(code) = authorization_code.filter(|c| !c.is_empty()) else {
            return match inner.redirector.begin_authorization().await {
                Ok(()) => Ok(LoginOutcome::Redirected),
                Err(e) => {
                    warn!(error = %e, "Could not start authorization");
                    inner.settle().await;
                    Err(e)
                }
            };
        };

        let pair = match inner.exchanger.exchange_code_for_tokens(code).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Login failed; authorization must be retried");
                inner.settle().await;
                return Err(e);
            }
        };

        // Under the write lock a refresh of the previous session can neither
        // persist over these tokens nor apply its result afterwards.
        let mut tokens = inner.tokens.write().await;
        if let Err(e) = inner.store.persist(&pair).await {
            error!(error = %e, "Could not persist tokens after login");
            drop(tokens);
            inner.settle().await;
            return Err(e.into());
        }
        inner.generation.fetch_add(1, Ordering::SeqCst);
        *tokens = Some(pair);
        *inner.profile.write().await = None;
        if let Err(e) = inner.store.clear_profile().await {
            warn!(error = %e, "Could not drop the previous session's cached profile");
        }
        inner.transition(SessionState::Authenticated);
        drop(tokens);
        info!("Login completed");
        Ok(LoginOutcome::Authenticated)
    }

    /// End the session: tokens, pending verifier and cached profile are
    /// dropped from memory and storage. Safe to call in any state, any
    /// number of times.
    ///
    /// # Errors
    /// `AuthError::Storage` if the backend fails to delete; the in-memory
    /// session is gone regardless.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.end_session(None).await?;
        info!("Logged out");
        Ok(())
    }

    /// Run a protected call with the current access token.
    ///
    /// If the call reports unauthorized, the session is refreshed once and
    /// the call retried once with the new token. A second rejection is
    /// returned as-is. If the refresh fails the session is ended and the
    /// refresh error is returned.
    ///
    /// # Errors
    /// - `AuthError::AuthenticationRequired` (converted into `E`) without a
    ///   session
    /// - refresh failures converted into `E`
    /// - whatever `call` returns
    pub async fn authorized<T, E, F, Fut>(&self, call: F) -> Result<T, E>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AuthError> + UnauthorizedSignal,
    {
        let token = self.access_token().await.ok_or_else(|| E::from(AuthError::AuthenticationRequired))?;

        match call(token.clone()).await {
            Err(e) if e.is_unauthorized() => {}
            other => return other,
        }

        warn!("Protected call rejected the access token; refreshing session");
        let pair = self.recover(&token).await.map_err(E::from)?;

        let retried = call(pair.access_token).await;
        if retried.as_ref().is_err_and(UnauthorizedSignal::is_unauthorized) {
            warn!("Retried call rejected again with a fresh token; giving up");
        }
        retried
    }

    /// Fetch the user's profile through [`authorized`](Self::authorized) and
    /// cache it for the rest of the session.
    ///
    /// # Errors
    /// As for [`authorized`](Self::authorized).
    pub async fn validate_session(&self, source: &dyn ProfileSource) -> Result<UserProfile, AuthError> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let profile = self
            .authorized(|token| async move { source.fetch_profile(&token).await })
            .await?;

        let tokens = self.inner.tokens.read().await;
        if tokens.is_none() || self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!("Session changed while the profile was fetched; not caching it");
            return Err(AuthError::AuthenticationRequired);
        }
        *self.inner.profile.write().await = Some(profile.clone());
        if let Err(e) = self.inner.store.persist_profile(&profile).await {
            warn!(error = %e, "Could not cache profile");
        }
        drop(tokens);
        debug!(user = %profile.id, "Session validated");
        Ok(profile)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// True while a session is held, including while it is being refreshed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated | SessionState::Expired)
    }

    /// Cached profile; `None` until the first successful
    /// [`validate_session`](Self::validate_session).
    pub async fn user_profile(&self) -> Option<UserProfile> {
        self.inner.profile.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.tokens.read().await.as_ref().map(|pair| pair.access_token.clone())
    }

    /// Snapshot of the current token pair.
    pub async fn tokens(&self) -> Option<TokenPair> {
        self.inner.tokens.read().await.clone()
    }

    #[must_use]
    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Refresh after `failed_token` was rejected, joining a refresh that is
    /// already running.
    async fn recover(&self, failed_token: &str) -> Result<TokenPair, AuthError> {
        let refresh = {
            let mut slot = self.inner.refresh_in_flight.lock().await;
            let tokens = self.inner.tokens.read().await;
            let generation = self.inner.generation.load(Ordering::SeqCst);
            let joinable = slot
                .as_ref()
                .filter(|(started_for, f)| *started_for == generation && f.peek().is_none());

            if let Some((_, in_flight)) = joinable {
                debug!("Joining in-flight token refresh");
                in_flight.clone()
            } else {
                match tokens.as_ref() {
                    Some(pair) if pair.access_token != failed_token => {
                        debug!("Access token already rotated by a concurrent refresh");
                        return Ok(pair.clone());
                    }
                    Some(pair) => {
                        self.inner.transition(SessionState::Expired);
                        let refresh_token = pair.refresh_token.clone();
                        let refresh = Arc::clone(&self.inner)
                            .refresh(generation, refresh_token)
                            .boxed()
                            .shared();
                        *slot = Some((generation, refresh.clone()));
                        refresh
                    }
                    // The session ended while this call was in flight; report
                    // the refresh failure that ended it, if that is what happened.
                    None => {
                        return Err(slot
                            .as_ref()
                            .and_then(|(_, f)| f.peek())
                            .and_then(|result| result.clone().err())
                            .unwrap_or(AuthError::AuthenticationRequired));
                    }
                }
            }
        };

        refresh.await
    }
}

impl SessionInner {
    fn transition(&self, to: SessionState) {
        let from = self.state.send_replace(to);
        if from != to {
            debug!(from = %from, to = %to, "Session state transition");
        }
    }

    /// Fall back to the state implied by the tokens currently held.
    async fn settle(&self) {
        let state = if self.tokens.read().await.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        };
        self.transition(state);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Refresh the session of `generation`. The result is dropped if a login
    /// or logout happened meanwhile.
    async fn refresh(
        self: Arc<Self>,
        generation: u64,
        refresh_token: Option<String>,
    ) -> Result<TokenPair, AuthError> {
        info!("Refreshing access token");
        match self.exchanger.refresh_tokens(refresh_token.as_deref()).await {
            Ok(pair) => {
                let mut tokens = self.tokens.write().await;
                if !self.is_current(generation) {
                    info!("Session ended during refresh; discarding refreshed tokens");
                    return Err(AuthError::AuthenticationRequired);
                }
                if let Err(e) = self.store.persist(&pair).await {
                    error!(error = %e, "Refreshed tokens could not be persisted; keeping them in memory");
                }
                *tokens = Some(pair.clone());
                self.transition(SessionState::Authenticated);
                info!("Session recovered with a refreshed access token");
                Ok(pair)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; ending session");
                match self.end_session(Some(generation)).await {
                    Ok(true) => {}
                    Ok(false) => debug!("Session already replaced; nothing to end"),
                    Err(clear_err) => {
                        error!(error = %clear_err, "Stored session could not be cleared after refresh failure");
                    }
                }
                Err(e)
            }
        }
    }

    /// Drop tokens and profile from memory and storage. With `expected`, only
    /// if that generation is still current; returns whether it ended anything.
    async fn end_session(&self, expected: Option<u64>) -> Result<bool, AuthError> {
        let mut tokens = self.tokens.write().await;
        if expected.is_some_and(|generation| !self.is_current(generation)) {
            return Ok(false);
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        *tokens = None;
        *self.profile.write().await = None;
        let cleared = self.store.clear().await;
        self.transition(SessionState::Unauthenticated);
        drop(tokens);
        cleared.map(|()| true).map_err(AuthError::from)
    }
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGuard")
            .field("state", &self.state())
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::session.
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::testing::{MockProfileSource, MockTokenExchanger, RecordingNavigator};

    struct Harness {
        guard: SessionGuard,
        store: TokenStore,
        exchanger: Arc<MockTokenExchanger>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(exchanger: MockTokenExchanger) -> Harness {
        let store = TokenStore::in_memory("test");
        let navigator = Arc::new(RecordingNavigator::default());
        let config = OAuthConfig::new(
            "client".to_string(),
            "http://127.0.0.1:8888/callback".to_string(),
            vec!["user-top-read".to_string()],
        );
        let redirector = AuthorizationRedirector::new(config, store.clone(), navigator.clone());
        let exchanger = Arc::new(exchanger);
        let guard = SessionGuard::new(store.clone(), redirector, exchanger.clone());
        Harness { guard, store, exchanger, navigator }
    }

    fn guard_on(store: TokenStore) -> SessionGuard {
        let redirector = AuthorizationRedirector::new(
            OAuthConfig::new("c".into(), "http://127.0.0.1/cb".into(), vec![]),
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        SessionGuard::new(store, redirector, Arc::new(MockTokenExchanger::new()))
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(access, Some(refresh.to_string()))
    }

    async fn signed_in(exchanger: MockTokenExchanger) -> Harness {
        let h = harness(exchanger);
        h.store.persist(&pair("AT1", "RT1")).await.unwrap();
        assert_eq!(h.guard.initialize().await.unwrap(), SessionState::Authenticated);
        h
    }

    /// Protected call that accepts only `valid` and counts invocations.
    async fn protected(token: String, valid: &str, calls: &AtomicUsize) -> Result<String, AuthError> {
        calls.fetch_add(1, Ordering::SeqCst);
        if token == valid {
            Ok(format!("data for {token}"))
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn test_initialize_without_tokens_is_unauthenticated() {
        let h = harness(MockTokenExchanger::new());
        assert_eq!(h.guard.initialize().await.unwrap(), SessionState::Unauthenticated);
        assert!(!h.guard.is_authenticated());
        assert_eq!(h.guard.user_profile().await, None);
    }

    #[tokio::test]
    async fn test_initialize_discards_corrupt_record() {
        let backend = Arc::new(crate::auth::store::MemoryBackend::default());
        crate::auth::traits::StorageBackend::set(backend.as_ref(), "test.tokens", "garbage")
            .await
            .unwrap();
        let store = TokenStore::new(backend.clone(), "test");
        let redirector = AuthorizationRedirector::new(
            OAuthConfig::new("c".into(), "http://127.0.0.1/cb".into(), vec![]),
            store.clone(),
            Arc::new(RecordingNavigator::default()),
        );
        let guard = SessionGuard::new(store, redirector, Arc::new(MockTokenExchanger::new()));

        assert_eq!(guard.initialize().await.unwrap(), SessionState::Unauthenticated);
        assert!(backend.is_empty());
    }

    /// Validates `login(None)` for the redirect leg of a fresh login.
    ///
    /// Assertions:
    /// - Ensures the navigator received one URL.
    /// - Ensures the guard waits in `Authenticating`.
    #[tokio::test]
    async fn test_login_without_code_redirects() {
        let h = harness(MockTokenExchanger::new());
        h.guard.initialize().await.unwrap();

        assert_eq!(h.guard.login(None).await.unwrap(), LoginOutcome::Redirected);
        assert_eq!(h.navigator.urls().len(), 1);
        assert_eq!(h.guard.state(), SessionState::Authenticating);
        assert!(h.store.load_verifier().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_login_with_code_authenticates() {
        let h = harness(MockTokenExchanger::new().with_exchange(Ok(pair("AT1", "RT1"))));

        assert_eq!(h.guard.login(Some("abc123")).await.unwrap(), LoginOutcome::Authenticated);
        assert_eq!(h.guard.state(), SessionState::Authenticated);
        assert_eq!(h.store.load().await.unwrap(), Some(pair("AT1", "RT1")));
        assert_eq!(h.exchanger.codes_seen(), vec!["abc123".to_string()]);
    }

    /// Validates `login(Some(code))` when the exchange is rejected.
    ///
    /// Assertions:
    /// - Ensures the error surfaces and the exchange is attempted once.
    /// - Ensures the guard returns to `Unauthenticated`.
    #[tokio::test]
    async fn test_failed_exchange_returns_to_unauthenticated() {
        let h = harness(
            MockTokenExchanger::new()
                .with_exchange(Err(AuthError::TokenExchangeFailed { status: 400, error: None })),
        );

        let err = h.guard.login(Some("bad")).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExchangeFailed { status: 400, .. }));
        assert_eq!(h.exchanger.exchange_calls(), 1);
        assert_eq!(h.guard.state(), SessionState::Unauthenticated);
        assert_eq!(h.store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_authorized_without_session_requires_login() {
        let h = harness(MockTokenExchanger::new());
        let calls = AtomicUsize::new(0);

        let result = h.guard.authorized(|t| protected(t, "AT1", &calls)).await;
        assert_eq!(result.unwrap_err(), AuthError::AuthenticationRequired);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Validates the expired access token recovery path.
    ///
    /// Assertions:
    /// - Ensures the guard passes through `Expired` and ends `Authenticated`.
    /// - Ensures the store holds the rotated pair.
    /// - Ensures the call ran twice: once with AT1, once with AT2.
    #[tokio::test]
    async fn test_unauthorized_call_refreshes_and_retries_once() {
        let h = signed_in(MockTokenExchanger::new().with_refresh(Ok(pair("AT2", "RT2")))).await;
        let mut states = h.guard.subscribe();
        let calls = AtomicUsize::new(0);

        let data = h.guard.authorized(|t| protected(t, "AT2", &calls)).await.unwrap();

        assert_eq!(data, "data for AT2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.exchanger.refresh_tokens_seen(), vec![Some("RT1".to_string())]);
        assert_eq!(h.store.load().await.unwrap(), Some(pair("AT2", "RT2")));
        assert_eq!(h.guard.state(), SessionState::Authenticated);
        assert!(states.has_changed().unwrap());
        assert_eq!(*states.borrow_and_update(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_second_rejection_is_not_retried_again() {
        let h = signed_in(MockTokenExchanger::new().with_refresh(Ok(pair("AT2", "RT2")))).await;
        let calls = AtomicUsize::new(0);

        let err = h.guard.authorized(|t| protected(t, "never", &calls)).await.unwrap_err();
        assert_eq!(err, AuthError::Unauthorized);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.exchanger.refresh_calls(), 1);
    }

    /// Validates the refresh failure path.
    ///
    /// Assertions:
    /// - Ensures the refresh error reaches the caller.
    /// - Ensures the store is empty and the guard `Unauthenticated`.
    /// - Ensures the protected call is not retried.
    #[tokio::test]
    async fn test_refresh_failure_ends_session() {
        let h = signed_in(
            MockTokenExchanger::new()
                .with_refresh(Err(AuthError::RefreshFailed { status: 400, error: None })),
        )
        .await;
        let calls = AtomicUsize::new(0);

        let err = h.guard.authorized(|t| protected(t, "AT2", &calls)).await.unwrap_err();
        assert!(err.requires_reauthorization());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.guard.state(), SessionState::Unauthenticated);
        assert_eq!(h.store.load().await.unwrap(), None);
        assert_eq!(h.guard.access_token().await, None);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_ends_session() {
        let h = harness(MockTokenExchanger::new());
        h.store.persist(&TokenPair::new("AT1", None)).await.unwrap();
        h.guard.initialize().await.unwrap();
        let calls = AtomicUsize::new(0);

        let err = h.guard.authorized(|t| protected(t, "AT2", &calls)).await.unwrap_err();
        assert_eq!(err, AuthError::NoRefreshToken);
        assert_eq!(h.guard.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_other_errors_do_not_trigger_refresh() {
        let h = signed_in(MockTokenExchanger::new()).await;

        let result: Result<(), AuthError> =
            h.guard.authorized(|_| async { Err(AuthError::Network("offline".into())) }).await;
        assert_eq!(result.unwrap_err(), AuthError::Network("offline".into()));
        assert_eq!(h.exchanger.refresh_calls(), 0);
        assert_eq!(h.guard.state(), SessionState::Authenticated);
    }

    /// Validates single-flight refresh with two concurrent 401s.
    ///
    /// Assertions:
    /// - Ensures exactly one refresh call.
    /// - Ensures both callers succeed with AT2.
    #[tokio::test]
    async fn test_concurrent_unauthorized_calls_share_one_refresh() {
        let h = signed_in(
            MockTokenExchanger::new()
                .with_refresh(Ok(pair("AT2", "RT2")))
                .with_delay(Duration::from_millis(50)),
        )
        .await;
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            h.guard.authorized(|t| protected(t, "AT2", &calls)),
            h.guard.authorized(|t| protected(t, "AT2", &calls)),
        );

        assert_eq!(a.unwrap(), "data for AT2");
        assert_eq!(b.unwrap(), "data for AT2");
        assert_eq!(h.exchanger.refresh_calls(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_refresh_failure() {
        let h = signed_in(
            MockTokenExchanger::new()
                .with_refresh(Err(AuthError::RefreshFailed { status: 400, error: None }))
                .with_delay(Duration::from_millis(50)),
        )
        .await;
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            h.guard.authorized(|t| protected(t, "AT2", &calls)),
            h.guard.authorized(|t| protected(t, "AT2", &calls)),
        );

        let expected = AuthError::RefreshFailed { status: 400, error: None };
        assert_eq!(a.unwrap_err(), expected);
        assert_eq!(b.unwrap_err(), expected);
        assert_eq!(h.exchanger.refresh_calls(), 1);
    }

    /// Validates `logout` for the repeated call scenario.
    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let h = signed_in(MockTokenExchanger::new()).await;

        h.guard.logout().await.unwrap();
        assert_eq!(h.store.load().await.unwrap(), None);
        h.guard.logout().await.unwrap();
        assert_eq!(h.store.load().await.unwrap(), None);
        assert_eq!(h.guard.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_validate_session_caches_profile_until_logout() {
        let h = signed_in(MockTokenExchanger::new()).await;
        let source = MockProfileSource::accepting("AT1", "wizzler");

        let profile = h.guard.validate_session(&source).await.unwrap();
        assert_eq!(profile.id, "wizzler");
        assert_eq!(h.guard.user_profile().await.map(|p| p.id), Some("wizzler".to_string()));
        assert!(h.store.load_profile::<UserProfile>().await.unwrap().is_some());

        h.guard.logout().await.unwrap();
        assert_eq!(h.guard.user_profile().await, None);
        assert!(h.store.load_profile::<UserProfile>().await.unwrap().is_none());
    }

    /// Validates that a new login forgets the previous user's profile, in
    /// memory and across a restart.
    ///
    /// # Test Steps
    /// 1. Sign in and cache a profile for `old_user`
    /// 2. Log in again with a fresh code
    /// 3. Restore a second guard from the same store
    #[tokio::test]
    async fn test_new_login_drops_cached_profile() {
        let h = signed_in(MockTokenExchanger::new().with_exchange(Ok(pair("AT9", "RT9")))).await;
        h.guard.validate_session(&MockProfileSource::accepting("AT1", "old_user")).await.unwrap();

        h.guard.login(Some("code")).await.unwrap();
        assert_eq!(h.guard.user_profile().await, None);
        assert_eq!(h.guard.access_token().await.as_deref(), Some("AT9"));
        assert!(h.store.load_profile::<UserProfile>().await.unwrap().is_none());

        let restarted = guard_on(h.store.clone());
        assert_eq!(restarted.initialize().await.unwrap(), SessionState::Authenticated);
        assert_eq!(restarted.access_token().await.as_deref(), Some("AT9"));
        assert_eq!(restarted.user_profile().await, None);
    }

    /// Validates `logout` while a refresh is still waiting on the token
    /// endpoint.
    ///
    /// Assertions:
    /// - Ensures the late refresh result is discarded.
    /// - Ensures the guard stays `Unauthenticated` with nothing stored.
    #[tokio::test]
    async fn test_logout_during_refresh_is_final() {
        let h = signed_in(
            MockTokenExchanger::new()
                .with_refresh(Ok(pair("AT2", "RT2")))
                .with_refresh_delay(Duration::from_millis(100)),
        )
        .await;
        let calls = Arc::new(AtomicUsize::new(0));

        let guard = h.guard.clone();
        let counter = Arc::clone(&calls);
        let pending = tokio::spawn(async move {
            guard.authorized(|t| {
                let counter = Arc::clone(&counter);
                async move { protected(t, "AT2", &counter).await }
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(h.guard.state(), SessionState::Expired);
        h.guard.logout().await.unwrap();

        let result = pending.await.unwrap();
        assert_eq!(result.unwrap_err(), AuthError::AuthenticationRequired);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.exchanger.refresh_calls(), 1);
        assert_eq!(h.guard.state(), SessionState::Unauthenticated);
        assert_eq!(h.guard.access_token().await, None);
        assert_eq!(h.store.load().await.unwrap(), None);
    }

    /// Validates a fresh login that completes while the previous session's
    /// refresh is still running.
    ///
    /// Assertions:
    /// - Ensures the new login's tokens survive in memory and in the store.
    /// - Ensures a 401 on the new token starts its own refresh instead of
    ///   joining the stale one.
    #[tokio::test]
    async fn test_login_during_refresh_keeps_new_session() {
        let h = signed_in(
            MockTokenExchanger::new()
                .with_exchange(Ok(pair("AT9", "RT9")))
                .with_refresh(Ok(pair("AT2", "RT2")))
                .with_refresh(Ok(pair("AT10", "RT10")))
                .with_refresh_delay(Duration::from_millis(100)),
        )
        .await;

        let guard = h.guard.clone();
        let pending = tokio::spawn(async move {
            let calls = AtomicUsize::new(0);
            guard.authorized(|t| protected(t, "AT2", &calls)).await
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(h.guard.login(Some("code")).await.unwrap(), LoginOutcome::Authenticated);

        let calls = AtomicUsize::new(0);
        let fresh = h.guard.authorized(|t| protected(t, "AT10", &calls)).await.unwrap();
        assert_eq!(fresh, "data for AT10");
        assert_eq!(h.exchanger.refresh_tokens_seen().last().cloned(), Some(Some("RT9".to_string())));

        assert_eq!(pending.await.unwrap().unwrap_err(), AuthError::AuthenticationRequired);
        assert_eq!(h.guard.state(), SessionState::Authenticated);
        assert_eq!(h.guard.access_token().await.as_deref(), Some("AT10"));
        assert_eq!(h.store.load().await.unwrap(), Some(pair("AT10", "RT10")));
    }
}
