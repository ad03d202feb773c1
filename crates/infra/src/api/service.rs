//! Collaborator facade
//!
//! What the CLI (or any other front end) talks to: the session guard for
//! login state and the resource API client for data, with every API call
//! routed through the guard's refresh-and-retry path.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use tunestats_common::auth::{LoginOutcome, SessionGuard, SessionState};
use tunestats_domain::{ItemKind, Page, TimeRange, TopItem, UserProfile};

use super::client::{SpotifyApiClient, TopItemsQuery};
use super::errors::ApiError;

/// Login state plus listening statistics for one user
#[derive(Debug, Clone)]
pub struct StatsService {
    guard: SessionGuard,
    api: Arc<SpotifyApiClient>,
}

impl StatsService {
    pub fn new(guard: SessionGuard, api: Arc<SpotifyApiClient>) -> Self {
        Self { guard, api }
    }

    /// Load any persisted session.
    pub async fn initialize(&self) -> Result<SessionState, ApiError> {
        Ok(self.guard.initialize().await?)
    }

    /// See [`SessionGuard::login`].
    pub async fn login(&self, code: Option<&str>) -> Result<LoginOutcome, ApiError> {
        Ok(self.guard.login(code).await?)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        Ok(self.guard.logout().await?)
    }

    /// Cached profile, or a fresh one fetched (and cached) through the guard.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        if let Some(profile) = self.guard.user_profile().await {
            return Ok(profile);
        }
        let profile = self.guard.validate_session(self.api.as_ref()).await?;
        info!(user = %profile.id, "Profile loaded");
        Ok(profile)
    }

    /// Top artists or tracks for `period`.
    ///
    /// # Errors
    /// `ApiError::InvalidInput` for a limit outside `1..=50` (nothing is
    /// sent), `ApiError::Auth` when no session exists or it cannot be
    /// refreshed, otherwise the resource API's failure.
    pub async fn top_items(
        &self,
        kind: ItemKind,
        period: TimeRange,
        limit: u32,
    ) -> Result<Page<TopItem>, ApiError> {
        let query = TopItemsQuery::new(kind).with_time_range(period).with_limit(limit);
        query.validate()?;

        let api = self.api.as_ref();
        let query = &query;
        self.guard.authorized(|token| async move { api.fetch_top_items(&token, query).await }).await
    }

    pub fn is_authenticated(&self) -> bool {
        self.guard.is_authenticated()
    }

    pub fn state(&self) -> SessionState {
        self.guard.state()
    }

    pub async fn user_profile(&self) -> Option<UserProfile> {
        self.guard.user_profile().await
    }

    /// Observe session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.guard.subscribe()
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }
}
