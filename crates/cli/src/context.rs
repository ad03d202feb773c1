//! Application context - wires configuration into the session and API client

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info};
use tunestats_common::auth::{OAuthConfig, SessionGuard, SessionState};
use tunestats_domain::Config;
use tunestats_infra::{config, open_token_store, BrowserNavigator, SpotifyApiClient, StatsService};

/// Load configuration from `path` when given, otherwise env-then-file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => config::load_from_file(Some(path.to_path_buf()))
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => config::load().context("failed to load configuration")?,
    };
    Ok(config)
}

/// Everything a command needs. Built once per invocation.
pub struct AppContext {
    pub config: Config,
    pub service: StatsService,
}

impl AppContext {
    /// Open the configured token store and restore any persisted session.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = open_token_store(&config.storage).context("failed to open token store")?;
        debug!(backend = ?config.storage.backend, "Token store opened");

        let guard = SessionGuard::for_provider(
            OAuthConfig::from(&config.auth),
            store,
            Arc::new(BrowserNavigator::new()),
        );
        let api = SpotifyApiClient::new(&config.api).context("failed to build API client")?;
        let service = StatsService::new(guard, Arc::new(api));

        let state = service.initialize().await.context("failed to restore session")?;
        info!(%state, "Session restored");

        Ok(Self { config, service })
    }

    pub fn state(&self) -> SessionState {
        self.service.state()
    }
}
