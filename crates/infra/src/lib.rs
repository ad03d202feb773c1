//! # TuneStats Infrastructure
//!
//! Impure adapters around the credential lifecycle in `tunestats-common`.
//!
//! This crate contains:
//! - Configuration loading (environment, TOML/JSON files)
//! - HTTP client with retry, and the resource API client on top of it
//! - The `StatsService` facade front ends use
//! - Loopback OAuth callback receiver and browser hand-off
//! - Token store construction and tracing setup
//!
//! ## Architecture
//! - Depends on `tunestats-common` and `tunestats-domain`
//! - Contains all "impure" code (network, filesystem, desktop)

pub mod api;
pub mod callback;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod platform;

// Re-export commonly used items
pub use api::{ApiError, SpotifyApiClient, StatsService, TopItemsQuery};
pub use callback::OAuthCallbackServer;
pub use errors::HttpError;
pub use http::HttpClient;
pub use observability::init_tracing;
pub use platform::{open_token_store, BrowserNavigator};
