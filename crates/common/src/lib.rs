//! Common building blocks shared across TuneStats crates.
//!
//! The centrepiece is [`auth`], the OAuth 2.0 Authorization Code + PKCE
//! credential lifecycle: verifier generation, the authorization redirect,
//! code and refresh-token exchange, durable token storage and the session
//! guard that recovers from expired access tokens.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: pure helpers (PKCE generation, token types)
//! - `runtime`: async session management over HTTP (default)
//! - `platform`: OS keychain storage backend
//! - `test-utils`: mocks for downstream crate tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier (PKCE, token types); session management needs `runtime`
// --------------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use auth::{AuthError, OAuthConfig, PKCEChallenge, TokenPair};
#[cfg(feature = "runtime")]
pub use auth::{
    AuthorizationRedirector, LoginOutcome, Navigator, OAuthClient, ProfileSource, SessionGuard,
    SessionState, StorageBackend, TokenExchanger, TokenStore,
};
