//! OAuth 2.0 Authorization Code + PKCE credential lifecycle
//!
//! Everything a public client needs to obtain, store and keep alive an
//! access token for a third-party provider without a client secret.
//!
//! # Features
//!
//! - **PKCE**: RFC 7636 verifiers drawn from the OS RNG, S256 challenges
//! - **Token Store**: one namespaced slot each for the pending verifier, the
//!   token pair and the cached profile, over a pluggable backend
//! - **Redirect + Exchange**: authorization URL construction, code and
//!   refresh-token grants with a bounded request time
//! - **Session Guard**: derived session state, 401 recovery through a
//!   single-flight refresh, retry-once semantics for protected calls
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  SessionGuard   │  State machine, owns the live TokenPair
//! └────────┬────────┘
//!          │
//!          ├──► AuthorizationRedirector  (PKCE pair + authorization URL)
//!          │         └──► Navigator      (sends the user agent away)
//!          ├──► TokenExchanger           (OAuthClient: code + refresh grants)
//!          └──► TokenStore
//!                    └──► StorageBackend (memory, file, keychain)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tunestats_common::auth::{Navigator, OAuthConfig, SessionGuard, TokenStore};
//!
//! # async fn run(navigator: Arc<dyn Navigator>) -> Result<(), tunestats_common::AuthError> {
//! let config = OAuthConfig::new(
//!     "your_client_id".to_string(),
//!     "http://127.0.0.1:8888/callback".to_string(),
//!     vec!["user-top-read".to_string()],
//! );
//! let guard = SessionGuard::for_provider(config, TokenStore::in_memory("tunestats"), navigator);
//! guard.initialize().await?;
//!
//! // First leg: redirect. Second leg: the code from the callback.
//! guard.login(None).await?;
//! guard.login(Some("code-from-callback")).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pkce;
pub mod types;

#[cfg(feature = "runtime")]
pub mod client;
#[cfg(feature = "platform")]
mod keychain;
#[cfg(feature = "runtime")]
pub mod redirector;
#[cfg(feature = "runtime")]
pub mod session;
#[cfg(feature = "runtime")]
pub mod store;
#[cfg(feature = "runtime")]
pub mod traits;

// Re-export main types
#[cfg(feature = "runtime")]
pub use client::OAuthClient;
pub use error::{AuthError, StoreError, UnauthorizedSignal};
#[cfg(feature = "platform")]
pub use keychain::{KeychainBackend, DEFAULT_KEYCHAIN_SERVICE};
pub use pkce::{
    generate_code_challenge, generate_code_verifier, PKCEChallenge, DEFAULT_VERIFIER_LENGTH,
    MAX_VERIFIER_LENGTH, MIN_VERIFIER_LENGTH,
};
#[cfg(feature = "runtime")]
pub use redirector::AuthorizationRedirector;
#[cfg(feature = "runtime")]
pub use session::{LoginOutcome, SessionGuard, SessionState};
#[cfg(feature = "runtime")]
pub use store::{FileBackend, MemoryBackend, TokenStore};
#[cfg(feature = "runtime")]
pub use traits::{Navigator, ProfileSource, StorageBackend, TokenExchanger};
pub use types::{OAuthConfig, OAuthErrorBody, TokenPair, TokenResponse};
