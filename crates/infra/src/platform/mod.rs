//! Platform-specific implementations
//!
//! Adapters that touch the desktop environment: the browser the user logs in
//! with and the places session state is stored.
//!
//! # Platform Support
//!
//! - **Browser**: whatever `open` resolves on the host (macOS `open`,
//!   Windows `start`, `xdg-open` elsewhere)
//! - **Keychain**: only with the `keychain` feature; otherwise selecting it
//!   is a configuration error

pub mod browser;
pub mod storage;

pub use browser::BrowserNavigator;
pub use storage::{default_storage_path, open_token_store};
