//! Testing utilities and helpers
//!
//! Test doubles for the seams of the credential lifecycle, so downstream
//! crates can drive a [`SessionGuard`](crate::auth::SessionGuard) without a
//! token endpoint or a browser:
//! - **[`MockTokenExchanger`]**: scripted code and refresh grants
//! - **[`RecordingNavigator`]**: captures authorization URLs
//! - **[`MockProfileSource`]**: resource API that accepts one access token
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use tunestats_common::testing::MockTokenExchanger;
//! use tunestats_common::TokenPair;
//!
//! let exchanger = MockTokenExchanger::new()
//!     .with_refresh(Ok(TokenPair::new("AT2", Some("RT2".to_string()))));
//! assert_eq!(exchanger.refresh_calls(), 0);
//! # }
//! ```

pub mod mocks;

pub use mocks::{MockProfileSource, MockTokenExchanger, RecordingNavigator};
