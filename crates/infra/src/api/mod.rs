//! Listening-statistics resource API
//!
//! Typed client for the `/me` endpoints and the facade front ends use.
//!
//! # Architecture
//!
//! - Uses [`HttpClient`](crate::http::HttpClient) (no direct reqwest at
//!   call sites)
//! - Every call takes the access token explicitly; [`StatsService`] routes
//!   calls through the session guard so an expired token is refreshed and
//!   the call retried once
//! - Timeout on every request; 5xx and transport failures retried by the
//!   HTTP layer, 401 surfaced as [`ApiError::Unauthorized`]

pub mod client;
pub mod errors;
pub mod service;

pub use client::{SpotifyApiClient, TopItemsQuery};
pub use errors::{ApiError, ApiErrorCategory};
pub use service::StatsService;
