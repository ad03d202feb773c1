//! API-specific error types
//!
//! Provides error classification for resource API operations with retry
//! metadata.

use std::time::Duration;

use thiserror::Error;
use tunestats_common::auth::{AuthError, UnauthorizedSignal};
use tunestats_domain::TuneStatsError;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401) - retry after token refresh
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Network/connection errors - retryable
    Network,
    /// Bad input or undecodable data - non-retryable
    Invalid,
}

/// API operation errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Session-level failure: no login, refresh rejected, ...
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The resource API rejected the access token.
    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(AuthError::Network(_) | AuthError::Timeout(_)) => ApiErrorCategory::Network,
            Self::Auth(_) | Self::Unauthorized(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Decode(_) | Self::InvalidInput(_) => ApiErrorCategory::Invalid,
        }
    }

    /// Check if this error should be retried by the caller
    ///
    /// Authentication failures are not: the session guard already refreshed
    /// and retried once before one of these reaches a caller.
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }

    /// True when only a fresh login can fix this.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Auth(e) if e.requires_reauthorization())
    }

    /// Get suggested retry delay in seconds
    pub fn retry_delay_secs(&self) -> u64 {
        match self.category() {
            ApiErrorCategory::RateLimit => 30,
            ApiErrorCategory::Server => 10,
            ApiErrorCategory::Network => 5,
            ApiErrorCategory::Authentication
            | ApiErrorCategory::Client
            | ApiErrorCategory::Invalid => 0,
        }
    }
}

impl UnauthorizedSignal for ApiError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Auth(AuthError::Unauthorized))
    }
}

impl From<ApiError> for TuneStatsError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(auth) => auth.into(),
            ApiError::Unauthorized(_) => Self::Auth(err.to_string()),
            ApiError::InvalidInput(msg) => Self::InvalidInput(msg),
            ApiError::Decode(_) => Self::Internal(err.to_string()),
            ApiError::RateLimit(_)
            | ApiError::Server(_)
            | ApiError::Client(_)
            | ApiError::Network(_)
            | ApiError::Timeout(_) => Self::Network(err.to_string()),
        }
    }
}

/// Narrow an API failure to what the session guard understands.
impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(auth) => auth,
            ApiError::Unauthorized(_) => Self::Unauthorized,
            ApiError::Timeout(limit) => Self::Timeout(limit),
            ApiError::Decode(msg) => Self::InvalidResponse(msg),
            other => Self::Network(other.to_string()),
        }
    }
}
