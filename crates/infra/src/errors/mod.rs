//! Transport errors and their conversions into the application error

use std::time::Duration;

use thiserror::Error;

mod conversions;

/// Failure to get any HTTP response at all
///
/// Status codes are not errors at this layer; callers classify responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// No response within the client's configured timeout
    #[error("http request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, reset, DNS failure and the like
    #[error("http transport failed: {0}")]
    Transport(String),

    /// The request could not be built (bad URL, unclonable body)
    #[error("invalid http request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Timeouts are not retried: the caller's own deadline is already spent.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
