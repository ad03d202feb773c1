//! Conversions between transport errors and the application error

use std::time::Duration;

use tunestats_domain::TuneStatsError;

use super::HttpError;

impl HttpError {
    /// Classify a reqwest failure. `timeout` is the limit the client was
    /// built with, reported back in [`HttpError::Timeout`].
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<HttpError> for TuneStatsError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(_) | HttpError::Transport(_) => Self::Network(err.to_string()),
            HttpError::InvalidRequest(_) => Self::Config(err.to_string()),
        }
    }
}
