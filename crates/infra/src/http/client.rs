use std::time::Duration;

use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use tunestats_domain::constants::{DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS};

use crate::errors::HttpError;

/// Longest `Retry-After` the client waits out itself; anything longer is
/// handed back to the caller as the 429 response.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Bearer-authenticated GET client for the resource API.
///
/// Retries 5xx responses and transient transport failures with exponential
/// backoff, and short rate limits after the server's `Retry-After`. A 401 is
/// never retried here; token recovery belongs to the session guard.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// GET `url` with `token`, asking for JSON.
    ///
    /// Non-2xx responses are returned as-is.
    ///
    /// # Errors
    /// [`HttpError`] when no response arrived after the last attempt.
    pub async fn get_with_bearer(&self, url: &str, token: &str) -> Result<Response, HttpError> {
        let request = self.client.get(url).bearer_auth(token).header(ACCEPT, "application/json");
        self.send(request).await
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, HttpError> {
        let mut attempt = 1;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| HttpError::InvalidRequest("streaming bodies cannot be retried".into()))?
                .build()
                .map_err(|e| HttpError::from_reqwest(&e, self.timeout))?;
            let path = request.url().path().to_string();
            let last = attempt >= self.max_attempts;

            let wait = match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt, path = %path, %status, "HTTP response");
                    match self.retry_wait(&response, attempt) {
                        Some(wait) if !last => wait,
                        _ => return Ok(response),
                    }
                }
                Err(err) => {
                    let err = HttpError::from_reqwest(&err, self.timeout);
                    debug!(attempt, path = %path, error = %err, "HTTP request failed");
                    if last || !err.is_transient() {
                        return Err(err);
                    }
                    self.backoff_delay(attempt)
                }
            };

            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
            attempt += 1;
        }
    }

    /// How long to wait before retrying `response`, or `None` to return it.
    fn retry_wait(&self, response: &Response, attempt: u32) -> Option<Duration> {
        let status = response.status();
        if status.is_server_error() {
            return Some(self.backoff_delay(attempt));
        }
        if status != StatusCode::TOO_MANY_REQUESTS {
            return None;
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        match retry_after {
            Some(wait) if wait <= MAX_RETRY_AFTER => Some(wait),
            Some(wait) => {
                warn!(retry_after_secs = wait.as_secs(), "Rate limited for too long; giving up");
                None
            }
            None => Some(self.backoff_delay(attempt)),
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1_u32 << attempt.saturating_sub(1).min(8))
    }
}

/// Builder for [`HttpClient`]
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts including the first; at least one.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// # Errors
    /// `HttpError::InvalidRequest` if the TLS backend cannot initialise.
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|e| HttpError::from_reqwest(&e, self.timeout))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}
