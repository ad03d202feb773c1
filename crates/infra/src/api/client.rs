//! Resource API client
//!
//! Typed calls against the listening-statistics API. Every call takes the
//! access token explicitly; token lifecycle belongs to the session guard.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use tunestats_common::auth::{AuthError, ProfileSource};
use tunestats_domain::constants::{DEFAULT_TOP_ITEMS_LIMIT, MAX_TOP_ITEMS_LIMIT};
use tunestats_domain::{ApiSettings, ItemKind, Page, TimeRange, TopItem, UserProfile};

use super::errors::ApiError;
use crate::errors::HttpError;
use crate::http::HttpClient;

/// Parameters of a `/me/top/{kind}` listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopItemsQuery {
    pub kind: ItemKind,
    pub time_range: TimeRange,
    pub limit: u32,
}

impl TopItemsQuery {
    pub fn new(kind: ItemKind) -> Self {
        Self { kind, time_range: TimeRange::default(), limit: DEFAULT_TOP_ITEMS_LIMIT }
    }

    #[must_use]
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// # Errors
    /// `ApiError::InvalidInput` unless `1 <= limit <= 50`.
    pub fn validate(&self) -> Result<(), ApiError> {
        if (1..=MAX_TOP_ITEMS_LIMIT).contains(&self.limit) {
            Ok(())
        } else {
            Err(ApiError::InvalidInput(format!(
                "limit must be between 1 and {MAX_TOP_ITEMS_LIMIT}, got {}",
                self.limit
            )))
        }
    }

    fn path(&self) -> String {
        format!(
            "/me/top/{}?time_range={}&limit={}",
            self.kind.as_path(),
            self.time_range.as_query(),
            self.limit
        )
    }
}

/// Client for the listening-statistics resource API
#[derive(Debug, Clone)]
pub struct SpotifyApiClient {
    http: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl SpotifyApiClient {
    /// # Errors
    /// `ApiError::InvalidInput` if the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let http = HttpClient::builder()
            .timeout(timeout)
            .max_attempts(settings.max_attempts)
            .user_agent(concat!("tunestats/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidInput(format!("failed to build http client: {e}")))?;
        Ok(Self::with_http_client(http, &settings.base_url, timeout))
    }

    pub fn with_http_client(http: HttpClient, base_url: &str, timeout: Duration) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /me`
    ///
    /// # Errors
    /// `ApiError::Unauthorized` on 401, otherwise by status category.
    #[instrument(skip(self, access_token))]
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        self.get_json("/me", access_token).await
    }

    /// `GET /me/top/{kind}`
    ///
    /// The limit is checked before anything is sent.
    ///
    /// # Errors
    /// `ApiError::InvalidInput` for an out-of-range limit, then as for
    /// [`fetch_profile`](Self::fetch_profile).
    #[instrument(skip(self, access_token), fields(kind = %query.kind, period = %query.time_range))]
    pub async fn fetch_top_items(
        &self,
        access_token: &str,
        query: &TopItemsQuery,
    ) -> Result<Page<TopItem>, ApiError> {
        query.validate()?;
        self.get_json(&query.path(), access_token).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, access_token: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "GET request");

        let response =
            match tokio::time::timeout(self.timeout, self.http.get_with_bearer(&url, access_token))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => return Err(map_transport_error(err)),
                Err(_) => return Err(ApiError::Timeout(self.timeout)),
            };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, path, &body));
        }

        response.json().await.map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn map_transport_error(err: HttpError) -> ApiError {
    match err {
        HttpError::Timeout(limit) => ApiError::Timeout(limit),
        HttpError::Transport(_) => ApiError::Network(err.to_string()),
        HttpError::InvalidRequest(msg) => ApiError::InvalidInput(msg),
    }
}

fn map_status_error(status: StatusCode, path: &str, body: &str) -> ApiError {
    let message = if body.is_empty() {
        format!("{path} returned status {status}")
    } else {
        format!("{path} returned status {status}: {body}")
    };

    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(path = %path, "Rate limited by resource API");
        ApiError::RateLimit(message)
    } else if status.is_server_error() {
        ApiError::Server(message)
    } else {
        ApiError::Client(message)
    }
}

#[async_trait]
impl ProfileSource for SpotifyApiClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        SpotifyApiClient::fetch_profile(self, access_token).await.map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::errors::ApiErrorCategory;

    fn client(server: &MockServer) -> SpotifyApiClient {
        let http = HttpClient::builder()
            .base_backoff(Duration::from_millis(5))
            .max_attempts(2)
            .build()
            .unwrap();
        SpotifyApiClient::with_http_client(http, &format!("{}/v1/", server.uri()), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn fetches_profile_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .and(header("authorization", "Bearer AT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "wizzler",
                "display_name": "Wizzler",
                "country": "SE",
                "product": "premium",
                "followers": { "total": 12 },
                "images": [{ "url": "https://i.scdn.co/image/a", "height": 300, "width": 300 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client(&server).fetch_profile("AT1").await.unwrap();
        assert_eq!(profile.id, "wizzler");
        assert_eq!(profile.name(), "Wizzler");
        assert_eq!(profile.followers.total, 12);
    }

    #[tokio::test]
    async fn maps_401_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_profile("AT1").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn profile_source_reports_unauthorized_to_guard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let source: &dyn ProfileSource = &client(&server);
        assert_eq!(source.fetch_profile("AT1").await.unwrap_err(), AuthError::Unauthorized);
    }

    #[tokio::test]
    async fn fetches_top_tracks_with_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/tracks"))
            .and(query_param("time_range", "short_term"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "t1", "name": "First", "popularity": 80,
                      "artists": [{ "id": "a1", "name": "Artist" }],
                      "album": { "name": "Album", "images": [{ "url": "https://img/1" }] } },
                    { "id": "t2", "name": "Second" }
                ],
                "total": 50, "limit": 2, "offset": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query =
            TopItemsQuery::new(ItemKind::Tracks).with_time_range(TimeRange::ShortTerm).with_limit(2);
        let page = client(&server).fetch_top_items("AT1", &query).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 50);
        assert_eq!(page.items[0].artwork().map(|i| i.url.as_str()), Some("https://img/1"));
    }

    #[tokio::test]
    async fn rejects_out_of_range_limit_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let api = client(&server);
        for limit in [0, 51] {
            let query = TopItemsQuery::new(ItemKind::Artists).with_limit(limit);
            let err = api.fetch_top_items("AT1", &query).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn maps_server_and_rate_limit_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/artists"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let api = client(&server);
        let limited = api.fetch_top_items("AT1", &TopItemsQuery::new(ItemKind::Artists)).await;
        assert!(matches!(limited, Err(ApiError::RateLimit(_))));
        assert!(matches!(api.fetch_profile("AT1").await, Err(ApiError::Server(_))));
    }

    /// Validates that a per-request timeout inside the HTTP client surfaces
    /// as `ApiError::Timeout`, not as a network failure.
    ///
    /// Assertions:
    /// - Ensures the error carries the client's own limit
    /// - Ensures the timed-out request is not retried
    #[tokio::test]
    async fn client_timeout_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&server)
            .await;

        let http = HttpClient::builder()
            .timeout(Duration::from_millis(50))
            .max_attempts(3)
            .build()
            .unwrap();
        let api = SpotifyApiClient::with_http_client(http, &format!("{}/v1", server.uri()), Duration::from_secs(2));

        let err = api.fetch_profile("AT1").await.unwrap_err();
        assert_eq!(err.category(), ApiErrorCategory::Network);
        assert!(matches!(err, ApiError::Timeout(limit) if limit == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert!(matches!(client(&server).fetch_profile("AT1").await, Err(ApiError::Decode(_))));
    }

    #[test]
    fn query_defaults() {
        let query = TopItemsQuery::new(ItemKind::Artists);
        assert_eq!(query.time_range, TimeRange::MediumTerm);
        assert_eq!(query.limit, 20);
        assert_eq!(query.path(), "/me/top/artists?time_range=medium_term&limit=20");
    }
}
