use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::trakt::pacing::{RateLimitDescriptor, RateLimiter};

pub const DEFAULT_BASE_URL: &str = "https://api.trakt.tv";
pub const API_VERSION: &str = "2";

#[derive(Debug, Clone)]
pub struct TraktCredentials {
    pub client_id: String,
    pub access_token: String,
}

/// A fully read Trakt response
#[derive(Debug)]
pub struct TraktResponse {
    pub url: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TraktResponse {
    pub fn is_no_content(&self) -> bool {
        self.status == StatusCode::NO_CONTENT || self.body.trim().is_empty()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|source| TransportError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// Authenticated, paced HTTP access to the Trakt API.
///
/// Calls take `&mut self`: requests go out strictly one at a time and the
/// rate limiter state travels with the client.
pub struct TraktHttp {
    client: Client,
    base_url: String,
    credentials: TraktCredentials,
    limiter: RateLimiter,
}

impl TraktHttp {
    pub fn new(
        base_url: impl Into<String>,
        credentials: TraktCredentials,
        timeout: Option<Duration>,
        limiter: RateLimiter,
    ) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(concat!("imdb-trakt-sync/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Issue one request. Any non-2xx status is a `TransportError::Status`;
    /// 204 counts as success and yields an empty body.
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<TraktResponse, TransportError> {
        let url = self.url(path);

        self.limiter.before_request().await;

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("trakt-api-key", &self.credentials.client_id)
            .header("trakt-api-version", API_VERSION)
            .bearer_auth(&self.credentials.access_token);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(ref body) = body {
            builder = builder.json(body);
        }

        debug!(method = %method, url = %url, "Trakt request");
        let response = builder.send().await.map_err(|source| TransportError::Network {
            method: method.to_string(),
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(|source| TransportError::Network {
            method: method.to_string(),
            url: url.clone(),
            source,
        })?;
        trace!(status = status.as_u16(), body_len = text.len(), "Trakt response");

        let descriptor = RateLimitDescriptor::from_headers(&headers);
        self.limiter
            .after_response(method == Method::GET, descriptor.as_ref())
            .await;

        if !status.is_success() {
            return Err(TransportError::Status {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(TraktResponse {
            url,
            status,
            headers,
            body: text,
        })
    }

    pub async fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<TraktResponse, TransportError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<B: serde::Serialize + ?Sized>(&mut self, path: &str, body: &B) -> Result<TraktResponse, TransportError> {
        let url = self.url(path);
        let body = serde_json::to_value(body).map_err(|source| TransportError::Decode { url, source })?;
        self.request(Method::POST, path, &[], Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trakt::pacing::PacingStrategy;
    use crate::trakt::test_support::test_http;

    #[tokio::test]
    async fn test_request_sends_trakt_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/users/me/watching")
            .match_header("trakt-api-key", "client-123")
            .match_header("trakt-api-version", "2")
            .match_header("authorization", "Bearer token-abc")
            .match_header("content-type", "application/json")
            .with_status(204)
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::fixed_interval());
        let response = http.get("/users/me/watching", &[]).await.unwrap();

        assert!(response.is_no_content());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/sync/watchlist")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let (mut http, _) = test_http(&server.url(), PacingStrategy::fixed_interval());
        let err = http
            .post("/sync/watchlist", &serde_json::json!({"movies": []}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("unauthorized"));
    }

    #[tokio::test]
    async fn test_header_driven_pacing_reads_response_headers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/sync/ratings")
            .with_status(201)
            .with_header(
                "X-Ratelimit",
                r#"{"name":"AUTHED_API_POST_LIMIT","period":1,"limit":100,"remaining":5,"until":"2024-01-01T00:00:01Z"}"#,
            )
            .with_body("{}")
            .create_async()
            .await;

        let (mut http, clock) = test_http(&server.url(), PacingStrategy::HeaderDriven);
        http.post("/sync/ratings", &serde_json::json!({})).await.unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(60), Duration::from_secs(1)]);
    }

    #[tokio::test]
    async fn test_fixed_interval_paces_consecutive_calls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me/watching")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;

        let (mut http, clock) = test_http(&server.url(), PacingStrategy::fixed_interval());
        http.get("/users/me/watching", &[]).await.unwrap();
        http.get("/users/me/watching", &[]).await.unwrap();

        // the manual clock does not move on its own, so the whole interval is slept
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
    }
}
