//! Secondary lead sources: Reddit, Eventbrite, Resident Advisor and venue websites.
//!
//! Every client shares the HTTP policy from [`crate::http_client`] and paces
//! requests through a shared [`RateLimiter`]. A 429 answer is honoured once
//! (waiting for `Retry-After`); any other failure surfaces as [`SourceError`]
//! and the caller decides whether to skip.

pub mod eventbrite;
pub mod reddit;
pub mod resident_advisor;
pub mod website;

pub use eventbrite::{EventbriteClient, EventbriteEvent, EventbriteVenue};
pub use reddit::{RedditClient, RedditPost};
pub use resident_advisor::{RaEvent, RaListing, RaVenue, ResidentAdvisorClient};
pub use website::{WebsiteContacts, WebsiteScraper};

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http_client::{HttpClientError, body_excerpt, redact_url};
use crate::rate_limiter::{RateLimiter, parse_retry_after};

/// Fallback wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Errors from secondary source clients.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Client(#[from] HttpClientError),

    /// A required token or id was not provided.
    #[error("{0} is missing\n  Suggestion: set it via environment variable or CLI flag")]
    MissingCredential(&'static str),

    /// Caller input failed validation (bad subreddit name, bad URL, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    /// Still rate limited after honouring one `Retry-After`.
    #[error("rate limited by {url} after waiting for Retry-After")]
    RateLimited { url: String },

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Sends a request with pacing, honouring one 429 `Retry-After` before giving up.
///
/// `build` is called per attempt because `RequestBuilder` is consumed by `send`.
pub(crate) async fn send_paced<F>(
    limiter: &RateLimiter,
    url: &str,
    build: F,
) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    let redacted = redact_url(url);
    let mut waited_for_retry_after = false;

    loop {
        limiter.acquire(url).await;
        let response = build()
            .send()
            .await
            .map_err(|source| SourceError::Network {
                url: redacted.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if waited_for_retry_after {
                return Err(SourceError::RateLimited { url: redacted });
            }
            let delay = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            warn!(url = %redacted, delay_ms = delay.as_millis(), "rate limited; waiting once");
            limiter.record_rate_limit(url, delay).await;
            if limiter.is_disabled() {
                tokio::time::sleep(delay).await;
            }
            waited_for_retry_after = true;
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(url = %redacted, status = status.as_u16(), "source HTTP error");
            return Err(SourceError::HttpStatus {
                url: redacted,
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        return Ok(response);
    }
}

/// Decodes a JSON body, mapping failures onto [`SourceError::Decode`].
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
    url: &str,
) -> Result<T, SourceError> {
    response.json::<T>().await.map_err(|e| SourceError::Decode {
        url: redact_url(url),
        message: e.without_url().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::http_client::build_http_client;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_send_paced_retries_once_after_429() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = build_http_client("test", "t").unwrap();
        let limiter = RateLimiter::disabled();
        let url = format!("{}/x", server.uri());
        let response = send_paced(&limiter, &url, || client.get(&url)).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_send_paced_gives_up_after_second_429() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let client = build_http_client("test", "t").unwrap();
        let limiter = RateLimiter::disabled();
        let url = format!("{}/x", server.uri());
        let err = send_paced(&limiter, &url, || client.get(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_send_paced_reports_status_and_body() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden here"))
            .mount(&server)
            .await;

        let client = build_http_client("test", "t").unwrap();
        let limiter = RateLimiter::disabled();
        let url = format!("{}/x", server.uri());
        match send_paced(&limiter, &url, || client.get(&url)).await {
            Err(SourceError::HttpStatus { status, body, .. }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden here");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
