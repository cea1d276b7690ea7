//! Google Places text search and details client.
//!
//! Text search returns at most 20 results per page and 3 pages per query.
//! Follow-up pages are addressed by `next_page_token`, which Google only
//! activates a couple of seconds after issuing it; calling too early yields
//! `INVALID_REQUEST`. [`PlacesClient`] waits before every token call and
//! retries a not-yet-active token once.
//!
//! # Example
//!
//! ```no_run
//! use leadscout_core::places::{PlaceSearch, PlacesClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PlacesClient::new("my-api-key")?;
//! let places = client.search_all("rooftop bar in El Poblado, Medellín, Colombia", 3).await?;
//! println!("{} places", places.len());
//! # Ok(())
//! # }
//! ```

mod error;
mod types;

pub use error::PlacesError;
pub use types::{
    EditorialSummary, Geometry, LatLng, OpeningHours, PlaceDetails, PlaceResult, TextSearchPage,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::http_client::{build_http_client, redact_url};
use crate::rate_limiter::RateLimiter;
use crate::user_agent;

use types::{DetailsResponse, TextSearchResponse};

/// Default Places web service base URL.
const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Google never serves more than three pages per text search.
pub const MAX_PAGES: u8 = 3;

/// Wait before using a freshly issued `next_page_token`.
pub const DEFAULT_PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

/// Fields requested from `details/json`; billed per field group.
const DETAILS_FIELDS: &str =
    "formatted_phone_number,international_phone_number,website,url,opening_hours,editorial_summary";

/// Search seam used by the scanner so tests can substitute a stub.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Runs a text search and follows pagination up to `max_pages`.
    async fn search_all(&self, query: &str, max_pages: u8)
    -> Result<Vec<PlaceResult>, PlacesError>;

    /// Fetches contact details for one place.
    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError>;
}

/// HTTP client for the Places text search and details endpoints.
pub struct PlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
    region: String,
    page_token_delay: Duration,
    rate_limiter: Arc<RateLimiter>,
}

impl PlacesClient {
    /// Creates a client against the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError::MissingApiKey`] for a blank key, or
    /// [`PlacesError::Client`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, PlacesError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (wiremock in tests).
    ///
    /// # Errors
    ///
    /// Same as [`PlacesClient::new`].
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PlacesError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PlacesError::MissingApiKey);
        }
        let client = build_http_client("places", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: "es".to_string(),
            region: "co".to_string(),
            page_token_delay: DEFAULT_PAGE_TOKEN_DELAY,
            rate_limiter: Arc::new(RateLimiter::disabled()),
        })
    }

    /// Overrides the wait before next-page token calls.
    #[must_use]
    pub fn with_page_token_delay(mut self, delay: Duration) -> Self {
        self.page_token_delay = delay;
        self
    }

    /// Shares a rate limiter with other clients.
    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Sets result language (`es` by default).
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Fetches one page of text search results.
    ///
    /// With `page_token` set, only the token is sent; Google ignores other
    /// parameters on token calls.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError`] on network failure, non-2xx status, undecodable
    /// JSON or a non-OK Google status other than `ZERO_RESULTS`.
    #[instrument(skip(self), fields(has_token = page_token.is_some()))]
    pub async fn text_search(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<TextSearchPage, PlacesError> {
        let endpoint = format!("{}/textsearch/json", self.base_url);
        let params: Vec<(&str, &str)> = match page_token {
            Some(token) => vec![("pagetoken", token), ("key", self.api_key.as_str())],
            None => vec![
                ("query", query),
                ("language", self.language.as_str()),
                ("region", self.region.as_str()),
                ("key", self.api_key.as_str()),
            ],
        };

        let body: TextSearchResponse = self.get_json(&endpoint, &params).await?;
        debug!(
            status = %body.status,
            results = body.results.len(),
            has_next = body.next_page_token.is_some(),
            "text search page"
        );

        match body.status.as_str() {
            "OK" => Ok(TextSearchPage {
                results: body.results,
                next_page_token: body.next_page_token.filter(|t| !t.is_empty()),
            }),
            "ZERO_RESULTS" => Ok(TextSearchPage::default()),
            status => Err(PlacesError::from_status(status, body.error_message)),
        }
    }

    /// Fetches contact details for a place id.
    ///
    /// # Errors
    ///
    /// Returns [`PlacesError`] as for [`PlacesClient::text_search`]; a missing
    /// `result` object maps to [`PlacesError::Api`].
    #[instrument(skip(self))]
    pub async fn fetch_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        let endpoint = format!("{}/details/json", self.base_url);
        let params = [
            ("place_id", place_id),
            ("fields", DETAILS_FIELDS),
            ("language", self.language.as_str()),
            ("key", self.api_key.as_str()),
        ];
        let body: DetailsResponse = self.get_json(&endpoint, &params).await?;
        match body.status.as_str() {
            "OK" => body.result.ok_or_else(|| PlacesError::Api {
                status: "OK".to_string(),
                message: "details response without result".to_string(),
            }),
            status => Err(PlacesError::from_status(status, body.error_message)),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlacesError> {
        let url = url::Url::parse_with_params(endpoint, params).map_err(|e| {
            PlacesError::Decode {
                url: endpoint.to_string(),
                message: format!("invalid endpoint URL: {e}"),
            }
        })?;
        let redacted = redact_url(url.as_str());

        self.rate_limiter.acquire(url.as_str()).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| PlacesError::Network {
                url: redacted.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %redacted, "Places HTTP error");
            return Err(PlacesError::HttpStatus {
                url: redacted,
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| PlacesError::Decode {
            url: redacted,
            message: e.without_url().to_string(),
        })
    }
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("page_token_delay", &self.page_token_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PlaceSearch for PlacesClient {
    #[instrument(skip(self), fields(query = %query))]
    async fn search_all(
        &self,
        query: &str,
        max_pages: u8,
    ) -> Result<Vec<PlaceResult>, PlacesError> {
        let max_pages = max_pages.clamp(1, MAX_PAGES);
        let mut results = Vec::new();
        let mut page = self.text_search(query, None).await?;
        let mut pages_fetched = 1;

        loop {
            results.extend(page.results);
            let Some(token) = page.next_page_token.filter(|_| pages_fetched < max_pages) else {
                break;
            };

            tokio::time::sleep(self.page_token_delay).await;
            page = match self.text_search(query, Some(&token)).await {
                Ok(next) => next,
                Err(PlacesError::InvalidRequest) => {
                    debug!("page token not active yet; waiting and retrying once");
                    tokio::time::sleep(self.page_token_delay).await;
                    self.text_search(query, Some(&token)).await?
                }
                Err(error) => return Err(error),
            };
            pages_fetched += 1;
        }

        debug!(pages = pages_fetched, results = results.len(), "text search complete");
        Ok(results)
    }

    async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
        self.fetch_details(place_id).await
    }
}
