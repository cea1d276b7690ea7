//! Resident Advisor event listings via the public GraphQL endpoint.
//!
//! Listings are filtered by RA area id and a date window; the venue attached
//! to each listing is what becomes a lead.

use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http_client::build_http_client;
use crate::rate_limiter::RateLimiter;
use crate::user_agent;

use super::{SourceError, decode_json, send_paced};

const DEFAULT_BASE_URL: &str = "https://ra.co";

const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 5;

const EVENT_LISTINGS_QUERY: &str = r"query GET_EVENT_LISTINGS($filters: FilterInputDtoInput, $pageSize: Int, $page: Int) {
  eventListings(filters: $filters, pageSize: $pageSize, page: $page) {
    data {
      id
      listingDate
      event {
        id
        title
        date
        contentUrl
        venue { id name address contentUrl }
      }
    }
    totalResults
  }
}";

/// Well-known RA area ids for Colombian cities.
pub const AREA_IDS: &[(&str, u32)] = &[("medellin", 554), ("bogota", 553), ("cartagena", 1054)];

/// Looks up an RA area id by city preset name.
#[must_use]
pub fn area_for_city(city: &str) -> Option<u32> {
    let folded = crate::normalize::fold_text(city).replace(' ', "-");
    AREA_IDS
        .iter()
        .find(|(name, _)| *name == folded)
        .map(|(_, id)| *id)
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ListingsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingsData {
    event_listings: EventListings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListings {
    #[serde(default)]
    data: Vec<RaListing>,
    #[serde(default)]
    total_results: u32,
}

/// One listing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaListing {
    pub id: String,
    pub listing_date: Option<String>,
    pub event: RaEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaEvent {
    pub id: String,
    pub title: String,
    pub date: Option<String>,
    pub content_url: Option<String>,
    pub venue: Option<RaVenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaVenue {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub content_url: Option<String>,
}

/// Client for `POST /graphql`.
#[derive(Debug)]
pub struct ResidentAdvisorClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl ResidentAdvisorClient {
    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if the HTTP client cannot be built.
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, rate_limiter)
    }

    /// # Errors
    ///
    /// Returns [`SourceError::Client`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, SourceError> {
        let client = build_http_client("resident-advisor", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Fetches listings for an area between two dates (inclusive).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidInput`] when `to < from`, and
    /// [`SourceError::Decode`] when GraphQL reports errors.
    #[instrument(skip(self))]
    pub async fn area_events(
        &self,
        area_id: u32,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RaListing>, SourceError> {
        if to < from {
            return Err(SourceError::InvalidInput(format!(
                "date window ends ({to}) before it starts ({from})"
            )));
        }
        let url = format!("{}/graphql", self.base_url);
        let mut listings = Vec::new();

        for page in 1..=MAX_PAGES {
            let body = serde_json::json!({
                "operationName": "GET_EVENT_LISTINGS",
                "query": EVENT_LISTINGS_QUERY,
                "variables": {
                    "filters": {
                        "areas": {"eq": area_id},
                        "listingDate": {
                            "gte": format!("{from}T00:00:00.000Z"),
                            "lte": format!("{to}T23:59:59.999Z"),
                        },
                    },
                    "pageSize": PAGE_SIZE,
                    "page": page,
                },
            });

            let response = send_paced(&self.rate_limiter, &url, || {
                self.client
                    .post(&url)
                    .header(reqwest::header::REFERER, format!("{}/events", self.base_url))
                    .json(&body)
            })
            .await?;
            let decoded: GraphQlResponse = decode_json(response, &url).await?;

            if let Some(first) = decoded.errors.first() {
                return Err(SourceError::Decode {
                    url: url.clone(),
                    message: format!("GraphQL error: {}", first.message),
                });
            }
            let Some(data) = decoded.data else {
                return Err(SourceError::Decode {
                    url: url.clone(),
                    message: "response has no data".to_string(),
                });
            };

            let batch = data.event_listings.data;
            let total = data.event_listings.total_results;
            let batch_len = batch.len();
            listings.extend(batch);
            debug!(page, batch_len, total, "resident advisor page");

            if batch_len == 0 || listings.len() >= total as usize {
                break;
            }
        }

        Ok(listings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn listing(id: &str, venue: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "listingDate": "2026-11-07T00:00:00.000",
            "event": {
                "id": format!("e{id}"),
                "title": "Techno Night",
                "date": "2026-11-07T00:00:00.000",
                "contentUrl": format!("/events/{id}"),
                "venue": {"id": venue, "name": "Club Vintrash", "address": "Cl. 10 #40-20", "contentUrl": "/clubs/99"}
            }
        })
    }

    #[test]
    fn test_area_for_city() {
        assert_eq!(area_for_city("Medellín"), Some(554));
        assert_eq!(area_for_city("bogota"), Some(553));
        assert_eq!(area_for_city("santa marta"), None);
    }

    #[tokio::test]
    async fn test_event_listings_paginates_until_total() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(serde_json::json!({"variables": {"page": 2}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"eventListings": {"data": [listing("2", "99")], "totalResults": 2}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(serde_json::json!({"variables": {"page": 1, "filters": {"areas": {"eq": 554}}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"eventListings": {"data": [listing("1", "99")], "totalResults": 2}}
            })))
            .mount(&server)
            .await;

        let client =
            ResidentAdvisorClient::with_base_url(server.uri(), Arc::new(RateLimiter::disabled()))
                .unwrap();
        let from = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 11, 30).unwrap();
        let listings = client.area_events(554, from, to).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].event.venue.as_ref().unwrap().id, "99");
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{"message": "bad filter"}]
            })))
            .mount(&server)
            .await;

        let client =
            ResidentAdvisorClient::with_base_url(server.uri(), Arc::new(RateLimiter::disabled()))
                .unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let err = client.area_events(554, day, day).await.unwrap_err();
        assert!(err.to_string().contains("bad filter"));
    }

    #[tokio::test]
    async fn test_inverted_window_rejected() {
        let client =
            ResidentAdvisorClient::with_base_url("http://127.0.0.1:9", Arc::new(RateLimiter::disabled()))
                .unwrap();
        let from = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        assert!(matches!(
            client.area_events(554, from, to).await,
            Err(SourceError::InvalidInput(_))
        ));
    }
}
