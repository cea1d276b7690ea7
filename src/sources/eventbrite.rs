//! Eventbrite organizer events, used to surface venues hosting live events.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http_client::build_http_client;
use crate::rate_limiter::RateLimiter;
use crate::user_agent;

use super::{SourceError, decode_json, send_paced};

const DEFAULT_BASE_URL: &str = "https://www.eventbriteapi.com";

/// Safety cap on continuation pages per organization.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    events: Vec<EventbriteEvent>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    has_more_items: bool,
    continuation: Option<String>,
}

/// Multipart text field (`{"text": ..., "html": ...}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventText {
    pub text: Option<String>,
}

/// A live event with its venue expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventbriteEvent {
    pub id: String,
    pub name: EventText,
    #[serde(default)]
    pub description: Option<EventText>,
    pub url: Option<String>,
    pub venue: Option<EventbriteVenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventbriteVenue {
    pub id: String,
    pub name: Option<String>,
    pub address: Option<EventbriteAddress>,
}

/// Eventbrite sends coordinates as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventbriteAddress {
    pub address_1: Option<String>,
    pub city: Option<String>,
    pub localized_address_display: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// Bearer-token client for `/v3/organizations/{id}/events/`.
pub struct EventbriteClient {
    client: Client,
    token: String,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl std::fmt::Debug for EventbriteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventbriteClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl EventbriteClient {
    /// # Errors
    ///
    /// Returns [`SourceError::MissingCredential`] for a blank token.
    pub fn new(token: impl Into<String>, rate_limiter: Arc<RateLimiter>) -> Result<Self, SourceError> {
        Self::with_base_url(token, DEFAULT_BASE_URL, rate_limiter)
    }

    /// # Errors
    ///
    /// Same as [`EventbriteClient::new`].
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Result<Self, SourceError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SourceError::MissingCredential("EVENTBRITE_TOKEN"));
        }
        let client = build_http_client("eventbrite", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Lists live events for an organization, following continuation tokens.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidInput`] for a non-numeric organization id
    /// and transport/decode errors otherwise. Pages fetched before a failure
    /// are discarded.
    #[instrument(skip(self))]
    pub async fn organization_events(
        &self,
        organization_id: &str,
    ) -> Result<Vec<EventbriteEvent>, SourceError> {
        let organization_id = organization_id.trim();
        if organization_id.is_empty() || !organization_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(SourceError::InvalidInput(format!(
                "'{organization_id}' is not an Eventbrite organization id"
            )));
        }

        let endpoint = format!(
            "{}/v3/organizations/{organization_id}/events/",
            self.base_url
        );
        let mut events = Vec::new();
        let mut continuation: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut params = vec![("status", "live"), ("expand", "venue")];
            if let Some(token) = continuation.as_deref() {
                params.push(("continuation", token));
            }
            let url = url::Url::parse_with_params(&endpoint, &params)
                .map_err(|e| SourceError::InvalidInput(format!("cannot build Eventbrite URL: {e}")))?
                .to_string();

            let response = send_paced(&self.rate_limiter, &url, || {
                self.client.get(&url).bearer_auth(&self.token)
            })
            .await?;
            let body: EventsPage = decode_json(response, &url).await?;
            debug!(page, events = body.events.len(), "eventbrite page");
            events.extend(body.events);

            match body.pagination {
                Some(Pagination {
                    has_more_items: true,
                    continuation: Some(next),
                }) if !next.is_empty() => continuation = Some(next),
                _ => break,
            }
        }

        Ok(events)
    }
}
