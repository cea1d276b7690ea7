//! Reddit subreddit search via the public JSON listing endpoints.
//!
//! Posts in city subreddits (`r/Medellin`, `r/Colombia`, `r/bogota`) asking
//! for recommendations or announcing openings are treated as lead signals.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http_client::build_http_client;
use crate::rate_limiter::RateLimiter;
use crate::user_agent;

use super::{SourceError, decode_json, send_paced};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Reddit caps listing pages at 100 items.
const MAX_LIMIT: u16 = 100;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: RedditPost,
}

/// A submission from a listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub permalink: String,
    pub subreddit: String,
    pub author: Option<String>,
    pub created_utc: Option<f64>,
    pub url: Option<String>,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub score: i64,
}

/// Client for `/r/{subreddit}/search.json`.
#[derive(Debug)]
pub struct RedditClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl RedditClient {
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
        let client = build_http_client("reddit", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Searches one subreddit, newest first, within the last month.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidInput`] for malformed subreddit names or
    /// blank queries, and transport/decode errors otherwise.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        subreddit: &str,
        query: &str,
        limit: u16,
    ) -> Result<Vec<RedditPost>, SourceError> {
        let subreddit = validate_subreddit(subreddit)?;
        if query.trim().is_empty() {
            return Err(SourceError::InvalidInput("search query is empty".to_string()));
        }
        let limit = limit.clamp(1, MAX_LIMIT).to_string();

        let endpoint = format!("{}/r/{subreddit}/search.json", self.base_url);
        let url = url::Url::parse_with_params(
            &endpoint,
            [
                ("q", query.trim()),
                ("restrict_sr", "1"),
                ("sort", "new"),
                ("t", "month"),
                ("limit", limit.as_str()),
                ("raw_json", "1"),
            ],
        )
        .map_err(|e| SourceError::InvalidInput(format!("cannot build Reddit URL: {e}")))?;
        let url = url.to_string();

        let response = send_paced(&self.rate_limiter, &url, || self.client.get(&url)).await?;
        let listing: Listing = decode_json(response, &url).await?;
        let posts: Vec<RedditPost> = listing.data.children.into_iter().map(|c| c.data).collect();
        debug!(posts = posts.len(), "reddit search complete");
        Ok(posts)
    }
}

/// Accepts `Medellin`, `r/Medellin` or `/r/Medellin`; Reddit names are 2-21 of `[A-Za-z0-9_]`.
fn validate_subreddit(raw: &str) -> Result<&str, SourceError> {
    let name = raw
        .trim()
        .trim_start_matches('/')
        .trim_start_matches("r/")
        .trim_end_matches('/');
    let valid = (2..=21).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(SourceError::InvalidInput(format!(
            "'{raw}' is not a valid subreddit name"
        )))
    }
}
