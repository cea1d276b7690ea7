//! Persistence sinks: Supabase (PostgREST) and the local SQLite store.

mod local;
mod supabase;

pub use local::SqliteSink;
pub use supabase::{SUPABASE_BATCH_SIZE, SupabaseSink};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::DbError;
use crate::http_client::HttpClientError;
use crate::normalize::BusinessRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Client(#[from] HttpClientError),

    #[error("{0} is missing\n  Suggestion: export it in the environment before running `leadscout sync`")]
    MissingCredential(&'static str),

    #[error("invalid Supabase URL '{0}'\n  Suggestion: use the project URL, e.g. https://abcd.supabase.co")]
    InvalidUrl(String),

    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Http { url: String, status: u16, body: String },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination that inserts or updates records by dedup key.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Returns the number of rows written.
    async fn upsert(&self, records: &[BusinessRecord]) -> Result<usize, StoreError>;

    fn name(&self) -> &'static str;
}

/// Flat row shape shared by both sinks.
///
/// Absent values are left out of the serialized row rather than sent as
/// `null`, so a merge-duplicates upsert keeps whatever the table already has.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LeadRow<'a> {
    pub dedup_key: String,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<&'a str>,
    pub name: &'a str,
    pub category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "is_empty_list")]
    pub tags: &'a [String],
    #[serde(skip_serializing_if = "is_empty_list")]
    pub discovered_via: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_presence: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_points: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_services: Option<&'a [String]>,
    pub scraped_at: DateTime<Utc>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_empty_list(list: &&[String]) -> bool {
    list.is_empty()
}

impl<'a> From<&'a BusinessRecord> for LeadRow<'a> {
    fn from(record: &'a BusinessRecord) -> Self {
        let enrichment = record.enrichment.as_ref();
        Self {
            dedup_key: record.dedup_key(),
            source: record.source.as_str(),
            external_id: record.external_id.as_deref(),
            name: &record.name,
            category: record.category.as_str(),
            city: record.city.as_deref(),
            neighborhood: record.neighborhood.as_deref(),
            address: record.address.as_deref(),
            phone: record.phone.as_deref(),
            whatsapp_url: record.whatsapp_url.as_deref(),
            website: record.website.as_deref(),
            email: record.email.as_deref(),
            instagram: record.instagram.as_deref(),
            rating: record.rating,
            review_count: record.review_count,
            price_level: record.price_level,
            business_status: record.business_status.as_deref(),
            maps_url: record.maps_url.as_deref(),
            latitude: record.latitude,
            longitude: record.longitude,
            tags: &record.tags,
            discovered_via: &record.discovered_via,
            opportunity_score: enrichment.map(|e| e.opportunity_score),
            digital_presence: enrichment.map(|e| e.digital_presence.as_str()),
            summary: enrichment.map(|e| e.summary.as_str()),
            pain_points: enrichment.map(|e| e.pain_points.as_slice()),
            recommended_services: enrichment.map(|e| e.recommended_services.as_slice()),
            scraped_at: record.scraped_at,
        }
    }
}
