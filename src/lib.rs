//! Lead generation toolkit for Colombian local businesses.
//!
//! The pipeline runs in stages that communicate through a JSON array of
//! [`BusinessRecord`]s:
//!
//! - [`query`] and [`scanner`] sweep Google Places text search across many
//!   term and neighborhood variants ([`places`] is the HTTP client)
//! - [`sources`] adds leads from Reddit, Eventbrite, Resident Advisor and
//!   venue websites
//! - [`normalize`] maps every payload into the one record schema and
//!   [`dedup`] folds duplicates within and across sources
//! - [`enrich`] scores each lead with a chat model ([`llm`], [`prompt`]) or
//!   an offline heuristic
//! - [`outreach`] writes emails, WhatsApp openers and audits
//! - [`export`] renders CSV, HTML and markdown, and [`store`] upserts into
//!   Supabase or the local SQLite database ([`db`])

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod db;
pub mod dedup;
pub mod enrich;
pub mod export;
pub mod http_client;
pub mod llm;
pub mod normalize;
pub mod outreach;
pub mod places;
pub mod prompt;
pub mod query;
pub mod rate_limiter;
pub mod scanner;
pub mod sources;
pub mod store;
pub mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use db::{Database, DbError};
pub use dedup::{DEFAULT_FUZZY_THRESHOLD, Deduplicator, cross_source_merge};
pub use enrich::{
    DigitalPresence, EnrichError, EnrichReport, Enricher, Enrichment, HeuristicEnricher,
    LlmEnricher, enrich_batch,
};
pub use export::{ExportError, read_records, write_records};
pub use llm::{ChatClient, ChatMessage, ChatRequest, LlmError, OpenAiChatClient};
pub use normalize::{BusinessRecord, Category, Source};
pub use outreach::{OutreachArtifact, OutreachGenerator, OutreachKind, Persona};
pub use places::{PlaceSearch, PlacesClient, PlacesError};
pub use query::{Location, QueryGenerator, SearchQuery};
pub use rate_limiter::RateLimiter;
pub use scanner::{EliteScanner, ScanError, ScanOptions, ScanProgress, ScanReport, ScanStats};
pub use sources::SourceError;
pub use store::{LeadSink, SqliteSink, StoreError, SupabaseSink};
