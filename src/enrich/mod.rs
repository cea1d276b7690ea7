//! Business enrichment: summaries, pain points and an opportunity score.
//!
//! [`LlmEnricher`] asks a chat model for a JSON assessment;
//! [`HeuristicEnricher`] derives one offline from the record's gaps. Both sit
//! behind the [`Enricher`] trait so [`enrich_batch`] works with either.

mod heuristic;

pub use heuristic::{HeuristicEnricher, heuristic_score};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::llm::{ChatClient, ChatRequest, LlmError, extract_json_object};
use crate::normalize::BusinessRecord;
use crate::prompt::enrichment_prompt;

/// Upper bound on concurrent enrichment calls.
pub const MAX_CONCURRENCY: usize = 20;

/// Default concurrent enrichment calls.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// How visible a business is online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitalPresence {
    None,
    Weak,
    Moderate,
    Strong,
}

impl DigitalPresence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }

    fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "nula" | "ninguna" => Some(Self::None),
            "weak" | "low" | "debil" | "débil" | "baja" => Some(Self::Weak),
            "moderate" | "medium" | "media" | "moderada" => Some(Self::Moderate),
            "strong" | "high" | "fuerte" | "alta" => Some(Self::Strong),
            _ => None,
        }
    }
}

impl fmt::Display for DigitalPresence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assessment attached to a [`BusinessRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub summary: String,
    /// Sales potential, always within 1..=100.
    pub opportunity_score: u8,
    #[serde(default)]
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub recommended_services: Vec<String>,
    pub digital_presence: DigitalPresence,
    /// Model id, or `heuristic` for offline scoring.
    pub model: String,
    pub enriched_at: DateTime<Utc>,
}

/// Clamps any integer into the 1..=100 score range.
#[must_use]
pub fn clamp_score(raw: i64) -> u8 {
    u8::try_from(raw.clamp(1, 100)).unwrap_or(1)
}

/// Errors from enriching one record.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model answered without a usable JSON object.
    #[error("model response was not a usable assessment: {0}")]
    InvalidResponse(String),

    #[error("enrichment semaphore closed")]
    SemaphoreClosed,
}

/// Produces an [`Enrichment`] for one record.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, record: &BusinessRecord) -> Result<Enrichment, EnrichError>;
}

/// Loose shape of the model's JSON; every field is optional.
#[derive(Debug, Deserialize)]
struct RawAssessment {
    summary: Option<String>,
    opportunity_score: Option<serde_json::Value>,
    #[serde(default)]
    pain_points: Vec<String>,
    #[serde(default)]
    recommended_services: Vec<String>,
    digital_presence: Option<String>,
}

fn score_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s.trim().trim_end_matches("/100").trim().parse().ok(),
        _ => None,
    }
}

/// Chat-model enricher.
pub struct LlmEnricher {
    client: Arc<dyn ChatClient>,
}

impl LlmEnricher {
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn parse(&self, record: &BusinessRecord, reply: &str) -> Result<Enrichment, EnrichError> {
        let json = extract_json_object(reply)
            .ok_or_else(|| EnrichError::InvalidResponse("no JSON object in reply".to_string()))?;
        let raw: RawAssessment = serde_json::from_str(json)
            .map_err(|e| EnrichError::InvalidResponse(e.to_string()))?;

        let fallback = HeuristicEnricher::assess(record);
        let opportunity_score = raw
            .opportunity_score
            .as_ref()
            .and_then(score_from_value)
            .map_or_else(
                || {
                    debug!(name = %record.name, "model omitted score; using heuristic");
                    fallback.opportunity_score
                },
                clamp_score,
            );

        Ok(Enrichment {
            summary: raw
                .summary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(fallback.summary),
            opportunity_score,
            pain_points: raw.pain_points,
            recommended_services: raw.recommended_services,
            digital_presence: raw
                .digital_presence
                .as_deref()
                .and_then(DigitalPresence::parse_loose)
                .unwrap_or(fallback.digital_presence),
            model: self.client.model().to_string(),
            enriched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl Enricher for LlmEnricher {
    #[instrument(skip(self, record), fields(name = %record.name))]
    async fn enrich(&self, record: &BusinessRecord) -> Result<Enrichment, EnrichError> {
        let request = ChatRequest::new(enrichment_prompt(record))
            .json()
            .with_temperature(0.2);
        let reply = self.client.complete(request).await?;
        self.parse(record, &reply)
    }
}

/// Outcome of [`enrich_batch`].
#[derive(Debug, Clone)]
pub struct EnrichReport {
    /// All input records in input order; failed ones are left unenriched.
    pub records: Vec<BusinessRecord>,
    pub enriched: usize,
    pub failed: usize,
    /// Records that already carried an enrichment.
    pub skipped: usize,
}

/// Enriches records concurrently, at most `concurrency` (1..=20) at a time.
///
/// Records that already have an enrichment are left alone. `on_progress`
/// receives `(done, total)` for records actually sent.
///
/// # Errors
///
/// Returns [`EnrichError::SemaphoreClosed`] only if the internal semaphore
/// is closed; per-record failures are logged and counted.
#[instrument(skip_all, fields(records = records.len(), concurrency))]
pub async fn enrich_batch<F>(
    enricher: Arc<dyn Enricher>,
    mut records: Vec<BusinessRecord>,
    concurrency: usize,
    mut on_progress: F,
) -> Result<EnrichReport, EnrichError>
where
    F: FnMut(usize, usize),
{
    let concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::new();
    let mut skipped = 0;

    for (index, record) in records.iter().enumerate() {
        if record.enrichment.is_some() {
            skipped += 1;
            continue;
        }
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| EnrichError::SemaphoreClosed)?;
        let enricher = Arc::clone(&enricher);
        let record = record.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            let result = enricher.enrich(&record).await;
            (index, record.name, result)
        }));
    }

    let total = handles.len();
    info!(total, skipped, concurrency, "enriching records");

    let (mut enriched, mut failed) = (0, 0);
    for (done, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok((index, _, Ok(enrichment))) => {
                records[index].enrichment = Some(enrichment);
                enriched += 1;
            }
            Ok((_, name, Err(error))) => {
                warn!(name = %name, error = %error, "enrichment failed; leaving record unenriched");
                failed += 1;
            }
            Err(error) => {
                warn!(error = %error, "enrichment task panicked");
                failed += 1;
            }
        }
        on_progress(done + 1, total);
    }

    info!(enriched, failed, skipped, "enrichment complete");
    Ok(EnrichReport {
        records,
        enriched,
        failed,
        skipped,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::{Category, Source};
    use std::sync::Mutex;

    struct CannedChat {
        reply: Result<String, ()>,
        seen: Mutex<usize>,
    }

    #[async_trait]
    impl ChatClient for CannedChat {
        async fn complete(&self, _request: ChatRequest) -> Result<String, LlmError> {
            *self.seen.lock().unwrap() += 1;
            self.reply.clone().map_err(|()| LlmError::EmptyCompletion)
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    fn canned(reply: &str) -> Arc<CannedChat> {
        Arc::new(CannedChat {
            reply: Ok(reply.to_string()),
            seen: Mutex::new(0),
        })
    }

    fn record(name: &str) -> BusinessRecord {
        let mut record = BusinessRecord::new(Source::GooglePlaces, name, Category::Bar);
        record.city = Some("Medellín".to_string());
        record.rating = Some(4.5);
        record.review_count = Some(600);
        record
    }

    #[tokio::test]
    async fn test_llm_enricher_parses_fenced_json_and_clamps() {
        let chat = canned(
            "```json\n{\"summary\":\"Busy bar without a site\",\"opportunity_score\":140,\
             \"pain_points\":[\"no website\"],\"recommended_services\":[\"web design\"],\
             \"digital_presence\":\"Weak\"}\n```",
        );
        let enricher = LlmEnricher::new(chat);
        let enrichment = enricher.enrich(&record("Bar A")).await.unwrap();
        assert_eq!(enrichment.opportunity_score, 100);
        assert_eq!(enrichment.summary, "Busy bar without a site");
        assert_eq!(enrichment.digital_presence, DigitalPresence::Weak);
        assert_eq!(enrichment.model, "canned");
    }

    #[tokio::test]
    async fn test_llm_enricher_falls_back_to_heuristic_score() {
        let enricher = LlmEnricher::new(canned(r#"{"summary":"ok"}"#));
        let input = record("Bar B");
        let enrichment = enricher.enrich(&input).await.unwrap();
        assert_eq!(enrichment.opportunity_score, heuristic_score(&input));
    }

    #[tokio::test]
    async fn test_llm_enricher_accepts_string_scores() {
        let enricher = LlmEnricher::new(canned(r#"{"summary":"ok","opportunity_score":"72/100"}"#));
        let enrichment = enricher.enrich(&record("Bar C")).await.unwrap();
        assert_eq!(enrichment.opportunity_score, 72);
    }

    #[tokio::test]
    async fn test_llm_enricher_rejects_prose() {
        let enricher = LlmEnricher::new(canned("I cannot help with that."));
        assert!(matches!(
            enricher.enrich(&record("Bar D")).await,
            Err(EnrichError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-5), 1);
        assert_eq!(clamp_score(0), 1);
        assert_eq!(clamp_score(55), 55);
        assert_eq!(clamp_score(1_000), 100);
    }

    #[tokio::test]
    async fn test_enrich_batch_preserves_order_and_skips_enriched() {
        let chat = canned(r#"{"summary":"s","opportunity_score":60}"#);
        let enricher: Arc<dyn Enricher> = Arc::new(LlmEnricher::new(chat.clone()));

        let mut already = record("Second");
        already.enrichment = Some(HeuristicEnricher::assess(&already));
        let records = vec![record("First"), already, record("Third")];

        let mut progress = Vec::new();
        let report = enrich_batch(enricher, records, 2, |done, total| progress.push((done, total)))
            .await
            .unwrap();

        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second", "Third"]);
        assert_eq!(report.enriched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.records[0].opportunity_score(), Some(60));
        assert_eq!(report.records[1].enrichment.as_ref().unwrap().model, "heuristic");
        assert_eq!(*chat.seen.lock().unwrap(), 2);
        assert_eq!(progress, vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn test_enrich_batch_counts_failures() {
        let chat = Arc::new(CannedChat {
            reply: Err(()),
            seen: Mutex::new(0),
        });
        let enricher: Arc<dyn Enricher> = Arc::new(LlmEnricher::new(chat));
        let report = enrich_batch(enricher, vec![record("A"), record("B")], 50, |_, _| {})
            .await
            .unwrap();
        assert_eq!(report.failed, 2);
        assert!(report.records.iter().all(|r| r.enrichment.is_none()));
    }
}
