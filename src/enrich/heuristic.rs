//! Offline enrichment from the record's visible gaps.
//!
//! Weights favour established businesses (many reviews) with weak online
//! presence: they have budget and the most to gain.

use async_trait::async_trait;
use chrono::Utc;

use crate::normalize::{BusinessRecord, Category};

use super::{DigitalPresence, EnrichError, Enricher, Enrichment, clamp_score};

const BASE_SCORE: i64 = 35;

/// Categories the agency sells to most successfully.
fn category_weight(category: Category) -> i64 {
    match category {
        Category::Nightlife
        | Category::Bar
        | Category::Restaurant
        | Category::Hotel
        | Category::Tourism => 10,
        Category::Cafe | Category::Wellness | Category::Coworking | Category::RealEstate => 5,
        Category::Health | Category::Retail | Category::Events | Category::Other => 0,
    }
}

fn presence(record: &BusinessRecord) -> DigitalPresence {
    let channels = [
        record.website.is_some(),
        record.instagram.is_some(),
        record.email.is_some(),
        record.whatsapp_url.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    match channels {
        0 => DigitalPresence::None,
        1 => DigitalPresence::Weak,
        2 => DigitalPresence::Moderate,
        _ => DigitalPresence::Strong,
    }
}

/// Opportunity score (1..=100) computed without a model.
#[must_use]
pub fn heuristic_score(record: &BusinessRecord) -> u8 {
    if record.is_closed() {
        return 1;
    }
    let mut score = BASE_SCORE;
    if record.website.is_none() {
        score += 20;
    }
    if record.phone.is_none() {
        score += 5;
    }
    if record.instagram.is_none() {
        score += 5;
    }
    score += match record.review_count.unwrap_or(0) {
        500.. => 15,
        100..500 => 10,
        20..100 => 5,
        _ => 0,
    };
    if record.rating.is_some_and(|rating| rating < 4.0) {
        score += 10;
    }
    score += category_weight(record.category);
    clamp_score(score)
}

/// Deterministic enricher used with `--offline` and as the model fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEnricher;

impl HeuristicEnricher {
    /// Builds the full assessment synchronously.
    #[must_use]
    pub fn assess(record: &BusinessRecord) -> Enrichment {
        let mut pain_points = Vec::new();
        let mut services = Vec::new();

        if record.website.is_none() {
            pain_points.push("No website found".to_string());
            services.push("Website design".to_string());
            services.push("Local SEO".to_string());
        }
        if record.instagram.is_none() {
            pain_points.push("No Instagram profile linked".to_string());
            services.push("Social media management".to_string());
        }
        if record.phone.is_some() && record.whatsapp_url.is_none() {
            pain_points.push("No WhatsApp contact channel".to_string());
            services.push("WhatsApp Business automation".to_string());
        }
        if record.rating.is_some_and(|rating| rating < 4.0) {
            pain_points.push("Google rating below 4.0".to_string());
            services.push("Reputation management".to_string());
        }
        if record.review_count.unwrap_or(0) < 20 {
            pain_points.push("Few Google reviews".to_string());
            services.push("Review generation campaign".to_string());
        }
        if services.is_empty() {
            services.push("Paid social campaigns".to_string());
        }

        let digital_presence = presence(record);
        let place = record
            .neighborhood
            .as_deref()
            .or(record.city.as_deref())
            .map(|p| format!(" in {p}"))
            .unwrap_or_default();
        let reviews = match (record.rating, record.review_count) {
            (Some(rating), Some(count)) => format!(" rated {rating:.1} across {count} reviews"),
            _ => String::new(),
        };
        let summary = format!(
            "{name} ({category}{place}){reviews} has {presence} online presence.",
            name = record.name,
            category = record.category.label(),
            presence = digital_presence,
        );

        Enrichment {
            summary,
            opportunity_score: heuristic_score(record),
            pain_points,
            recommended_services: services,
            digital_presence,
            model: "heuristic".to_string(),
            enriched_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Enricher for HeuristicEnricher {
    async fn enrich(&self, record: &BusinessRecord) -> Result<Enrichment, EnrichError> {
        Ok(Self::assess(record))
    }
}
