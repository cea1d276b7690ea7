//! Normalized business schema and mappers from every scraped source.
//!
//! Each third-party payload (Google Places, Reddit, Eventbrite, Resident
//! Advisor, venue websites) is mapped into a single [`BusinessRecord`] so the
//! deduplicator, enricher and exporters only ever see one shape.

pub mod category;
pub mod phone;
mod sources;

pub use category::{Category, classify};
pub use sources::{
    apply_contacts, normalize_eventbrite_event, normalize_place, normalize_ra_event,
    normalize_reddit_post, normalize_website,
};
pub(crate) use sources::apply_place_details;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrich::Enrichment;

/// Where a record was scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    GooglePlaces,
    Website,
    Reddit,
    Eventbrite,
    ResidentAdvisor,
}

impl Source {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GooglePlaces => "google_places",
            Self::Website => "website",
            Self::Reddit => "reddit",
            Self::Eventbrite => "eventbrite",
            Self::ResidentAdvisor => "resident_advisor",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_places" => Ok(Self::GooglePlaces),
            "website" => Ok(Self::Website),
            "reddit" => Ok(Self::Reddit),
            "eventbrite" => Ok(Self::Eventbrite),
            "resident_advisor" => Ok(Self::ResidentAdvisor),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// A scraped business in the single normalized schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub source: Source,
    /// Identifier in the source system (Google `place_id`, venue id, post id).
    pub external_id: Option<String>,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub raw_types: Vec<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// E.164 phone number (`+57…`).
    pub phone: Option<String>,
    pub whatsapp_url: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub instagram: Option<String>,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub price_level: Option<u8>,
    pub business_status: Option<String>,
    pub maps_url: Option<String>,
    pub description: Option<String>,
    /// Weekly schedule lines from place details (`"lunes: 18:00–2:00"`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opening_hours: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Query texts (or source labels) that surfaced this record.
    #[serde(default)]
    pub discovered_via: Vec<String>,
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
}

impl BusinessRecord {
    /// Creates a record with only the mandatory fields set.
    #[must_use]
    pub fn new(source: Source, name: impl Into<String>, category: Category) -> Self {
        Self {
            source,
            external_id: None,
            name: name.into().trim().to_string(),
            category,
            raw_types: Vec::new(),
            address: None,
            city: None,
            neighborhood: None,
            latitude: None,
            longitude: None,
            phone: None,
            whatsapp_url: None,
            website: None,
            email: None,
            instagram: None,
            rating: None,
            review_count: None,
            price_level: None,
            business_status: None,
            maps_url: None,
            description: None,
            opening_hours: Vec::new(),
            tags: Vec::new(),
            discovered_via: Vec::new(),
            scraped_at: Utc::now(),
            enrichment: None,
        }
    }

    /// Identity used for deduplication and database upserts.
    ///
    /// `"{source}:{external_id}"` when the source provides an identifier,
    /// otherwise `"name:{folded name}|{folded city}"`.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        match self.external_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("{}:{id}", self.source),
            _ => format!(
                "name:{}|{}",
                fold_text(&self.name),
                fold_text(self.city.as_deref().unwrap_or_default())
            ),
        }
    }

    /// Normalizes and stores a phone number, deriving the WhatsApp link.
    ///
    /// Unparseable numbers leave the record untouched.
    pub fn set_phone(&mut self, raw: &str) {
        if let Some(e164) = phone::normalize_colombian_phone(raw) {
            self.whatsapp_url = phone::whatsapp_url(&e164, None);
            self.phone = Some(e164);
        }
    }

    /// Stores a website URL if it parses as http(s).
    pub fn set_website(&mut self, raw: &str) {
        if let Some(url) = clean_http_url(raw) {
            self.website = Some(url);
        }
    }

    /// Opportunity score from enrichment, when present.
    #[must_use]
    pub fn opportunity_score(&self) -> Option<u8> {
        self.enrichment.as_ref().map(|e| e.opportunity_score)
    }

    /// True when Google reports the business as permanently closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.business_status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("CLOSED_PERMANENTLY"))
    }

    /// Adds a tag unless already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Records a discovery label unless already present.
    pub fn add_discovered_via(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !label.is_empty() && !self.discovered_via.contains(&label) {
            self.discovered_via.push(label);
        }
    }
}

/// Lowercases, strips Spanish accents and collapses non-alphanumerics to single spaces.
///
/// ```
/// use leadscout_core::normalize::fold_text;
///
/// assert_eq!(fold_text("  Café  Médellín-Poblado "), "cafe medellin poblado");
/// ```
#[must_use]
pub fn fold_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        let ch = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        };
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Accepts `http(s)` URLs (adding `https://` to bare domains) and drops the fragment.
#[must_use]
pub fn clean_http_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let mut parsed = url::Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https")
        || parsed.host_str().is_none()
        || !parsed.username().is_empty()
        || parsed.password().is_some()
    {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Trims text and drops it when empty; long text is cut at a char boundary.
#[must_use]
pub(crate) fn clean_text(raw: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() <= max_chars {
        return Some(trimmed.to_string());
    }
    let mut cut: String = trimmed.chars().take(max_chars).collect();
    cut.push('…');
    Some(cut)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_prefers_external_id() {
        let mut record = BusinessRecord::new(Source::GooglePlaces, "Envy Rooftop", Category::Bar);
        record.external_id = Some("ChIJ123".to_string());
        assert_eq!(record.dedup_key(), "google_places:ChIJ123");
    }

    #[test]
    fn test_dedup_key_falls_back_to_name_and_city() {
        let mut record = BusinessRecord::new(Source::Website, "Café Zeppelin", Category::Cafe);
        record.city = Some("Medellín".to_string());
        assert_eq!(record.dedup_key(), "name:cafe zeppelin|medellin");

        record.external_id = Some("   ".to_string());
        assert_eq!(record.dedup_key(), "name:cafe zeppelin|medellin");
    }

    #[test]
    fn test_set_phone_derives_whatsapp_for_mobile() {
        let mut record = BusinessRecord::new(Source::GooglePlaces, "X", Category::Bar);
        record.set_phone("300 555 1212");
        assert_eq!(record.phone.as_deref(), Some("+573005551212"));
        assert_eq!(
            record.whatsapp_url.as_deref(),
            Some("https://wa.me/573005551212")
        );
    }

    #[test]
    fn test_set_phone_ignores_garbage() {
        let mut record = BusinessRecord::new(Source::GooglePlaces, "X", Category::Bar);
        record.set_phone("n/a");
        assert!(record.phone.is_none());
        assert!(record.whatsapp_url.is_none());
    }

    #[test]
    fn test_is_closed() {
        let mut record = BusinessRecord::new(Source::GooglePlaces, "X", Category::Bar);
        assert!(!record.is_closed());
        record.business_status = Some("CLOSED_PERMANENTLY".to_string());
        assert!(record.is_closed());
        record.business_status = Some("CLOSED_TEMPORARILY".to_string());
        assert!(!record.is_closed());
    }

    #[test]
    fn test_clean_http_url() {
        assert_eq!(
            clean_http_url("elpoblado.co").as_deref(),
            Some("https://elpoblado.co/")
        );
        assert_eq!(
            clean_http_url("http://bar.com/menu#top").as_deref(),
            Some("http://bar.com/menu")
        );
        assert_eq!(clean_http_url("mailto:a@b.co"), None);
        assert_eq!(clean_http_url(""), None);
    }

    #[test]
    fn test_clean_text_truncates() {
        assert_eq!(clean_text(Some("  hola "), 10).as_deref(), Some("hola"));
        assert_eq!(clean_text(Some(""), 10), None);
        assert_eq!(clean_text(Some("abcdef"), 3).as_deref(), Some("abc…"));
        assert_eq!(clean_text(None, 3), None);
    }

    #[test]
    fn test_record_serde_roundtrip_keeps_fields() {
        let mut record = BusinessRecord::new(Source::Reddit, "Post", Category::Events);
        record.tags = vec!["r/Medellin".to_string()];
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"source\":\"reddit\""));
        assert!(!json.contains("enrichment"));
        let back: BusinessRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
