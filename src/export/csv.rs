//! Flat CSV export for spreadsheets and CRMs.

use std::io::Write;

use serde::Serialize;

use crate::normalize::BusinessRecord;

use super::ExportError;

const LIST_SEPARATOR: &str = "; ";

#[derive(Serialize)]
struct Row<'a> {
    dedup_key: String,
    source: &'a str,
    name: &'a str,
    category: &'a str,
    city: &'a str,
    neighborhood: &'a str,
    address: &'a str,
    phone: &'a str,
    whatsapp_url: &'a str,
    website: &'a str,
    email: &'a str,
    instagram: &'a str,
    rating: Option<f32>,
    review_count: Option<u32>,
    price_level: Option<u8>,
    business_status: &'a str,
    maps_url: &'a str,
    latitude: Option<f64>,
    longitude: Option<f64>,
    tags: String,
    discovered_via: String,
    opportunity_score: Option<u8>,
    digital_presence: &'a str,
    summary: &'a str,
    pain_points: String,
    recommended_services: String,
    scraped_at: String,
}

impl<'a> From<&'a BusinessRecord> for Row<'a> {
    fn from(record: &'a BusinessRecord) -> Self {
        let text = |value: &'a Option<String>| value.as_deref().unwrap_or_default();
        let enrichment = record.enrichment.as_ref();
        Self {
            dedup_key: record.dedup_key(),
            source: record.source.as_str(),
            name: &record.name,
            category: record.category.as_str(),
            city: text(&record.city),
            neighborhood: text(&record.neighborhood),
            address: text(&record.address),
            phone: text(&record.phone),
            whatsapp_url: text(&record.whatsapp_url),
            website: text(&record.website),
            email: text(&record.email),
            instagram: text(&record.instagram),
            rating: record.rating,
            review_count: record.review_count,
            price_level: record.price_level,
            business_status: text(&record.business_status),
            maps_url: text(&record.maps_url),
            latitude: record.latitude,
            longitude: record.longitude,
            tags: record.tags.join(LIST_SEPARATOR),
            discovered_via: record.discovered_via.join(LIST_SEPARATOR),
            opportunity_score: enrichment.map(|e| e.opportunity_score),
            digital_presence: enrichment.map_or("", |e| e.digital_presence.as_str()),
            summary: enrichment.map_or("", |e| e.summary.as_str()),
            pain_points: enrichment
                .map(|e| e.pain_points.join(LIST_SEPARATOR))
                .unwrap_or_default(),
            recommended_services: enrichment
                .map(|e| e.recommended_services.join(LIST_SEPARATOR))
                .unwrap_or_default(),
            scraped_at: record.scraped_at.to_rfc3339(),
        }
    }
}

/// Writes one header row and one row per record.
///
/// # Errors
///
/// Returns [`ExportError::Csv`] when serialization or the writer fails.
pub fn write_csv<W: Write>(writer: W, records: &[BusinessRecord]) -> Result<(), ExportError> {
    let mut csv = ::csv::Writer::from_writer(writer);
    if records.is_empty() {
        // serde only emits headers alongside the first row
        csv.write_record(HEADERS)?;
    }
    for record in records {
        csv.serialize(Row::from(record))?;
    }
    csv.flush().map_err(::csv::Error::from)?;
    Ok(())
}

const HEADERS: [&str; 27] = [
    "dedup_key",
    "source",
    "name",
    "category",
    "city",
    "neighborhood",
    "address",
    "phone",
    "whatsapp_url",
    "website",
    "email",
    "instagram",
    "rating",
    "review_count",
    "price_level",
    "business_status",
    "maps_url",
    "latitude",
    "longitude",
    "tags",
    "discovered_via",
    "opportunity_score",
    "digital_presence",
    "summary",
    "pain_points",
    "recommended_services",
    "scraped_at",
];
