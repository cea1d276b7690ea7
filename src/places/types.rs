//! Google Places (legacy web service) response payloads.

use serde::{Deserialize, Serialize};

/// `textsearch/json` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    pub next_page_token: Option<String>,
    pub error_message: Option<String>,
}

/// `details/json` response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DetailsResponse {
    pub status: String,
    pub result: Option<PlaceDetails>,
    pub error_message: Option<String>,
}

/// One text search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: String,
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub geometry: Option<Geometry>,
    pub rating: Option<f32>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
    pub business_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Contact fields fetched per place with `details/json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub formatted_phone_number: Option<String>,
    pub international_phone_number: Option<String>,
    pub website: Option<String>,
    /// Google Maps URL for the place.
    pub url: Option<String>,
    pub opening_hours: Option<OpeningHours>,
    pub editorial_summary: Option<EditorialSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorialSummary {
    pub overview: Option<String>,
}

/// One page of text search results.
#[derive(Debug, Clone, Default)]
pub struct TextSearchPage {
    pub results: Vec<PlaceResult>,
    pub next_page_token: Option<String>,
}
