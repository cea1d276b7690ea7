//! Agency category taxonomy and the tables mapping source data onto it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fold_text;

/// Business category used for targeting, scoring weights and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Nightlife,
    Bar,
    Restaurant,
    Cafe,
    Hotel,
    Wellness,
    Coworking,
    Tourism,
    RealEstate,
    Health,
    Retail,
    Events,
    Other,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 13] = [
        Category::Nightlife,
        Category::Bar,
        Category::Restaurant,
        Category::Cafe,
        Category::Hotel,
        Category::Wellness,
        Category::Coworking,
        Category::Tourism,
        Category::RealEstate,
        Category::Health,
        Category::Retail,
        Category::Events,
        Category::Other,
    ];

    /// Stable slug used in files, CSV and the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nightlife => "nightlife",
            Self::Bar => "bar",
            Self::Restaurant => "restaurant",
            Self::Cafe => "cafe",
            Self::Hotel => "hotel",
            Self::Wellness => "wellness",
            Self::Coworking => "coworking",
            Self::Tourism => "tourism",
            Self::RealEstate => "real_estate",
            Self::Health => "health",
            Self::Retail => "retail",
            Self::Events => "events",
            Self::Other => "other",
        }
    }

    /// Human-readable label for reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Nightlife => "Nightlife",
            Self::Bar => "Bars",
            Self::Restaurant => "Restaurants",
            Self::Cafe => "Cafés",
            Self::Hotel => "Hotels & Hostels",
            Self::Wellness => "Wellness & Beauty",
            Self::Coworking => "Coworking",
            Self::Tourism => "Tours & Travel",
            Self::RealEstate => "Real Estate",
            Self::Health => "Health & Clinics",
            Self::Retail => "Retail",
            Self::Events => "Events & Promoters",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold_text(s).replace(' ', "_");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == folded)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// Google Places `types` → category, checked in order (most specific first).
const GOOGLE_TYPE_TABLE: &[(&str, Category)] = &[
    ("night_club", Category::Nightlife),
    ("bar", Category::Bar),
    ("liquor_store", Category::Retail),
    ("cafe", Category::Cafe),
    ("bakery", Category::Cafe),
    ("restaurant", Category::Restaurant),
    ("meal_takeaway", Category::Restaurant),
    ("meal_delivery", Category::Restaurant),
    ("lodging", Category::Hotel),
    ("spa", Category::Wellness),
    ("beauty_salon", Category::Wellness),
    ("hair_care", Category::Wellness),
    ("gym", Category::Wellness),
    ("travel_agency", Category::Tourism),
    ("tourist_attraction", Category::Tourism),
    ("real_estate_agency", Category::RealEstate),
    ("dentist", Category::Health),
    ("doctor", Category::Health),
    ("hospital", Category::Health),
    ("physiotherapist", Category::Health),
    ("clothing_store", Category::Retail),
    ("jewelry_store", Category::Retail),
    ("shoe_store", Category::Retail),
    ("store", Category::Retail),
    ("food", Category::Restaurant),
];

/// Name keywords (accent-folded) → category, used when types are missing or generic.
const NAME_KEYWORD_TABLE: &[(&str, Category)] = &[
    ("discoteca", Category::Nightlife),
    ("club", Category::Nightlife),
    ("rooftop", Category::Bar),
    ("bar", Category::Bar),
    ("pub", Category::Bar),
    ("cerveceria", Category::Bar),
    ("coworking", Category::Coworking),
    ("cowork", Category::Coworking),
    ("hostal", Category::Hotel),
    ("hostel", Category::Hotel),
    ("hotel", Category::Hotel),
    ("cafe", Category::Cafe),
    ("coffee", Category::Cafe),
    ("restaurante", Category::Restaurant),
    ("restaurant", Category::Restaurant),
    ("spa", Category::Wellness),
    ("yoga", Category::Wellness),
    ("estetica", Category::Wellness),
    ("tours", Category::Tourism),
    ("tour", Category::Tourism),
    ("inmobiliaria", Category::RealEstate),
    ("clinica", Category::Health),
    ("odontologia", Category::Health),
    ("festival", Category::Events),
    ("eventos", Category::Events),
];

/// Classifies a business from Google types, its name and an optional hint.
///
/// Resolution order: Google type table, name keyword table, caller hint,
/// then [`Category::Other`].
#[must_use]
pub fn classify(types: &[String], name: &str, hint: Option<Category>) -> Category {
    for (google_type, category) in GOOGLE_TYPE_TABLE {
        if types.iter().any(|t| t == google_type) {
            return *category;
        }
    }

    let folded = fold_text(name);
    let words: Vec<&str> = folded.split_whitespace().collect();
    for (keyword, category) in NAME_KEYWORD_TABLE {
        if words.iter().any(|word| word == keyword) {
            return *category;
        }
    }

    hint.unwrap_or(Category::Other)
}
