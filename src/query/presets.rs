//! Built-in search-term and city tables.
//!
//! Terms mix Spanish and English because Google ranks listings by the
//! language of their reviews and both audiences review venues here.

use crate::normalize::{Category, fold_text};

/// A named group of search terms targeting one vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPreset {
    pub slug: &'static str,
    pub label: &'static str,
    /// Category assigned when Google types and the name give no signal.
    pub category: Category,
    pub terms: &'static [&'static str],
}

/// A city and the neighborhoods an elite scan sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CityPreset {
    pub slug: &'static str,
    pub name: &'static str,
    pub neighborhoods: &'static [&'static str],
}

pub const CATEGORY_PRESETS: &[CategoryPreset] = &[
    CategoryPreset {
        slug: "nightlife",
        label: "Nightlife & bars",
        category: Category::Nightlife,
        terms: &[
            "nightclub",
            "discoteca",
            "rooftop bar",
            "cocktail bar",
            "bar de salsa",
            "gastrobar",
            "speakeasy",
            "karaoke bar",
            "craft beer bar",
        ],
    },
    CategoryPreset {
        slug: "restaurants",
        label: "Restaurants & cafés",
        category: Category::Restaurant,
        terms: &[
            "restaurante",
            "fine dining restaurant",
            "brunch",
            "vegan restaurant",
            "café de especialidad",
            "panadería artesanal",
            "sushi",
            "steakhouse",
        ],
    },
    CategoryPreset {
        slug: "hotels",
        label: "Hotels & hostels",
        category: Category::Hotel,
        terms: &[
            "boutique hotel",
            "hostel",
            "hotel",
            "apartahotel",
            "glamping",
        ],
    },
    CategoryPreset {
        slug: "wellness",
        label: "Wellness & beauty",
        category: Category::Wellness,
        terms: &[
            "spa",
            "yoga studio",
            "gimnasio",
            "crossfit",
            "peluquería",
            "barbería",
            "centro de estética",
            "pilates",
        ],
    },
    CategoryPreset {
        slug: "coworking",
        label: "Coworking",
        category: Category::Coworking,
        terms: &["coworking", "oficinas compartidas", "coliving"],
    },
    CategoryPreset {
        slug: "tourism",
        label: "Tours & experiences",
        category: Category::Tourism,
        terms: &[
            "tour operator",
            "agencia de viajes",
            "city tour",
            "paragliding",
            "coffee farm tour",
            "escuela de español",
        ],
    },
    CategoryPreset {
        slug: "real-estate",
        label: "Real estate",
        category: Category::RealEstate,
        terms: &[
            "inmobiliaria",
            "real estate agency",
            "property management",
            "arriendos amoblados",
        ],
    },
];

pub const CITY_PRESETS: &[CityPreset] = &[
    CityPreset {
        slug: "medellin",
        name: "Medellín",
        neighborhoods: &[
            "El Poblado",
            "Provenza",
            "Laureles",
            "Estadio",
            "Envigado",
            "Sabaneta",
            "Belén",
            "Manila",
            "Centro",
        ],
    },
    CityPreset {
        slug: "bogota",
        name: "Bogotá",
        neighborhoods: &[
            "Chapinero",
            "Zona T",
            "Parque 93",
            "Usaquén",
            "La Candelaria",
            "Teusaquillo",
            "Chicó",
        ],
    },
    CityPreset {
        slug: "cartagena",
        name: "Cartagena",
        neighborhoods: &[
            "Getsemaní",
            "Centro Histórico",
            "Bocagrande",
            "Manga",
            "El Laguito",
        ],
    },
    CityPreset {
        slug: "cali",
        name: "Cali",
        neighborhoods: &["Granada", "San Antonio", "El Peñón", "Ciudad Jardín"],
    },
    CityPreset {
        slug: "santa-marta",
        name: "Santa Marta",
        neighborhoods: &["El Rodadero", "Taganga", "Centro Histórico", "Bello Horizonte"],
    },
];

/// Folds `"Santa Marta"`, `"santa_marta"` and `"SANTA-MARTA"` to `"santa-marta"`.
fn slug_key(input: &str) -> String {
    fold_text(input).replace(' ', "-")
}

/// Looks up a category preset by slug, case- and accent-insensitively.
#[must_use]
pub fn category_preset(slug: &str) -> Option<&'static CategoryPreset> {
    let key = slug_key(slug);
    CATEGORY_PRESETS.iter().find(|preset| preset.slug == key)
}

/// Looks up a city preset by slug or display name (`medellín` == `medellin`).
#[must_use]
pub fn city_preset(slug: &str) -> Option<&'static CityPreset> {
    let key = slug_key(slug);
    CITY_PRESETS
        .iter()
        .find(|preset| preset.slug == key || slug_key(preset.name) == key)
}

/// Finds the city preset whose name appears in free text (an address, a subreddit).
#[must_use]
pub fn city_in_text(text: &str) -> Option<&'static CityPreset> {
    let folded = format!(" {} ", fold_text(text));
    CITY_PRESETS.iter().find(|preset| {
        let needle = format!(" {} ", fold_text(preset.name));
        folded.contains(&needle)
    })
}
