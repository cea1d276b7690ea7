//! Search query generation: term × location combinations for an elite scan.
//!
//! Google text search returns at most 60 places per query, so coverage comes
//! from many narrow queries ("rooftop bar in Provenza, Medellín, Colombia")
//! rather than a few broad ones.

pub mod presets;

pub use presets::{
    CATEGORY_PRESETS, CITY_PRESETS, CategoryPreset, CityPreset, category_preset, city_preset,
};

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A city, optionally narrowed to one neighborhood.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub neighborhood: Option<String>,
}

impl Location {
    #[must_use]
    pub fn city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            neighborhood: None,
        }
    }

    #[must_use]
    pub fn neighborhood(city: impl Into<String>, neighborhood: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            neighborhood: Some(neighborhood.into()),
        }
    }

    /// `"{neighborhood}, {city}"` or `"{city}"`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.neighborhood.as_deref() {
            Some(n) if !n.trim().is_empty() => format!("{}, {}", n.trim(), self.city.trim()),
            _ => self.city.trim().to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One text search to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub term: String,
    pub location: Location,
    /// Full text sent to Google.
    pub text: String,
}

impl SearchQuery {
    #[must_use]
    pub fn new(term: &str, location: Location) -> Self {
        let term = term.trim().to_string();
        let text = format!("{term} in {}, Colombia", location.label());
        Self {
            term,
            location,
            text,
        }
    }
}

/// Builds the cartesian product of search terms and locations.
///
/// ```
/// use leadscout_core::query::{Location, QueryGenerator};
///
/// let queries = QueryGenerator::new(
///     vec!["rooftop bar".into(), "speakeasy".into()],
///     vec![Location::neighborhood("Medellín", "El Poblado"), Location::city("Medellín")],
/// )
/// .generate();
/// assert_eq!(queries.len(), 4);
/// assert_eq!(queries[0].text, "rooftop bar in El Poblado, Medellín, Colombia");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryGenerator {
    terms: Vec<String>,
    locations: Vec<Location>,
    max_queries: Option<usize>,
}

impl QueryGenerator {
    #[must_use]
    pub fn new(terms: Vec<String>, locations: Vec<Location>) -> Self {
        Self {
            terms,
            locations,
            max_queries: None,
        }
    }

    /// Caps the number of generated queries (useful to bound API spend).
    #[must_use]
    pub fn with_max_queries(mut self, max_queries: usize) -> Self {
        self.max_queries = Some(max_queries);
        self
    }

    /// Term-major product; blank terms skipped, case-insensitive duplicates dropped.
    #[must_use]
    pub fn generate(&self) -> Vec<SearchQuery> {
        let limit = self.max_queries.unwrap_or(usize::MAX);
        let mut seen = HashSet::new();
        let mut queries = Vec::new();

        'terms: for term in &self.terms {
            if term.trim().is_empty() {
                continue;
            }
            for location in &self.locations {
                if queries.len() >= limit {
                    break 'terms;
                }
                let query = SearchQuery::new(term, location.clone());
                if seen.insert(query.text.to_lowercase()) {
                    queries.push(query);
                }
            }
        }

        queries
    }
}

/// Expands a city preset into scan locations.
///
/// `neighborhoods_filter` keeps only the named neighborhoods (matched
/// accent-insensitively; unknown names are used verbatim). A city-wide
/// location is appended when `include_city_wide` is set or when no
/// neighborhood survives.
#[must_use]
pub fn locations_for_city(
    preset: &CityPreset,
    neighborhoods_filter: &[String],
    include_city_wide: bool,
) -> Vec<Location> {
    let mut locations: Vec<Location> = if neighborhoods_filter.is_empty() {
        preset
            .neighborhoods
            .iter()
            .map(|n| Location::neighborhood(preset.name, *n))
            .collect()
    } else {
        neighborhoods_filter
            .iter()
            .filter(|wanted| !wanted.trim().is_empty())
            .map(|wanted| {
                let folded = crate::normalize::fold_text(wanted);
                let name = preset
                    .neighborhoods
                    .iter()
                    .find(|n| crate::normalize::fold_text(n) == folded)
                    .map_or_else(|| wanted.trim().to_string(), |n| (*n).to_string());
                Location::neighborhood(preset.name, name)
            })
            .collect()
    };

    if include_city_wide || locations.is_empty() {
        locations.push(Location::city(preset.name));
    }
    locations
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_generate_is_term_major() {
        let queries = QueryGenerator::new(
            terms(&["spa", "yoga studio"]),
            vec![Location::city("Cali"), Location::neighborhood("Cali", "Granada")],
        )
        .generate();
        let texts: Vec<&str> = queries.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "spa in Cali, Colombia",
                "spa in Granada, Cali, Colombia",
                "yoga studio in Cali, Colombia",
                "yoga studio in Granada, Cali, Colombia",
            ]
        );
    }

    #[test]
    fn test_generate_skips_blank_and_duplicate_terms() {
        let queries = QueryGenerator::new(
            terms(&["  Hostel ", "", "hostel", "   "]),
            vec![Location::city("Cartagena")],
        )
        .generate();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].term, "Hostel");
    }

    #[test]
    fn test_generate_respects_max_queries() {
        let queries = QueryGenerator::new(
            terms(&["a", "b", "c"]),
            vec![Location::city("Cali"), Location::city("Bogotá")],
        )
        .with_max_queries(3)
        .generate();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[2].term, "b");
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        assert!(QueryGenerator::new(vec![], vec![Location::city("Cali")]).generate().is_empty());
        assert!(QueryGenerator::new(terms(&["spa"]), vec![]).generate().is_empty());
    }

    #[test]
    fn test_locations_for_city_all_neighborhoods() {
        let preset = city_preset("cali").unwrap();
        let locations = locations_for_city(preset, &[], false);
        assert_eq!(locations.len(), preset.neighborhoods.len());
        assert!(locations.iter().all(|l| l.city == "Cali"));
    }

    #[test]
    fn test_locations_for_city_filter_matches_accents() {
        let preset = city_preset("medellin").unwrap();
        let locations = locations_for_city(preset, &["belen".to_string()], true);
        assert_eq!(
            locations,
            vec![
                Location::neighborhood("Medellín", "Belén"),
                Location::city("Medellín"),
            ]
        );
    }

    #[test]
    fn test_location_label() {
        assert_eq!(Location::city("Cali").label(), "Cali");
        assert_eq!(
            Location::neighborhood("Bogotá", "Chapinero").to_string(),
            "Chapinero, Bogotá"
        );
    }
}
