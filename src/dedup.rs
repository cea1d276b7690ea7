//! Insertion-ordered deduplication of scraped records.
//!
//! Each item exposes a string key; a second item with the same key is merged
//! into the first instead of being stored. Output order is the order of first
//! discovery, which is the only ordering guarantee a scan gives.

use std::collections::HashMap;

use strsim::jaro_winkler;
use tracing::debug;

use crate::normalize::{BusinessRecord, Source, fold_text};

/// Default Jaro-Winkler similarity for [`cross_source_merge`].
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.93;

/// An item that can be keyed and merged.
pub trait Mergeable {
    fn dedup_key(&self) -> String;

    /// Folds `other` (a later duplicate) into `self`.
    fn merge(&mut self, other: Self);
}

/// What happened to an inserted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Inserted,
    Merged,
}

/// Keyed, insertion-ordered collection.
#[derive(Debug, Clone)]
pub struct Deduplicator<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
    duplicates: usize,
}

impl<T> Default for Deduplicator<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            duplicates: 0,
        }
    }
}

impl<T: Mergeable> Deduplicator<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: T) -> DedupOutcome {
        let key = item.dedup_key();
        if let Some(&position) = self.index.get(&key) {
            self.items[position].merge(item);
            self.duplicates += 1;
            DedupOutcome::Merged
        } else {
            self.index.insert(key, self.items.len());
            self.items.push(item);
            DedupOutcome::Inserted
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of inserts that were merged into an existing item.
    #[must_use]
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Mergeable> Extend<T> for Deduplicator<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T: Mergeable> FromIterator<T> for Deduplicator<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut dedup = Self::new();
        dedup.extend(iter);
        dedup
    }
}

fn fill<V>(slot: &mut Option<V>, other: Option<V>) {
    if slot.is_none() {
        *slot = other;
    }
}

impl Mergeable for BusinessRecord {
    fn dedup_key(&self) -> String {
        BusinessRecord::dedup_key(self)
    }

    /// First-seen values win; gaps are filled from `other`.
    fn merge(&mut self, other: Self) {
        fill(&mut self.external_id, other.external_id);
        fill(&mut self.address, other.address);
        fill(&mut self.city, other.city);
        fill(&mut self.neighborhood, other.neighborhood);
        if self.latitude.is_none() || self.longitude.is_none() {
            self.latitude = self.latitude.or(other.latitude);
            self.longitude = self.longitude.or(other.longitude);
        }
        if self.phone.is_none() {
            self.phone = other.phone;
            self.whatsapp_url = self.whatsapp_url.take().or(other.whatsapp_url);
        } else {
            fill(&mut self.whatsapp_url, other.whatsapp_url);
        }
        fill(&mut self.website, other.website);
        fill(&mut self.email, other.email);
        fill(&mut self.instagram, other.instagram);
        fill(&mut self.rating, other.rating);
        self.review_count = match (self.review_count, other.review_count) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        fill(&mut self.price_level, other.price_level);
        fill(&mut self.business_status, other.business_status);
        fill(&mut self.maps_url, other.maps_url);
        fill(&mut self.description, other.description);
        fill(&mut self.enrichment, other.enrichment);
        if self.raw_types.is_empty() {
            self.raw_types = other.raw_types;
        }
        if self.opening_hours.is_empty() {
            self.opening_hours = other.opening_hours;
        }
        for tag in other.tags {
            self.add_tag(tag);
        }
        for label in other.discovered_via {
            self.add_discovered_via(label);
        }
    }
}

/// Folds records that share no identifier but name the same business.
///
/// Two records from different sources merge when their folded names reach
/// `threshold` Jaro-Winkler similarity and their folded cities are equal (a
/// missing city never matches). When a Google Places record is involved it survives and
/// absorbs the other; otherwise the earlier record survives. Order of the
/// survivors is preserved.
#[must_use]
pub fn cross_source_merge(records: Vec<BusinessRecord>, threshold: f64) -> Vec<BusinessRecord> {
    let mut survivors: Vec<BusinessRecord> = Vec::with_capacity(records.len());
    let mut folded: Vec<(String, String, Source)> = Vec::with_capacity(records.len());
    let mut merged = 0usize;

    for record in records {
        let name = fold_text(&record.name);
        let city = fold_text(record.city.as_deref().unwrap_or_default());

        let matching = if name.is_empty() || city.is_empty() {
            None
        } else {
            folded.iter().position(|(other_name, other_city, other_source)| {
                *other_source != record.source
                    && *other_city == city
                    && comparable_lengths(&name, other_name)
                    && jaro_winkler(&name, other_name) >= threshold
            })
        };

        match matching {
            Some(position) => {
                merged += 1;
                let existing = &mut survivors[position];
                if record.source == Source::GooglePlaces && existing.source != Source::GooglePlaces {
                    let previous = std::mem::replace(existing, record);
                    existing.merge(previous);
                    folded[position].0 = fold_text(&existing.name);
                    folded[position].2 = Source::GooglePlaces;
                } else {
                    existing.merge(record);
                }
            }
            None => {
                folded.push((name, city, record.source));
                survivors.push(record);
            }
        }
    }

    debug!(merged, survivors = survivors.len(), "cross-source merge complete");
    survivors
}

/// Names more than twice as long as each other never match.
fn comparable_lengths(name: &str, other: &str) -> bool {
    let (a, b) = (name.chars().count(), other.chars().count());
    a.max(b) <= a.min(b) * 2
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::Category;

    fn google(id: &str, name: &str) -> BusinessRecord {
        let mut record = BusinessRecord::new(Source::GooglePlaces, name, Category::Bar);
        record.external_id = Some(id.to_string());
        record.city = Some("Medellín".to_string());
        record
    }

    #[test]
    fn test_insert_merges_same_place_id() {
        let mut first = google("p1", "Envy Rooftop");
        first.discovered_via = vec!["rooftop bar in El Poblado, Medellín, Colombia".to_string()];
        first.review_count = Some(100);
        let mut second = google("p1", "Envy Rooftop Bar");
        second.discovered_via = vec!["cocktail bar in El Poblado, Medellín, Colombia".to_string()];
        second.review_count = Some(250);
        second.phone = Some("+573001234567".to_string());

        let mut dedup = Deduplicator::new();
        assert_eq!(dedup.insert(first), DedupOutcome::Inserted);
        assert_eq!(dedup.insert(second), DedupOutcome::Merged);
        assert_eq!(dedup.len(), 1);
        assert_eq!(dedup.duplicates(), 1);

        let record = &dedup.into_vec()[0];
        assert_eq!(record.name, "Envy Rooftop");
        assert_eq!(record.discovered_via.len(), 2);
        assert_eq!(record.review_count, Some(250));
        assert_eq!(record.phone.as_deref(), Some("+573001234567"));
    }

    #[test]
    fn test_order_is_first_discovery() {
        let dedup: Deduplicator<BusinessRecord> = vec![
            google("b", "B"),
            google("a", "A"),
            google("b", "B again"),
            google("c", "C"),
        ]
        .into_iter()
        .collect();
        let names: Vec<String> = dedup.into_vec().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_contains_uses_record_key() {
        let mut dedup = Deduplicator::new();
        dedup.insert(google("p9", "X"));
        assert!(dedup.contains("google_places:p9"));
        assert!(!dedup.contains("google_places:p10"));
    }

    #[test]
    fn test_records_without_ids_key_on_name_and_city() {
        let mut a = BusinessRecord::new(Source::Website, "Café Velvet", Category::Cafe);
        a.city = Some("Medellín".to_string());
        let mut b = BusinessRecord::new(Source::Website, "CAFE VELVET", Category::Cafe);
        b.city = Some("medellin".to_string());
        b.email = Some("hola@cafevelvet.co".to_string());

        let mut dedup = Deduplicator::new();
        dedup.insert(a);
        assert_eq!(dedup.insert(b), DedupOutcome::Merged);
        assert_eq!(dedup.into_vec()[0].email.as_deref(), Some("hola@cafevelvet.co"));
    }

    #[test]
    fn test_cross_source_merge_prefers_google_record() {
        let mut website = BusinessRecord::new(Source::Website, "Cafe Velvet", Category::Cafe);
        website.external_id = Some("cafevelvet.co".to_string());
        website.city = Some("Medellín".to_string());
        website.email = Some("hola@cafevelvet.co".to_string());
        let place = google("p1", "Café Velvet");
        let other = google("p2", "Pergamino Café");

        let merged = cross_source_merge(vec![website, place, other], DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source, Source::GooglePlaces);
        assert_eq!(merged[0].external_id.as_deref(), Some("p1"));
        assert_eq!(merged[0].email.as_deref(), Some("hola@cafevelvet.co"));
        assert_eq!(merged[1].name, "Pergamino Café");
    }

    #[test]
    fn test_cross_source_merge_requires_same_city() {
        let mut a = BusinessRecord::new(Source::ResidentAdvisor, "La Octava", Category::Nightlife);
        a.city = Some("Bogotá".to_string());
        let b = google("p2", "La Octava");
        let merged = cross_source_merge(vec![a, b], DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_cross_source_merge_keeps_distinct_google_places() {
        let a = google("p1", "Crepes & Waffles");
        let b = google("p2", "Crepes & Waffles");
        let merged = cross_source_merge(vec![a, b], DEFAULT_FUZZY_THRESHOLD);
        assert_eq!(merged.len(), 2);
    }
}
