//! Elite scan: sweeps many text search queries and folds the results into
//! one deduplicated lead list.
//!
//! Queries run sequentially with a static delay between them. The only
//! concurrent step is the optional details fetch, bounded by a semaphore.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::dedup::Deduplicator;
use crate::normalize::{BusinessRecord, Category, apply_place_details, normalize_place};
use crate::places::{MAX_PAGES, PlaceSearch, PlacesError};
use crate::query::SearchQuery;

/// Default pause between consecutive text searches.
pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_millis(1500);

/// Default concurrent details requests.
pub const DEFAULT_DETAILS_CONCURRENCY: usize = 5;

/// Errors that stop a scan outright.
///
/// Individual query failures are counted in [`ScanStats`] instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Nothing to scan.
    #[error("no search queries to run\n  Suggestion: pass --category or --term and a --city with neighborhoods")]
    NoQueries,

    /// Google refused the key; later queries would fail the same way.
    #[error("scan aborted: {0}")]
    Fatal(#[source] PlacesError),

    /// Every query failed.
    #[error("all {total} queries failed; last error: {last}")]
    AllQueriesFailed {
        total: usize,
        #[source]
        last: PlacesError,
    },

    /// The details semaphore was closed unexpectedly.
    #[error("details semaphore closed")]
    SemaphoreClosed,
}

/// Tunables for [`EliteScanner::run`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Pages per query (1..=3).
    pub max_pages: u8,
    pub query_delay: Duration,
    pub fetch_details: bool,
    pub details_concurrency: usize,
    pub min_rating: Option<f32>,
    pub min_reviews: Option<u32>,
    pub skip_closed: bool,
    /// Category for results Google types and names cannot classify.
    pub category_hint: Option<Category>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            query_delay: DEFAULT_QUERY_DELAY,
            fetch_details: false,
            details_concurrency: DEFAULT_DETAILS_CONCURRENCY,
            min_rating: None,
            min_reviews: None,
            skip_closed: true,
            category_hint: None,
        }
    }
}

/// Counters for one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub queries_total: usize,
    pub queries_run: usize,
    pub queries_failed: usize,
    pub raw_results: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub details_fetched: usize,
    pub details_failed: usize,
}

/// Result of a scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub records: Vec<BusinessRecord>,
    pub stats: ScanStats,
}

/// Emitted after every query.
#[derive(Debug, Clone)]
pub struct ScanProgress<'a> {
    /// 1-based index of the finished query.
    pub completed: usize,
    pub total: usize,
    pub query: &'a str,
    pub results: usize,
    pub unique_so_far: usize,
    pub failed: bool,
}

/// Runs elite scans against any [`PlaceSearch`] implementation.
pub struct EliteScanner {
    search: Arc<dyn PlaceSearch>,
    options: ScanOptions,
    known_keys: HashSet<String>,
}

impl EliteScanner {
    #[must_use]
    pub fn new(search: Arc<dyn PlaceSearch>, options: ScanOptions) -> Self {
        Self {
            search,
            options,
            known_keys: HashSet::new(),
        }
    }

    /// Drops results whose dedup key is already stored elsewhere.
    #[must_use]
    pub fn with_known_keys(mut self, known_keys: HashSet<String>) -> Self {
        self.known_keys = known_keys;
        self
    }

    /// Runs every query in order and returns the deduplicated, filtered records.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NoQueries`] for an empty query list,
    /// [`ScanError::Fatal`] when Google rejects the key, and
    /// [`ScanError::AllQueriesFailed`] when not a single query succeeded.
    #[instrument(skip_all, fields(queries = queries.len()))]
    pub async fn run<F>(
        &self,
        queries: &[SearchQuery],
        mut on_progress: F,
    ) -> Result<ScanReport, ScanError>
    where
        F: FnMut(&ScanProgress<'_>),
    {
        if queries.is_empty() {
            return Err(ScanError::NoQueries);
        }

        let mut stats = ScanStats {
            queries_total: queries.len(),
            ..ScanStats::default()
        };
        let mut dedup: Deduplicator<BusinessRecord> = Deduplicator::new();
        let mut last_error = None;
        let max_pages = self.options.max_pages.clamp(1, MAX_PAGES);

        info!(total = queries.len(), max_pages, "starting elite scan");

        for (index, query) in queries.iter().enumerate() {
            if index > 0 && !self.options.query_delay.is_zero() {
                tokio::time::sleep(self.options.query_delay).await;
            }

            stats.queries_run += 1;
            let (results, failed) = match self.search.search_all(&query.text, max_pages).await {
                Ok(results) => {
                    stats.raw_results += results.len();
                    for result in &results {
                        dedup.insert(normalize_place(
                            result,
                            None,
                            Some(query),
                            self.options.category_hint,
                        ));
                    }
                    (results.len(), false)
                }
                Err(error @ (PlacesError::Denied(_) | PlacesError::MissingApiKey)) => {
                    return Err(ScanError::Fatal(error));
                }
                Err(error) => {
                    warn!(query = %query.text, error = %error, "query failed; skipping");
                    stats.queries_failed += 1;
                    last_error = Some(error);
                    (0, true)
                }
            };
            debug!(query = %query.text, results, unique = dedup.len(), "query finished");

            on_progress(&ScanProgress {
                completed: index + 1,
                total: queries.len(),
                query: &query.text,
                results,
                unique_so_far: dedup.len(),
                failed,
            });
        }

        if stats.queries_failed == stats.queries_run
            && let Some(last) = last_error
        {
            return Err(ScanError::AllQueriesFailed {
                total: stats.queries_total,
                last,
            });
        }

        stats.duplicates = dedup.duplicates();
        let mut records = dedup.into_vec();
        let before_filter = records.len();
        records.retain(|record| self.keep(record));
        stats.filtered = before_filter - records.len();

        if self.options.fetch_details && !records.is_empty() {
            self.fetch_details(&mut records, &mut stats).await?;
        }

        stats.unique = records.len();
        info!(
            unique = stats.unique,
            duplicates = stats.duplicates,
            filtered = stats.filtered,
            failed = stats.queries_failed,
            "elite scan complete"
        );
        Ok(ScanReport { records, stats })
    }

    fn keep(&self, record: &BusinessRecord) -> bool {
        if self.options.skip_closed && record.is_closed() {
            return false;
        }
        if let Some(min) = self.options.min_rating
            && record.rating.is_none_or(|rating| rating < min)
        {
            return false;
        }
        if let Some(min) = self.options.min_reviews
            && record.review_count.is_none_or(|count| count < min)
        {
            return false;
        }
        !self.known_keys.contains(&record.dedup_key())
    }

    /// Fetches details for records missing a phone or website.
    async fn fetch_details(
        &self,
        records: &mut [BusinessRecord],
        stats: &mut ScanStats,
    ) -> Result<(), ScanError> {
        let semaphore = Arc::new(Semaphore::new(self.options.details_concurrency.max(1)));
        let mut handles = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if record.phone.is_some() && record.website.is_some() {
                continue;
            }
            let Some(place_id) = record.external_id.clone() else {
                continue;
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| ScanError::SemaphoreClosed)?;
            let search = Arc::clone(&self.search);
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = search.place_details(&place_id).await;
                (index, place_id, result)
            }));
        }

        debug!(task_count = handles.len(), "waiting for details requests");

        for handle in handles {
            match handle.await {
                Ok((index, _, Ok(details))) => {
                    apply_place_details(&mut records[index], &details);
                    stats.details_fetched += 1;
                }
                Ok((_, place_id, Err(error))) => {
                    warn!(place_id = %place_id, error = %error, "details request failed");
                    stats.details_failed += 1;
                }
                Err(error) => {
                    warn!(error = %error, "details task panicked");
                    stats.details_failed += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::places::{PlaceDetails, PlaceResult};
    use crate::query::Location;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubSearch {
        pages: HashMap<String, Result<Vec<PlaceResult>, &'static str>>,
        details: HashMap<String, PlaceDetails>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PlaceSearch for StubSearch {
        async fn search_all(
            &self,
            query: &str,
            _max_pages: u8,
        ) -> Result<Vec<PlaceResult>, PlacesError> {
            self.calls.lock().unwrap().push(query.to_string());
            match self.pages.get(query) {
                Some(Ok(results)) => Ok(results.clone()),
                Some(Err("denied")) => Err(PlacesError::Denied("bad key".into())),
                Some(Err(_)) => Err(PlacesError::RateLimited),
                None => Ok(Vec::new()),
            }
        }

        async fn place_details(&self, place_id: &str) -> Result<PlaceDetails, PlacesError> {
            self.details
                .get(place_id)
                .cloned()
                .ok_or_else(|| PlacesError::Api {
                    status: "NOT_FOUND".into(),
                    message: String::new(),
                })
        }
    }

    fn place(id: &str, name: &str, rating: f32, reviews: u32) -> PlaceResult {
        PlaceResult {
            place_id: id.to_string(),
            name: name.to_string(),
            formatted_address: Some("El Poblado, Medellín".to_string()),
            types: vec!["bar".to_string()],
            geometry: None,
            rating: Some(rating),
            user_ratings_total: Some(reviews),
            price_level: None,
            business_status: Some("OPERATIONAL".to_string()),
        }
    }

    fn queries(terms: &[&str]) -> Vec<SearchQuery> {
        terms
            .iter()
            .map(|t| SearchQuery::new(t, Location::neighborhood("Medellín", "El Poblado")))
            .collect()
    }

    fn options() -> ScanOptions {
        ScanOptions {
            query_delay: Duration::ZERO,
            ..ScanOptions::default()
        }
    }

    #[tokio::test]
    async fn test_run_dedups_across_queries_and_reports_progress() {
        let qs = queries(&["rooftop bar", "cocktail bar", "speakeasy"]);
        let mut stub = StubSearch::default();
        stub.pages.insert(
            qs[0].text.clone(),
            Ok(vec![place("p1", "Envy", 4.5, 900), place("p2", "Alambique", 4.7, 500)]),
        );
        stub.pages.insert(
            qs[1].text.clone(),
            Ok(vec![place("p2", "Alambique", 4.7, 520), place("p3", "Vintrash", 4.2, 80)]),
        );
        stub.pages.insert(qs[2].text.clone(), Err("quota"));

        let scanner = EliteScanner::new(Arc::new(stub), options());
        let mut progress = Vec::new();
        let report = scanner
            .run(&qs, |p| progress.push((p.completed, p.failed, p.unique_so_far)))
            .await
            .unwrap();

        let ids: Vec<_> = report
            .records
            .iter()
            .map(|r| r.external_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(report.records[1].discovered_via.len(), 2);
        assert_eq!(report.records[1].review_count, Some(520));
        assert_eq!(
            report.stats,
            ScanStats {
                queries_total: 3,
                queries_run: 3,
                queries_failed: 1,
                raw_results: 4,
                unique: 3,
                duplicates: 1,
                filtered: 0,
                details_fetched: 0,
                details_failed: 0,
            }
        );
        assert_eq!(progress, vec![(1, false, 2), (2, false, 3), (3, true, 3)]);
    }

    #[tokio::test]
    async fn test_filters_are_counted() {
        let qs = queries(&["bar"]);
        let mut closed = place("p3", "Closed Bar", 4.9, 900);
        closed.business_status = Some("CLOSED_PERMANENTLY".to_string());
        let mut stub = StubSearch::default();
        stub.pages.insert(
            qs[0].text.clone(),
            Ok(vec![place("p1", "Good", 4.6, 300), place("p2", "Meh", 3.9, 300), closed]),
        );

        let scanner = EliteScanner::new(
            Arc::new(stub),
            ScanOptions {
                min_rating: Some(4.0),
                ..options()
            },
        );
        let report = scanner.run(&qs, |_| {}).await.unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.stats.filtered, 2);
    }

    #[tokio::test]
    async fn test_known_keys_are_skipped() {
        let qs = queries(&["bar"]);
        let mut stub = StubSearch::default();
        stub.pages.insert(
            qs[0].text.clone(),
            Ok(vec![place("p1", "Old", 4.6, 300), place("p2", "New", 4.6, 300)]),
        );
        let known = HashSet::from(["google_places:p1".to_string()]);
        let scanner = EliteScanner::new(Arc::new(stub), options()).with_known_keys(known);
        let report = scanner.run(&qs, |_| {}).await.unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].name, "New");
    }

    #[tokio::test]
    async fn test_details_fill_contacts_and_failures_are_skipped() {
        let qs = queries(&["bar"]);
        let mut stub = StubSearch::default();
        stub.pages.insert(
            qs[0].text.clone(),
            Ok(vec![place("p1", "A", 4.6, 10), place("p2", "B", 4.6, 10)]),
        );
        stub.details.insert(
            "p1".to_string(),
            PlaceDetails {
                international_phone_number: Some("+57 300 123 4567".to_string()),
                website: Some("https://a.co".to_string()),
                ..PlaceDetails::default()
            },
        );

        let scanner = EliteScanner::new(
            Arc::new(stub),
            ScanOptions {
                fetch_details: true,
                details_concurrency: 2,
                ..options()
            },
        );
        let report = scanner.run(&qs, |_| {}).await.unwrap();
        assert_eq!(report.records[0].phone.as_deref(), Some("+573001234567"));
        assert!(report.records[1].phone.is_none());
        assert_eq!(report.stats.details_fetched, 1);
        assert_eq!(report.stats.details_failed, 1);
    }

    #[tokio::test]
    async fn test_denied_key_aborts() {
        let qs = queries(&["bar", "pub"]);
        let mut stub = StubSearch::default();
        stub.pages.insert(qs[0].text.clone(), Err("denied"));
        let stub = Arc::new(stub);
        let scanner = EliteScanner::new(Arc::clone(&stub) as Arc<dyn PlaceSearch>, options());
        let err = scanner.run(&qs, |_| {}).await.unwrap_err();
        assert!(matches!(err, ScanError::Fatal(PlacesError::Denied(_))));
        assert_eq!(stub.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_an_error() {
        let qs = queries(&["bar"]);
        let mut stub = StubSearch::default();
        stub.pages.insert(qs[0].text.clone(), Err("quota"));
        let scanner = EliteScanner::new(Arc::new(stub), options());
        assert!(matches!(
            scanner.run(&qs, |_| {}).await,
            Err(ScanError::AllQueriesFailed { total: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_queries_rejected() {
        let scanner = EliteScanner::new(Arc::new(StubSearch::default()), options());
        assert!(matches!(scanner.run(&[], |_| {}).await, Err(ScanError::NoQueries)));
    }
}
