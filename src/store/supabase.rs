//! Supabase sink over the PostgREST upsert endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::http_client::{body_excerpt, build_http_client};
use crate::normalize::BusinessRecord;
use crate::user_agent;

use super::{LeadRow, LeadSink, StoreError};

/// Rows per request; PostgREST handles larger bodies but errors get vague.
pub const SUPABASE_BATCH_SIZE: usize = 500;

pub struct SupabaseSink {
    client: Client,
    base_url: String,
    service_key: String,
    table: String,
}

impl std::fmt::Debug for SupabaseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSink")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .field("service_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseSink {
    /// # Errors
    ///
    /// Returns [`StoreError::MissingCredential`] for a blank URL or key and
    /// [`StoreError::InvalidUrl`] when the URL is not http(s).
    pub fn new(
        url: impl Into<String>,
        service_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let url = url.into();
        let service_key = service_key.into();
        if url.trim().is_empty() {
            return Err(StoreError::MissingCredential("SUPABASE_URL"));
        }
        if service_key.trim().is_empty() {
            return Err(StoreError::MissingCredential("SUPABASE_SERVICE_KEY"));
        }
        let parsed = url::Url::parse(url.trim()).map_err(|_| StoreError::InvalidUrl(url.clone()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl(url));
        }
        let client = build_http_client("supabase", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            base_url: url.trim().trim_end_matches('/').to_string(),
            service_key,
            table: table.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}?on_conflict=dedup_key", self.base_url, self.table)
    }

    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn post_batch(&self, rows: &[Value]) -> Result<(), StoreError> {
        let url = self.endpoint();
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await
            .map_err(|source| StoreError::Network {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                url,
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }
        debug!(status = status.as_u16(), "batch accepted");
        Ok(())
    }
}

/// Splits rows into groups that share the same set of columns.
///
/// PostgREST requires every object in a bulk insert to carry the same keys,
/// and rows omit their absent fields. Groups keep the order in which their
/// first row appeared.
fn group_by_columns(records: &[BusinessRecord]) -> Result<Vec<Vec<Value>>, StoreError> {
    let mut groups: Vec<Vec<Value>> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    for record in records {
        let row = serde_json::to_value(LeadRow::from(record))?;
        let columns: Vec<String> = row
            .as_object()
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default();
        match index.get(&columns) {
            Some(&position) => groups[position].push(row),
            None => {
                index.insert(columns, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    Ok(groups)
}

#[async_trait]
impl LeadSink for SupabaseSink {
    async fn upsert(&self, records: &[BusinessRecord]) -> Result<usize, StoreError> {
        let groups = group_by_columns(records)?;
        debug!(groups = groups.len(), "rows grouped by column set");
        let mut written = 0;
        for group in &groups {
            for batch in group.chunks(SUPABASE_BATCH_SIZE) {
                self.post_batch(batch).await?;
                written += batch.len();
            }
        }
        info!(table = %self.table, written, "supabase upsert complete");
        Ok(written)
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enrich::HeuristicEnricher;
    use crate::normalize::{Category, Source};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    fn records(count: usize) -> Vec<BusinessRecord> {
        (0..count)
            .map(|i| {
                let mut record =
                    BusinessRecord::new(Source::GooglePlaces, format!("Bar {i}"), Category::Bar);
                record.external_id = Some(format!("id{i}"));
                record
            })
            .collect()
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            SupabaseSink::new("", "key", "leads"),
            Err(StoreError::MissingCredential("SUPABASE_URL"))
        ));
        assert!(matches!(
            SupabaseSink::new("https://x.supabase.co", " ", "leads"),
            Err(StoreError::MissingCredential("SUPABASE_SERVICE_KEY"))
        ));
        assert!(matches!(
            SupabaseSink::new("ftp://x", "key", "leads"),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let sink = SupabaseSink::new("https://x.supabase.co/", "secret-key", "leads").unwrap();
        let debug = format!("{sink:?}");
        assert!(!debug.contains("secret-key"));
        assert_eq!(sink.endpoint(), "https://x.supabase.co/rest/v1/leads?on_conflict=dedup_key");
    }

    #[tokio::test]
    async fn test_upsert_sends_batches_with_headers() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/rest/v1/leads"))
            .and(query_param("on_conflict", "dedup_key"))
            .and(header("apikey", "svc"))
            .and(header("authorization", "Bearer svc"))
            .and(header("prefer", "resolution=merge-duplicates,return=minimal"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let sink = SupabaseSink::new(server.uri(), "svc", "leads").unwrap();
        let written = sink.upsert(&records(SUPABASE_BATCH_SIZE + 1)).await.unwrap();
        assert_eq!(written, SUPABASE_BATCH_SIZE + 1);
    }

    #[test]
    fn test_group_by_columns_keeps_first_seen_order() {
        let mut rows = records(3);
        rows[1].set_phone("3001234567");
        let groups = group_by_columns(&rows).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0]["name"], "Bar 0");
        assert_eq!(groups[0][1]["name"], "Bar 2");
        assert_eq!(groups[1][0]["name"], "Bar 1");
        assert!(group_by_columns(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_omits_absent_fields_and_keeps_batches_uniform() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/rest/v1/leads"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let mut rows = records(3);
        rows[0].set_phone("3001234567");
        rows[0].enrichment = Some(HeuristicEnricher::assess(&rows[0]));
        let sink = SupabaseSink::new(server.uri(), "svc", "leads").unwrap();
        assert_eq!(sink.upsert(&rows).await.unwrap(), 3);

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<Value> = requests
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect();
        assert_eq!(bodies.len(), 2);

        let enriched = bodies[0].as_array().unwrap();
        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0]["phone"], "+573001234567");
        assert!(enriched[0]["opportunity_score"].is_u64());

        let sparse = bodies[1].as_array().unwrap();
        assert_eq!(sparse.len(), 2);
        for row in sparse {
            let row = row.as_object().unwrap();
            for absent in ["phone", "whatsapp_url", "opportunity_score", "summary", "tags"] {
                assert!(!row.contains_key(absent), "{absent} sent for a sparse row");
            }
            assert!(row.values().all(|value| !value.is_null()));
        }
        let first: Vec<&String> = sparse[0].as_object().unwrap().keys().collect();
        let second: Vec<&String> = sparse[1].as_object().unwrap().keys().collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_surfaces_http_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"message":"column \"foo\" does not exist"}"#),
            )
            .mount(&server)
            .await;

        let sink = SupabaseSink::new(server.uri(), "svc", "leads").unwrap();
        let err = sink.upsert(&records(1)).await.unwrap_err();
        match err {
            StoreError::Http { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("does not exist"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upsert_empty_is_noop() {
        let sink = SupabaseSink::new("http://127.0.0.1:9", "svc", "leads").unwrap();
        assert_eq!(sink.upsert(&[]).await.unwrap(), 0);
    }
}
