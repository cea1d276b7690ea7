//! SQLite sink backed by [`Database`].

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::db::Database;
use crate::dedup::Mergeable;
use crate::normalize::BusinessRecord;

use super::{LeadRow, LeadSink, StoreError};

const UPSERT_SQL: &str = r"
INSERT INTO businesses (
    dedup_key, source, external_id, name, category, city, neighborhood, address,
    phone, whatsapp_url, website, email, instagram, rating, review_count,
    opportunity_score, digital_presence, summary, record_json, scraped_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(dedup_key) DO UPDATE SET
    source = excluded.source,
    external_id = COALESCE(excluded.external_id, businesses.external_id),
    name = excluded.name,
    category = excluded.category,
    city = COALESCE(excluded.city, businesses.city),
    neighborhood = COALESCE(excluded.neighborhood, businesses.neighborhood),
    address = COALESCE(excluded.address, businesses.address),
    phone = COALESCE(excluded.phone, businesses.phone),
    whatsapp_url = COALESCE(excluded.whatsapp_url, businesses.whatsapp_url),
    website = COALESCE(excluded.website, businesses.website),
    email = COALESCE(excluded.email, businesses.email),
    instagram = COALESCE(excluded.instagram, businesses.instagram),
    rating = COALESCE(excluded.rating, businesses.rating),
    review_count = COALESCE(excluded.review_count, businesses.review_count),
    opportunity_score = COALESCE(excluded.opportunity_score, businesses.opportunity_score),
    digital_presence = COALESCE(excluded.digital_presence, businesses.digital_presence),
    summary = COALESCE(excluded.summary, businesses.summary),
    record_json = excluded.record_json,
    scraped_at = excluded.scraped_at,
    updated_at = datetime('now')
";

/// Local store; also feeds `scan --skip-known`.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    db: Database,
}

impl SqliteSink {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Number of stored businesses.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM businesses")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Every stored dedup key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] if the query fails.
    pub async fn known_keys(&self) -> Result<HashSet<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT dedup_key FROM businesses")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    /// Loads a stored record by key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] or [`StoreError::Serialize`].
    pub async fn get(&self, dedup_key: &str) -> Result<Option<BusinessRecord>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT record_json FROM businesses WHERE dedup_key = ?")
                .bind(dedup_key)
                .fetch_optional(self.db.pool())
                .await?;
        row.map(|(json,)| serde_json::from_str(&json).map_err(StoreError::from))
            .transpose()
    }
}

#[async_trait]
impl LeadSink for SqliteSink {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[BusinessRecord]) -> Result<usize, StoreError> {
        let mut tx = self.db.pool().begin().await?;
        for record in records {
            let mut merged = record.clone();
            let stored: Option<(String,)> =
                sqlx::query_as("SELECT record_json FROM businesses WHERE dedup_key = ?")
                    .bind(record.dedup_key())
                    .fetch_optional(&mut *tx)
                    .await?;
            if let Some((json,)) = stored {
                // the incoming record wins; the stored one only fills its gaps
                match serde_json::from_str::<BusinessRecord>(&json) {
                    Ok(existing) => merged.merge(existing),
                    Err(e) => {
                        warn!(key = %record.dedup_key(), error = %e, "stored record unreadable, replacing it");
                    }
                }
            }

            let row = LeadRow::from(&merged);
            let json = serde_json::to_string(&merged)?;
            sqlx::query(UPSERT_SQL)
                .bind(&row.dedup_key)
                .bind(row.source)
                .bind(row.external_id)
                .bind(row.name)
                .bind(row.category)
                .bind(row.city)
                .bind(row.neighborhood)
                .bind(row.address)
                .bind(row.phone)
                .bind(row.whatsapp_url)
                .bind(row.website)
                .bind(row.email)
                .bind(row.instagram)
                .bind(row.rating)
                .bind(row.review_count)
                .bind(row.opportunity_score.map(i64::from))
                .bind(row.digital_presence)
                .bind(row.summary)
                .bind(json)
                .bind(row.scraped_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!(written = records.len(), "sqlite upsert complete");
        Ok(records.len())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
