//! Local SQLite lead store: one `businesses` table keyed by dedup key.
//!
//! Opening a store creates the file and its parent directory when missing,
//! switches the journal to WAL so `scan --skip-known` can read while a sync
//! writes, and applies the bundled migrations.
//!
//! ```no_run
//! use leadscout_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("data/leads.db")).await?;
//! println!("journal: {}", db.journal_mode().await?);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// SQLite serializes writers; a handful of readers is plenty.
const POOL_SIZE: u32 = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("cannot open lead store: {0}\n  Suggestion: check the --db path or `sqlite_path` in config.toml")]
    Connection(#[from] sqlx::Error),

    #[error("lead store schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("cannot create directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens or creates the store at `path` and migrates it.
    ///
    /// # Errors
    ///
    /// [`DbError::Directory`] when the parent directory cannot be created,
    /// [`DbError::Connection`] or [`DbError::Migration`] otherwise.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn new(path: &Path) -> Result<Self, DbError> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DbError::Directory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(POOL_SIZE)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// Private in-memory store (single connection, so every query sees the
    /// same database).
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] or [`DbError::Migration`].
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("lead store migrations applied");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current journal mode, lowercased (`wal` for file stores).
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the pragma cannot be read.
    pub async fn journal_mode(&self) -> Result<String, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.to_ascii_lowercase())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn insert(db: &Database, key: &str, source: &str, score: Option<i64>) -> bool {
        sqlx::query(
            "INSERT INTO businesses \
             (dedup_key, source, name, category, opportunity_score, record_json, scraped_at) \
             VALUES (?, ?, 'Café Velvet', 'cafe', ?, '{}', datetime('now'))",
        )
        .bind(key)
        .bind(source)
        .bind(score)
        .execute(db.pool())
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn test_migrated_store_accepts_lead_rows() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(insert(&db, "google_places:abc", "google_places", Some(72)).await);
        assert!(insert(&db, "name:cafe velvet|cali", "website", None).await);
    }

    #[tokio::test]
    async fn test_rejects_unknown_source() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(!insert(&db, "tiktok:1", "tiktok", None).await);
    }

    #[tokio::test]
    async fn test_rejects_score_outside_range() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(!insert(&db, "reddit:a", "reddit", Some(0)).await);
        assert!(!insert(&db, "reddit:b", "reddit", Some(101)).await);
        assert!(insert(&db, "reddit:c", "reddit", Some(100)).await);
    }

    #[tokio::test]
    async fn test_dedup_key_is_unique() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(insert(&db, "eventbrite:9", "eventbrite", None).await);
        assert!(!insert(&db, "eventbrite:9", "eventbrite", None).await);
    }

    #[tokio::test]
    async fn test_file_store_creates_parent_and_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("leads.db");

        let db = Database::new(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.journal_mode().await.unwrap(), "wal");
        db.close().await;

        // reopening runs migrations again without error
        let reopened = Database::new(&path).await.unwrap();
        assert!(insert(&reopened, "google_places:x", "google_places", None).await);
    }
}
