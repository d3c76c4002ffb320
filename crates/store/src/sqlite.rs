//! SQLite store — the default durable backend.
//!
//! One row per cache key in a single `doc_entries` table with a
//! `(library, topic)` primary key. The absent topic is stored as the empty
//! string so the primary key stays total (SQLite treats NULLs in composite
//! keys as distinct values). Writes are single-statement upserts, which
//! gives whole-entry atomic replacement per key.

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::entry::{CacheEntry, SourceConfidence};
use docvault_core::error::StoreError;
use docvault_core::key::CacheKey;
use docvault_core::store::DocStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite-backed doc store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and table are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite doc store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS doc_entries (
                library      TEXT NOT NULL,
                topic        TEXT NOT NULL DEFAULT '',
                content      TEXT NOT NULL,
                fetched_at   TEXT NOT NULL,
                ttl_seconds  INTEGER NOT NULL,
                confidence   TEXT NOT NULL DEFAULT 'fresh',
                PRIMARY KEY (library, topic)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("doc_entries table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_doc_entries_fetched_at ON doc_entries(fetched_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("fetched_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Empty-string sentinel for the absent topic.
    fn topic_column(key: &CacheKey) -> &str {
        key.topic.as_deref().unwrap_or("")
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<CacheEntry, StoreError> {
        let library: String = row
            .try_get("library")
            .map_err(|e| StoreError::QueryFailed(format!("library column: {e}")))?;
        let topic: String = row
            .try_get("topic")
            .map_err(|e| StoreError::QueryFailed(format!("topic column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
        let fetched_at_str: String = row
            .try_get("fetched_at")
            .map_err(|e| StoreError::QueryFailed(format!("fetched_at column: {e}")))?;
        let ttl_seconds: i64 = row
            .try_get("ttl_seconds")
            .map_err(|e| StoreError::QueryFailed(format!("ttl_seconds column: {e}")))?;
        let confidence_str: String = row
            .try_get("confidence")
            .map_err(|e| StoreError::QueryFailed(format!("confidence column: {e}")))?;

        let fetched_at = chrono::DateTime::parse_from_rfc3339(&fetched_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryFailed(format!("fetched_at parse: {e}")))?;

        let confidence = match confidence_str.as_str() {
            "stale_fallback" => SourceConfidence::StaleFallback,
            _ => SourceConfidence::Fresh,
        };

        let key = if topic.is_empty() {
            CacheKey::library(library)
        } else {
            CacheKey::topic(library, topic)
        };

        Ok(CacheEntry {
            key,
            content,
            fetched_at,
            ttl_seconds: ttl_seconds as u64,
            confidence,
        })
    }

    fn confidence_column(confidence: SourceConfidence) -> &'static str {
        match confidence {
            SourceConfidence::Fresh => "fresh",
            SourceConfidence::StaleFallback => "stale_fallback",
        }
    }
}

#[async_trait]
impl DocStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let row = sqlx::query("SELECT * FROM doc_entries WHERE library = ?1 AND topic = ?2")
            .bind(&key.library)
            .bind(Self::topic_column(key))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET by key: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_entry(r)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), StoreError> {
        let fetched_at = entry.fetched_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO doc_entries (library, topic, content, fetched_at, ttl_seconds, confidence)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(library, topic) DO UPDATE SET
                content = excluded.content,
                fetched_at = excluded.fetched_at,
                ttl_seconds = excluded.ttl_seconds,
                confidence = excluded.confidence
            "#,
        )
        .bind(&entry.key.library)
        .bind(Self::topic_column(&entry.key))
        .bind(&entry.content)
        .bind(&fetched_at)
        .bind(entry.ttl_seconds as i64)
        .bind(Self::confidence_column(entry.confidence))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT failed: {e}")))?;

        debug!(key = %entry.key, "Stored doc entry");
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM doc_entries WHERE library = ?1 AND topic = ?2")
            .bind(&key.library)
            .bind(Self::topic_column(key))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<CacheEntry>, StoreError> {
        let rows = sqlx::query("SELECT * FROM doc_entries ORDER BY library, topic")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("LIST: {e}")))?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM doc_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
