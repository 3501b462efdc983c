//! Append-only generation history backed by SQLite.
//!
//! One table, `history`, holds every generated document:
//!
//! ```text
//! id                 INTEGER PRIMARY KEY AUTOINCREMENT
//! source_identifier  TEXT NOT NULL
//! artifact           TEXT NOT NULL
//! created_at         TEXT NOT NULL   -- ISO-8601, UTC
//! ```
//!
//! `AUTOINCREMENT` keeps ids from being reused. Each append is a single
//! `INSERT`, so concurrent writers rely on SQLite's own locking.
//! There are no update or delete operations.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{HistoryRecord, RecordId};

pub struct HistoryStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl HistoryStore {
    /// Open the database file at `path`, creating it if missing.
    ///
    /// The schema is not touched; call [`initialize`](Self::initialize).
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect(path).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the history table if it does not exist. Safe to repeat.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source_identifier TEXT NOT NULL,
                artifact TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| self.unavailable(e))?;

        Ok(())
    }

    /// Insert a record stamped with the current UTC time and return its id.
    pub async fn append(&self, source_identifier: &str, artifact: &str) -> Result<RecordId> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            "INSERT INTO history (source_identifier, artifact, created_at) VALUES (?, ?, ?)",
        )
        .bind(source_identifier)
        .bind(artifact)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| self.unavailable(e))?;

        let id = result.last_insert_rowid();
        debug!("saved history record {} for {}", id, source_identifier);
        Ok(id)
    }

    /// All records, newest (highest id) first.
    pub async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            "SELECT id, source_identifier, artifact, created_at FROM history ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.unavailable(e))?;

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }

    /// A single record by id.
    pub async fn get(&self, id: RecordId) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query(
            "SELECT id, source_identifier, artifact, created_at FROM history WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.unavailable(e))?;

        row.as_ref().map(|r| self.row_to_record(r)).transpose()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    fn row_to_record(&self, row: &SqliteRow) -> Result<HistoryRecord> {
        let created_at: String = row.try_get("created_at").map_err(|e| self.unavailable(e))?;
        Ok(HistoryRecord {
            id: row.try_get("id").map_err(|e| self.unavailable(e))?,
            source_identifier: row
                .try_get("source_identifier")
                .map_err(|e| self.unavailable(e))?,
            artifact: row.try_get("artifact").map_err(|e| self.unavailable(e))?,
            created_at: parse_timestamp(&created_at).ok_or_else(|| {
                self.unavailable(format!("unreadable created_at '{}'", created_at))
            })?,
        })
    }

    fn unavailable(&self, err: impl std::fmt::Display) -> Error {
        Error::store(&self.path, err)
    }
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp taken to be UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn fresh_store(tmp: &TempDir) -> HistoryStore {
        let store = HistoryStore::open(&tmp.path().join("history.sqlite"))
            .await
            .unwrap();
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = fresh_store(&tmp).await;
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_first() {
        let tmp = TempDir::new().unwrap();
        let store = fresh_store(&tmp).await;

        let first = store.append("https://example.com/a.git", "doc1").await.unwrap();
        let second = store.append("https://example.com/b.git", "doc2").await.unwrap();
        assert_eq!((first, second), (1, 2));

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert_eq!(records[0].source_identifier, "https://example.com/b.git");
        assert_eq!(records[0].artifact, "doc2");
        assert_eq!(records[1].id, 1);
        assert_eq!(records[1].source_identifier, "https://example.com/a.git");
        assert_eq!(records[1].artifact, "doc1");
        assert!(records[0].created_at >= records[1].created_at);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent_and_keeps_data() {
        let tmp = TempDir::new().unwrap();
        let store = fresh_store(&tmp).await;
        store.append("repo", "doc").await.unwrap();

        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let tmp = TempDir::new().unwrap();
        let store = fresh_store(&tmp).await;
        let id = store.append("repo", "# Title").await.unwrap();

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.artifact, "# Title");
        assert!(store.get(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_without_schema_is_store_error() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::open(&tmp.path().join("bare.sqlite"))
            .await
            .unwrap();

        let err = store.append("repo", "doc").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable { .. }));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2025-01-02T03:04:05.123456Z").unwrap();
        assert_eq!(rfc.year(), 2025);
        assert_eq!(rfc.hour(), 3);

        let offset = parse_timestamp("2025-01-02T04:04:05.123456+01:00").unwrap();
        assert_eq!(offset, rfc);

        assert!(parse_timestamp("2025-01-02T03:04:05.123456").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_every_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.sqlite");
        let stores = [
            Arc::new(HistoryStore::open(&path).await.unwrap()),
            Arc::new(HistoryStore::open(&path).await.unwrap()),
        ];
        for store in &stores {
            store.initialize().await.unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..100 {
            let store = Arc::clone(&stores[i % 2]);
            handles.push(tokio::spawn(async move {
                store.append(&format!("repo-{}", i), "doc").await
            }));
        }
        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 100);

        let records = stores[0].list_all().await.unwrap();
        assert_eq!(records.len(), 100);
        let listed: HashSet<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_open_under_a_file_is_store_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        match HistoryStore::open(&blocker.join("history.sqlite")).await {
            Err(Error::StoreUnavailable { .. }) => {}
            Err(other) => panic!("expected StoreUnavailable, got {:?}", other),
            Ok(_) => panic!("opened a store beneath a regular file"),
        }
    }
}
