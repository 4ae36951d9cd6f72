//! SQLite-backed article table.
//!
//! One row per article. Authors are stored as a JSON array in a TEXT column.
//! Scans page through the table in primary-key order using the last seen
//! identifier as the cursor.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use litreview_core::{is_sql_identifier, ArticleRecord, LitReviewError};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::article::{ArticleStore, ScanPage};

/// Article table stored in a SQLite database.
///
/// # Examples
///
/// ```
/// use litreview_store::SqliteArticleStore;
///
/// let store = SqliteArticleStore::in_memory("articles").unwrap();
/// assert_eq!(store.count().unwrap(), 0);
/// ```
pub struct SqliteArticleStore {
    conn: Mutex<Connection>,
    table: String,
}

impl std::fmt::Debug for SqliteArticleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteArticleStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteArticleStore {
    /// Open or create the database at `path` and ensure `table` exists.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Config`] if `table` is not a plain
    /// identifier, or [`LitReviewError::Store`] if the database cannot be
    /// opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use litreview_store::SqliteArticleStore;
    ///
    /// let store = SqliteArticleStore::open(Path::new(".litreview/articles.db"), "articles").unwrap();
    /// ```
    pub fn open(path: &Path, table: &str) -> Result<Self, LitReviewError> {
        check_table(table)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LitReviewError::Store(format!("failed to create database directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| LitReviewError::Store(format!("failed to open database: {e}")))?;
        Self::with_connection(conn, table)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Store`] if SQLite cannot allocate the database.
    pub fn in_memory(table: &str) -> Result<Self, LitReviewError> {
        check_table(table)?;
        let conn = Connection::open_in_memory()
            .map_err(|e| LitReviewError::Store(format!("failed to open database: {e}")))?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, LitReviewError> {
        let store = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), LitReviewError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id             TEXT PRIMARY KEY,
                title          TEXT,
                authors        TEXT NOT NULL DEFAULT '[]',
                published_at   TEXT,
                s3_text_key    TEXT,
                extracted_text TEXT
            );",
            self.table
        );
        self.lock()?
            .execute_batch(&sql)
            .map_err(|e| LitReviewError::Store(format!("failed to create schema: {e}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LitReviewError> {
        self.conn
            .lock()
            .map_err(|_| LitReviewError::Store("database connection lock poisoned".into()))
    }

    /// Insert or replace a record.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Store`] if the write fails.
    pub fn upsert(&self, record: &ArticleRecord) -> Result<(), LitReviewError> {
        let authors = serde_json::to_string(&record.authors)?;
        let sql = format!(
            "INSERT INTO {} (id, title, authors, published_at, s3_text_key, extracted_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                authors = excluded.authors,
                published_at = excluded.published_at,
                s3_text_key = excluded.s3_text_key,
                extracted_text = excluded.extracted_text",
            self.table
        );
        self.lock()?
            .execute(
                &sql,
                params![
                    record.id,
                    record.title,
                    authors,
                    record.published_at,
                    record.s3_text_key,
                    record.extracted_text,
                ],
            )
            .map_err(|e| LitReviewError::Store(format!("failed to upsert {}: {e}", record.id)))?;
        Ok(())
    }

    /// Number of records in the table.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Store`] if the query fails.
    pub fn count(&self) -> Result<usize, LitReviewError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = self
            .lock()?
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| LitReviewError::Store(format!("failed to count records: {e}")))?;
        Ok(count as usize)
    }

    fn select_columns(&self) -> String {
        format!(
            "SELECT id, title, authors, published_at, s3_text_key, extracted_text FROM {}",
            self.table
        )
    }
}

#[async_trait]
impl ArticleStore for SqliteArticleStore {
    async fn batch_get(&self, ids: &[String]) -> Result<Vec<ArticleRecord>, LitReviewError> {
        let sql = format!("{} WHERE id = ?1", self.select_columns());
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| LitReviewError::Store(format!("failed to prepare lookup: {e}")))?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let raw = stmt
                .query_row(params![id], raw_row)
                .optional()
                .map_err(|e| LitReviewError::Store(format!("failed to read {id}: {e}")))?;
            if let Some(raw) = raw {
                records.push(raw.into_record()?);
            }
        }
        Ok(records)
    }

    async fn scan_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, LitReviewError> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR id > ?1) ORDER BY id LIMIT ?2",
            self.select_columns()
        );
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| LitReviewError::Store(format!("failed to prepare scan: {e}")))?;

        // one extra row tells us whether another page exists
        let fetch = (page_size as i64).saturating_add(1);
        let rows = stmt
            .query_map(params![cursor, fetch], raw_row)
            .map_err(|e| LitReviewError::Store(format!("failed to scan: {e}")))?;

        let mut items = Vec::new();
        let mut more = false;
        for row in rows {
            let raw = row.map_err(|e| LitReviewError::Store(format!("failed to scan: {e}")))?;
            if items.len() == page_size {
                more = true;
                break;
            }
            items.push(raw.into_record()?);
        }

        let next_cursor = if more {
            items.last().map(|r: &ArticleRecord| r.id.clone())
        } else {
            None
        };
        Ok(ScanPage { items, next_cursor })
    }
}

struct RawRow {
    id: String,
    title: Option<String>,
    authors: Option<String>,
    published_at: Option<String>,
    s3_text_key: Option<String>,
    extracted_text: Option<String>,
}

impl RawRow {
    fn into_record(self) -> Result<ArticleRecord, LitReviewError> {
        let authors = match self.authors.as_deref() {
            None | Some("") => Vec::new(),
            Some(json) => serde_json::from_str(json).map_err(|e| {
                LitReviewError::Store(format!("invalid authors for {}: {e}", self.id))
            })?,
        };
        Ok(ArticleRecord {
            id: self.id,
            title: self.title,
            authors,
            published_at: self.published_at,
            s3_text_key: self.s3_text_key,
            extracted_text: self.extracted_text,
        })
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        title: row.get(1)?,
        authors: row.get(2)?,
        published_at: row.get(3)?,
        s3_text_key: row.get(4)?,
        extracted_text: row.get(5)?,
    })
}

fn check_table(table: &str) -> Result<(), LitReviewError> {
    if is_sql_identifier(table) {
        Ok(())
    } else {
        Err(LitReviewError::Config(format!(
            "invalid table name {table:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, published_at: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            id: id.into(),
            title: Some(format!("Paper {id}")),
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            published_at: published_at.map(Into::into),
            s3_text_key: Some(format!("texts/{id}.txt")),
            extracted_text: Some("inline".into()),
        }
    }

    #[test]
    fn create_store_and_upsert() {
        let store = SqliteArticleStore::in_memory("articles").unwrap();
        store.upsert(&record("a", Some("2024-01-01"))).unwrap();
        store.upsert(&record("b", None)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let store = SqliteArticleStore::in_memory("articles").unwrap();
        store.upsert(&record("a", Some("2024-01-01"))).unwrap();
        let mut updated = record("a", Some("2024-02-02"));
        updated.title = None;
        store.upsert(&updated).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn rejects_unsafe_table_name() {
        let err = SqliteArticleStore::in_memory("articles; DROP").unwrap_err();
        assert!(matches!(err, LitReviewError::Config(_)));
    }

    #[tokio::test]
    async fn batch_get_round_trips_records() {
        let store = SqliteArticleStore::in_memory("articles").unwrap();
        let original = record("a", Some("2024-01-01"));
        store.upsert(&original).unwrap();

        let ids = vec!["missing".to_string(), "a".to_string()];
        let found = store.batch_get(&ids).await.unwrap();
        assert_eq!(found, vec![original]);
    }

    #[tokio::test]
    async fn scan_pages_in_id_order() {
        let store = SqliteArticleStore::in_memory("papers").unwrap();
        for id in ["c", "a", "e", "b", "d"] {
            store.upsert(&record(id, None)).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = store.scan_page(cursor.as_deref(), 2).await.unwrap();
            pages += 1;
            seen.extend(page.items.into_iter().map(|r| r.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(pages, 3);
    }

    #[tokio::test]
    async fn null_authors_column_reads_as_empty() {
        let store = SqliteArticleStore::in_memory("articles").unwrap();
        store
            .lock()
            .unwrap()
            .execute("INSERT INTO articles (id, authors) VALUES ('x', '')", [])
            .unwrap();
        let found = store.batch_get(&["x".to_string()]).await.unwrap();
        assert!(found[0].authors.is_empty());
        assert!(found[0].title.is_none());
    }

    #[tokio::test]
    async fn open_creates_file_and_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/articles.db");
        {
            let store = SqliteArticleStore::open(&path, "articles").unwrap();
            store.upsert(&record("a", None)).unwrap();
        }
        assert!(path.exists());
        let reopened = SqliteArticleStore::open(&path, "articles").unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
