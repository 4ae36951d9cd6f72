//! Read contract for the article table, plus an in-memory backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use litreview_core::{ArticleRecord, LitReviewError};

/// One page of a table scan.
///
/// `next_cursor` is `None` once the table is exhausted; otherwise pass it to
/// the next [`ArticleStore::scan_page`] call.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Records on this page, ordered by identifier.
    pub items: Vec<ArticleRecord>,
    /// Exclusive start key for the next page.
    pub next_cursor: Option<String>,
}

/// Keyed and paginated access to ingested article records.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up records by exact identifier.
    ///
    /// Identifiers with no matching record are skipped. Found records come
    /// back in request order.
    async fn batch_get(&self, ids: &[String]) -> Result<Vec<ArticleRecord>, LitReviewError>;

    /// Fetch up to `page_size` records whose identifier sorts after `cursor`.
    async fn scan_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, LitReviewError>;
}

/// Article store held in memory, keyed by identifier.
///
/// # Examples
///
/// ```
/// use litreview_core::ArticleRecord;
/// use litreview_store::MemoryArticleStore;
///
/// let store = MemoryArticleStore::new();
/// store.insert(ArticleRecord {
///     id: "a".into(),
///     title: None,
///     authors: vec![],
///     published_at: None,
///     s3_text_key: None,
///     extracted_text: None,
/// });
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryArticleStore {
    records: RwLock<BTreeMap<String, ArticleRecord>>,
    scans: AtomicUsize,
}

impl MemoryArticleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`.
    pub fn with_records(records: impl IntoIterator<Item = ArticleRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: ArticleRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.id.clone(), record);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` when the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of [`ArticleStore::scan_page`] calls served so far.
    pub fn scan_calls(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn batch_get(&self, ids: &[String]) -> Result<Vec<ArticleRecord>, LitReviewError> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    async fn scan_page(
        &self,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<ScanPage, LitReviewError> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());

        let mut remaining = records
            .iter()
            .filter(|(id, _)| cursor.map_or(true, |c| id.as_str() > c))
            .map(|(_, record)| record);

        let items: Vec<ArticleRecord> = remaining.by_ref().take(page_size).cloned().collect();
        let next_cursor = if remaining.next().is_some() {
            items.last().map(|r| r.id.clone())
        } else {
            None
        };
        Ok(ScanPage { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.into(),
            title: Some(format!("Title {id}")),
            authors: vec![],
            published_at: None,
            s3_text_key: None,
            extracted_text: None,
        }
    }

    #[tokio::test]
    async fn batch_get_skips_missing_ids() {
        let store = MemoryArticleStore::with_records([record("a"), record("b")]);
        let ids = vec!["b".to_string(), "zzz".to_string(), "a".to_string()];
        let found = store.batch_get(&ids).await.unwrap();
        let found_ids: Vec<&str> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(found_ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn scan_pages_until_exhausted() {
        let store = MemoryArticleStore::with_records(["a", "b", "c", "d", "e"].map(record));

        let first = store.scan_page(None, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("b"));

        let second = store.scan_page(first.next_cursor.as_deref(), 2).await.unwrap();
        assert_eq!(second.items[0].id, "c");

        let last = store.scan_page(second.next_cursor.as_deref(), 2).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_cursor.is_none());
        assert_eq!(store.scan_calls(), 3);
    }

    #[tokio::test]
    async fn exact_page_boundary_has_no_cursor() {
        let store = MemoryArticleStore::with_records(["a", "b"].map(record));
        let page = store.scan_page(None, 2).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn empty_store_scans_empty_page() {
        let store = MemoryArticleStore::new();
        assert!(store.is_empty());
        let page = store.scan_page(None, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
