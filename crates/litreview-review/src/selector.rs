//! Article resolution: explicit identifiers or the most recent records.

use std::collections::HashSet;

use litreview_core::{ArticleRecord, LitReviewError};
use litreview_store::ArticleStore;
use tracing::debug;

/// Resolve the articles to review.
///
/// With `paper_ids`, looks each identifier up once and drops the ones that
/// do not exist. Without, scans the store `page_size` records at a time
/// until at least `limit` records are collected or the store is exhausted.
/// Either way the records are ordered by publication date, newest first
/// (undated last, ties in lookup order), and truncated to `limit`.
///
/// # Errors
///
/// Propagates [`LitReviewError::Store`] from the article store.
pub async fn resolve_articles(
    store: &dyn ArticleStore,
    paper_ids: &[String],
    limit: usize,
    page_size: usize,
) -> Result<Vec<ArticleRecord>, LitReviewError> {
    let mut records = if paper_ids.is_empty() {
        scan_recent(store, limit, page_size.max(1)).await?
    } else {
        let mut seen = HashSet::new();
        let unique: Vec<String> = paper_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        let found = store.batch_get(&unique).await?;
        debug!(requested = unique.len(), found = found.len(), "looked up requested articles");
        found
    };

    records.sort_by(|a, b| b.sort_date().cmp(a.sort_date()));
    records.truncate(limit);
    Ok(records)
}

async fn scan_recent(
    store: &dyn ArticleStore,
    limit: usize,
    page_size: usize,
) -> Result<Vec<ArticleRecord>, LitReviewError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.scan_page(cursor.as_deref(), page_size).await?;
        records.extend(page.items);
        match page.next_cursor {
            Some(next) if records.len() < limit => cursor = Some(next),
            _ => break,
        }
    }
    debug!(scanned = records.len(), limit, "scanned recent articles");
    Ok(records)
}
