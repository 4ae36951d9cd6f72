//! Full-text loading with inline fallback.

use litreview_core::ArticleRecord;
use litreview_store::BlobStore;
use tracing::{debug, warn};

/// Load the full text of `record`.
///
/// Prefers the blob at `s3_text_key`. When the key is absent or the fetch
/// fails, returns the inline `extracted_text` (empty when that is absent
/// too). Invalid UTF-8 is replaced rather than rejected, so this never fails.
pub async fn load_text(blobs: &dyn BlobStore, record: &ArticleRecord) -> String {
    let Some(key) = record.s3_text_key.as_deref().filter(|k| !k.is_empty()) else {
        return inline_text(record);
    };

    match blobs.get(key).await {
        Ok(bytes) => {
            debug!(id = %record.id, key, bytes = bytes.len(), "loaded article text");
            decode_text(&bytes)
        }
        Err(e) => {
            warn!(id = %record.id, key, error = %e, "unable to fetch article text, using inline text");
            inline_text(record)
        }
    }
}

/// Decode bytes as UTF-8, substituting U+FFFD for invalid sequences.
///
/// # Examples
///
/// ```
/// use litreview_review::loader::decode_text;
///
/// assert_eq!(decode_text("née".as_bytes()), "née");
/// assert_eq!(decode_text(&[b'o', 0xff, b'k']), "o\u{fffd}k");
/// ```
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn inline_text(record: &ArticleRecord) -> String {
    record.extracted_text.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use litreview_store::MemoryBlobStore;

    fn record(key: Option<&str>, inline: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            id: "p1".into(),
            title: None,
            authors: vec![],
            published_at: None,
            s3_text_key: key.map(Into::into),
            extracted_text: inline.map(Into::into),
        }
    }

    #[tokio::test]
    async fn prefers_blob_text() {
        let blobs = MemoryBlobStore::new();
        blobs.insert("texts/p1.txt", "full text".as_bytes().to_vec());
        let text = load_text(&blobs, &record(Some("texts/p1.txt"), Some("inline"))).await;
        assert_eq!(text, "full text");
    }

    #[tokio::test]
    async fn missing_blob_falls_back_to_inline() {
        let blobs = MemoryBlobStore::new();
        let text = load_text(&blobs, &record(Some("texts/gone.txt"), Some("inline"))).await;
        assert_eq!(text, "inline");
    }

    #[tokio::test]
    async fn missing_blob_and_inline_gives_empty() {
        let blobs = MemoryBlobStore::new();
        let text = load_text(&blobs, &record(Some("texts/gone.txt"), None)).await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn no_pointer_returns_inline_directly() {
        let blobs = MemoryBlobStore::new();
        blobs.insert("", b"should not be read".to_vec());
        assert_eq!(load_text(&blobs, &record(None, Some("inline"))).await, "inline");
        assert_eq!(load_text(&blobs, &record(Some(""), Some("inline"))).await, "inline");
        assert_eq!(load_text(&blobs, &record(None, None)).await, "");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let blobs = MemoryBlobStore::new();
        blobs.insert("texts/bad.txt", vec![b'a', 0xc3, 0x28, b'b']);
        let text = load_text(&blobs, &record(Some("texts/bad.txt"), Some("inline"))).await;
        assert_eq!(text, "a\u{fffd}(b");
    }
}
