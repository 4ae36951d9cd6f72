//! Object storage for article texts and generated reviews.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use litreview_core::LitReviewError;
use tracing::debug;

/// Key-addressed byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the raw bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, LitReviewError>;

    /// Store `body` under `key`, replacing any existing object.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str)
        -> Result<(), LitReviewError>;
}

/// A bucket backed by a local directory; keys map to relative file paths.
///
/// The declared content type is not persisted.
///
/// # Examples
///
/// ```
/// use litreview_store::FsBlobStore;
///
/// let bucket = FsBlobStore::new("/var/lib/litreview/bucket");
/// assert!(bucket.path_for("texts/a.txt").is_ok());
/// assert!(bucket.path_for("../etc/passwd").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a bucket rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the bucket.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `key` to a file path inside the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Blob`] for empty keys and keys that are
    /// absolute or escape the bucket.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, LitReviewError> {
        let relative = Path::new(key);
        let mut parts = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => parts += 1,
                Component::CurDir => {}
                _ => {
                    return Err(LitReviewError::Blob(format!(
                        "key {key:?} escapes the bucket"
                    )))
                }
            }
        }
        if parts == 0 {
            return Err(LitReviewError::Blob(format!("invalid key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, LitReviewError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| LitReviewError::Blob(format!("failed to read {key}: {e}")))
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), LitReviewError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LitReviewError::Blob(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        debug!(key, content_type, bytes = body.len(), "writing blob");
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| LitReviewError::Blob(format!("failed to write {key}: {e}")))
    }
}

/// A bucket held in memory. Records the content type of each object.
///
/// # Examples
///
/// ```
/// use litreview_store::MemoryBlobStore;
///
/// let bucket = MemoryBlobStore::new();
/// bucket.insert("texts/a.txt", b"hello".to_vec());
/// assert_eq!(bucket.keys(), vec!["texts/a.txt".to_string()]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

impl MemoryBlobStore {
    /// Create an empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with content type `application/octet-stream`.
    pub fn insert(&self, key: &str, body: Vec<u8>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: "application/octet-stream".into(),
            },
        );
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        let mut keys: Vec<String> = objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Content type declared when `key` was written.
    pub fn content_type(&self, key: &str) -> Option<String> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects.get(key).map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, LitReviewError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(key)
            .map(|o| o.body.clone())
            .ok_or_else(|| LitReviewError::Blob(format!("no such key: {key}")))
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), LitReviewError> {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fs_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FsBlobStore::new(dir.path());
        bucket
            .put("reviews/2024/01/02/review_030405.md", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        assert!(dir.path().join("reviews/2024/01/02/review_030405.md").exists());
        let body = bucket.get("reviews/2024/01/02/review_030405.md").await.unwrap();
        assert_eq!(body, b"{}");
    }

    #[tokio::test]
    async fn fs_missing_key_is_blob_error() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FsBlobStore::new(dir.path());
        let err = bucket.get("texts/none.txt").await.unwrap_err();
        assert!(matches!(err, LitReviewError::Blob(_)));
    }

    #[test]
    fn fs_rejects_escaping_keys() {
        let bucket = FsBlobStore::new("/bucket");
        assert!(bucket.path_for("/abs/key").is_err());
        assert!(bucket.path_for("a/../../b").is_err());
        assert!(bucket.path_for("").is_err());
        assert!(bucket.path_for("./").is_err());
        assert_eq!(
            bucket.path_for("./texts/a.txt").unwrap(),
            PathBuf::from("/bucket/./texts/a.txt")
        );
    }

    #[tokio::test]
    async fn memory_records_content_type() {
        let bucket = MemoryBlobStore::new();
        bucket
            .put("k", b"body".to_vec(), "application/json")
            .await
            .unwrap();
        assert_eq!(bucket.content_type("k").as_deref(), Some("application/json"));
        assert_eq!(bucket.get("k").await.unwrap(), b"body");
        assert!(bucket.get("other").await.is_err());
    }
}
