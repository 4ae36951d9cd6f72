//! Persisting generated reviews as JSON artifacts.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use litreview_core::{LitReviewError, ReviewArtifact, ReviewMetadata};
use litreview_store::BlobStore;
use tracing::info;

/// Content type declared for stored artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "application/json";

/// Storage key for a review generated at `now`.
///
/// The layout is `<prefix>/<YYYY>/<MM>/<DD>/review_<HHMMSS>.md` in UTC. The
/// `.md` suffix is kept for compatibility with existing buckets even though
/// the body is JSON.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use litreview_review::artifact::review_key;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
/// assert_eq!(review_key("reviews", now), "reviews/2024/03/07/review_090501.md");
/// ```
pub fn review_key(prefix: &str, now: DateTime<Utc>) -> String {
    format!(
        "{prefix}/{}/review_{}.md",
        now.format("%Y/%m/%d"),
        now.format("%H%M%S")
    )
}

/// RFC 3339 timestamp with microsecond precision.
///
/// The fraction is omitted when there are no whole microseconds.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use litreview_review::artifact::generated_at;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
/// assert_eq!(generated_at(now), "2024-03-07T09:05:01+00:00");
/// ```
pub fn generated_at(now: DateTime<Utc>) -> String {
    let format = if now.nanosecond() / 1_000 == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    now.to_rfc3339_opts(format, false)
}

/// Writes review artifacts into a bucket under a key prefix.
///
/// Keys have one-second resolution; a second review in the same second
/// replaces the first.
pub struct ReviewStore {
    blobs: Arc<dyn BlobStore>,
    prefix: String,
}

impl ReviewStore {
    /// Create a store writing to `blobs` under `prefix`.
    pub fn new(blobs: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            blobs,
            prefix: prefix.into(),
        }
    }

    /// Serialize and write the artifact, returning its key.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Serialization`] if the artifact cannot be
    /// encoded, or the bucket's error if the write fails.
    pub async fn store(
        &self,
        review: &str,
        metadata: ReviewMetadata,
        model: &str,
        now: DateTime<Utc>,
    ) -> Result<String, LitReviewError> {
        let key = review_key(&self.prefix, now);
        let artifact = ReviewArtifact {
            generated_at: generated_at(now),
            model: model.to_string(),
            metadata,
            review: review.to_string(),
        };
        let body = serde_json::to_vec_pretty(&artifact)?;
        self.blobs.put(&key, body, ARTIFACT_CONTENT_TYPE).await?;
        info!(key = %key, papers = artifact.metadata.paper_ids.len(), "stored review artifact");
        Ok(key)
    }
}
