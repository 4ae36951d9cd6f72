use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LitReviewError;

/// A stored description of one ingested research article.
///
/// Written by an external ingestion process; read-only to the review pipeline.
///
/// # Examples
///
/// ```
/// use litreview_core::ArticleRecord;
///
/// let record = ArticleRecord {
///     id: "arxiv:2401.00001".into(),
///     title: Some("Sparse attention".into()),
///     authors: vec!["A. Author".into()],
///     published_at: Some("2024-01-02".into()),
///     s3_text_key: None,
///     extracted_text: Some("Abstract...".into()),
/// };
/// assert_eq!(record.sort_date(), "2024-01-02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Unique identifier.
    pub id: String,
    /// Article title.
    #[serde(default)]
    pub title: Option<String>,
    /// Author names in byline order.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication date, ISO-like; only used for ordering.
    #[serde(default)]
    pub published_at: Option<String>,
    /// Key of the full-text blob in the bucket.
    #[serde(default)]
    pub s3_text_key: Option<String>,
    /// Inline extracted text, used when the blob is missing or unreadable.
    #[serde(default)]
    pub extracted_text: Option<String>,
}

impl ArticleRecord {
    /// Publication date used for ordering; undated records sort as `""`.
    pub fn sort_date(&self) -> &str {
        self.published_at.as_deref().unwrap_or("")
    }
}

/// Raw invocation payload: `{ "paper_ids": [...]?, "limit": n? }`.
///
/// `limit` accepts a non-negative integer or a numeric string.
///
/// # Examples
///
/// ```
/// use litreview_core::InvocationPayload;
///
/// let payload: InvocationPayload =
///     serde_json::from_str(r#"{"paper_ids": ["a", "b"], "limit": "2"}"#).unwrap();
/// assert_eq!(payload.limit, Some(2));
///
/// let empty: InvocationPayload = serde_json::from_str("{}").unwrap();
/// assert!(empty.paper_ids.is_none());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationPayload {
    /// Article identifiers to review; `None` or empty selects the most recent.
    #[serde(default)]
    pub paper_ids: Option<Vec<String>>,
    /// Maximum number of articles; `None` or `0` uses the configured default.
    #[serde(default, deserialize_with = "deserialize_limit")]
    pub limit: Option<u64>,
}

impl InvocationPayload {
    /// Parse a payload from JSON text. Blank input is the empty payload.
    ///
    /// # Errors
    ///
    /// Returns [`LitReviewError::Payload`] if the JSON is malformed.
    pub fn from_json(input: &str) -> Result<Self, LitReviewError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(input).map_err(|e| LitReviewError::Payload(e.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LimitValue {
    Number(u64),
    Text(String),
}

fn deserialize_limit<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LimitValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(LimitValue::Number(n)) => Ok(Some(n)),
        Some(LimitValue::Text(s)) => s.trim().parse().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("limit is not a non-negative integer: {s:?}"))
        }),
    }
}

/// A resolved review request with a positive limit.
///
/// # Examples
///
/// ```
/// use litreview_core::{InvocationPayload, ReviewRequest};
///
/// let request = ReviewRequest::from_payload(InvocationPayload::default(), 5);
/// assert!(request.paper_ids.is_empty());
/// assert_eq!(request.limit, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// Requested identifiers; empty means "most recent".
    pub paper_ids: Vec<String>,
    /// Maximum number of articles to include.
    pub limit: usize,
}

impl ReviewRequest {
    /// Build a request, falling back to `default_limit` when `limit` is
    /// missing or zero.
    pub fn new(paper_ids: Vec<String>, limit: Option<usize>, default_limit: usize) -> Self {
        let limit = limit.filter(|&l| l > 0).unwrap_or(default_limit);
        Self { paper_ids, limit }
    }

    /// Build a request from an invocation payload.
    pub fn from_payload(payload: InvocationPayload, default_limit: usize) -> Self {
        let limit = payload
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX));
        Self::new(payload.paper_ids.unwrap_or_default(), limit, default_limit)
    }
}

/// Request metadata recorded alongside a generated review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    /// Identifiers of the articles actually used, in prompt order.
    pub paper_ids: Vec<String>,
    /// Identifiers as requested by the caller.
    pub requested_ids: Vec<String>,
    /// Effective article limit.
    pub limit: usize,
}

/// The JSON document persisted for each generated review.
///
/// # Examples
///
/// ```
/// use litreview_core::{ReviewArtifact, ReviewMetadata};
///
/// let artifact = ReviewArtifact {
///     generated_at: "2024-05-01T10:00:00+00:00".into(),
///     model: "gpt-4o-mini".into(),
///     metadata: ReviewMetadata {
///         paper_ids: vec!["a".into()],
///         requested_ids: vec![],
///         limit: 5,
///     },
///     review: "Synthèse".into(),
/// };
/// let json = serde_json::to_string(&artifact).unwrap();
/// assert!(json.contains("Synthèse"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewArtifact {
    /// Generation time, RFC 3339 in UTC.
    pub generated_at: String,
    /// Model that produced the review.
    pub model: String,
    /// Originating request metadata.
    pub metadata: ReviewMetadata,
    /// Generated review text.
    pub review: String,
}

/// Structured result of one invocation.
///
/// Serializes to `{"ok": false, "message": ...}` or
/// `{"ok": true, "paper_count": ..., "s3_review_key": ..., "review": ...}`.
///
/// # Examples
///
/// ```
/// use litreview_core::ReviewOutcome;
///
/// let outcome = ReviewOutcome::Failure { message: "nothing to do".into() };
/// let json = serde_json::to_value(&outcome).unwrap();
/// assert_eq!(json["ok"], false);
/// assert!(!outcome.is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// No review was produced; nothing was generated or stored.
    Failure {
        /// Human-readable reason.
        message: String,
    },
    /// A review was generated and stored.
    Success {
        /// Number of articles included in the prompt.
        paper_count: usize,
        /// Key of the stored artifact.
        s3_review_key: String,
        /// Generated review text.
        review: String,
    },
}

impl ReviewOutcome {
    /// Returns `true` for [`ReviewOutcome::Success`].
    pub fn is_ok(&self) -> bool {
        matches!(self, ReviewOutcome::Success { .. })
    }
}

impl Serialize for ReviewOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReviewOutcome::Failure { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
            ReviewOutcome::Success {
                paper_count,
                s3_review_key,
                review,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("paper_count", paper_count)?;
                map.serialize_entry("s3_review_key", s3_review_key)?;
                map.serialize_entry("review", review)?;
                map.end()
            }
        }
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use litreview_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// assert!("md".parse::<OutputFormat>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain review text.
    #[default]
    Text,
    /// The structured invocation result as JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("markdown".parse::<OutputFormat>().is_err());
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn record_deserializes_with_missing_fields() {
        let record: ArticleRecord = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(record.id, "x");
        assert!(record.title.is_none());
        assert!(record.authors.is_empty());
        assert_eq!(record.sort_date(), "");
    }

    #[test]
    fn payload_accepts_null_fields() {
        let payload =
            InvocationPayload::from_json(r#"{"paper_ids": null, "limit": null}"#).unwrap();
        let request = ReviewRequest::from_payload(payload, 5);
        assert!(request.paper_ids.is_empty());
        assert_eq!(request.limit, 5);
    }

    #[test]
    fn payload_blank_input_is_empty() {
        let payload = InvocationPayload::from_json("  \n").unwrap();
        assert!(payload.paper_ids.is_none());
        assert!(payload.limit.is_none());
    }

    #[test]
    fn payload_zero_limit_uses_default() {
        let payload = InvocationPayload::from_json(r#"{"limit": 0}"#).unwrap();
        assert_eq!(ReviewRequest::from_payload(payload, 4).limit, 4);
    }

    #[test]
    fn payload_string_limit_is_parsed() {
        let payload = InvocationPayload::from_json(r#"{"limit": " 3 "}"#).unwrap();
        assert_eq!(payload.limit, Some(3));
    }

    #[test]
    fn payload_rejects_bad_limit() {
        let err = InvocationPayload::from_json(r#"{"limit": -1}"#).unwrap_err();
        assert!(matches!(err, LitReviewError::Payload(_)));
        assert!(InvocationPayload::from_json(r#"{"limit": "many"}"#).is_err());
        assert!(InvocationPayload::from_json("[1, 2]").is_err());
    }

    #[test]
    fn payload_keeps_requested_ids() {
        let payload = InvocationPayload::from_json(r#"{"paper_ids": ["b", "a"], "limit": 2}"#)
            .unwrap();
        let request = ReviewRequest::from_payload(payload, 5);
        assert_eq!(request.paper_ids, vec!["b", "a"]);
        assert_eq!(request.limit, 2);
    }

    #[test]
    fn failure_outcome_shape() {
        let outcome = ReviewOutcome::Failure {
            message: "No articles available for review".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ok": false, "message": "No articles available for review"})
        );
    }

    #[test]
    fn success_outcome_shape() {
        let outcome = ReviewOutcome::Success {
            paper_count: 2,
            s3_review_key: "reviews/2024/05/01/review_100000.md".into(),
            review: "text".into(),
        };
        assert!(outcome.is_ok());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["paper_count"], 2);
        assert_eq!(json["s3_review_key"], "reviews/2024/05/01/review_100000.md");
        assert_eq!(json["review"], "text");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
