/// Errors that can occur while generating a literature review.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use litreview_core::LitReviewError;
///
/// let err = LitReviewError::Config("missing bucket".into());
/// assert!(err.to_string().contains("missing bucket"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LitReviewError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Article table read or write failure.
    #[error("article store error: {0}")]
    Store(String),

    /// Blob bucket read or write failure.
    #[error("blob store error: {0}")]
    Blob(String),

    /// Generation API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Malformed invocation payload.
    #[error("invalid payload: {0}")]
    Payload(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
