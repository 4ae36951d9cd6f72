//! Core types, configuration, and error handling for litreview.
//!
//! This crate provides the shared foundation used by the other crates:
//! - [`LitReviewError`]: unified error type using `thiserror`
//! - [`LitReviewConfig`]: configuration loaded from `.litreview.toml`
//! - Shared types: [`ArticleRecord`], [`ReviewRequest`], [`ReviewArtifact`],
//!   [`ReviewOutcome`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{is_sql_identifier, LitReviewConfig, LlmConfig, ReviewConfig, StorageConfig};
pub use error::LitReviewError;
pub use types::{
    ArticleRecord, InvocationPayload, OutputFormat, ReviewArtifact, ReviewMetadata, ReviewOutcome,
    ReviewRequest,
};

/// A convenience `Result` type for litreview operations.
pub type Result<T> = std::result::Result<T, LitReviewError>;
