//! Storage seams for the review pipeline.
//!
//! - [`ArticleStore`]: keyed and paginated reads of article records, backed
//!   by [`SqliteArticleStore`] or [`MemoryArticleStore`]
//! - [`BlobStore`]: key-addressed bytes for article texts and review
//!   artifacts, backed by [`FsBlobStore`] or [`MemoryBlobStore`]

pub mod article;
pub mod blob;
pub mod sqlite;

pub use article::{ArticleStore, MemoryArticleStore, ScanPage};
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use sqlite::SqliteArticleStore;
