use std::sync::Arc;

use chrono::{DateTime, Utc};
use litreview_core::{
    ArticleRecord, LitReviewError, ReviewMetadata, ReviewOutcome, ReviewRequest, StorageConfig,
};
use litreview_store::{ArticleStore, BlobStore};
use tracing::{debug, info};

use crate::artifact::ReviewStore;
use crate::llm::TextGenerator;
use crate::{loader, prompt, selector};

/// Message returned when no article resolves.
pub const NO_ARTICLES_MESSAGE: &str = "No articles available for review";

/// Review orchestrator that drives the full pipeline.
///
/// Resolves articles, loads their text, builds the prompt, calls the
/// generator once and stores the artifact. All collaborators are injected.
pub struct ReviewGenerator {
    articles: Arc<dyn ArticleStore>,
    blobs: Arc<dyn BlobStore>,
    generator: Arc<dyn TextGenerator>,
    artifacts: ReviewStore,
    scan_page_size: usize,
}

/// Articles and prompt prepared for a request.
struct Prepared {
    records: Vec<ArticleRecord>,
    prompt: String,
}

impl ReviewGenerator {
    /// Create a generator.
    ///
    /// `blobs` is both the source of article texts and the sink for review
    /// artifacts, written under `storage.review_prefix`.
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        blobs: Arc<dyn BlobStore>,
        generator: Arc<dyn TextGenerator>,
        storage: &StorageConfig,
    ) -> Self {
        let artifacts = ReviewStore::new(blobs.clone(), storage.review_prefix.clone());
        Self {
            articles,
            blobs,
            generator,
            artifacts,
            scan_page_size: storage.scan_page_size,
        }
    }

    /// Run the pipeline.
    ///
    /// The artifact is timestamped with the current time once generation
    /// has returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the article store cannot be read, or if the
    /// generation call or the artifact write fails. An empty selection is
    /// not an error; it yields [`ReviewOutcome::Failure`].
    pub async fn run(&self, request: &ReviewRequest) -> Result<ReviewOutcome, LitReviewError> {
        self.run_with_clock(request, Utc::now).await
    }

    /// Run the pipeline with a fixed generation time.
    ///
    /// # Errors
    ///
    /// See [`ReviewGenerator::run`].
    pub async fn run_at(
        &self,
        request: &ReviewRequest,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, LitReviewError> {
        self.run_with_clock(request, move || now).await
    }

    async fn run_with_clock<F>(
        &self,
        request: &ReviewRequest,
        clock: F,
    ) -> Result<ReviewOutcome, LitReviewError>
    where
        F: Fn() -> DateTime<Utc>,
    {
        let Some(prepared) = self.prepare(request).await? else {
            info!(requested = request.paper_ids.len(), "no articles resolved, skipping generation");
            return Ok(ReviewOutcome::Failure {
                message: NO_ARTICLES_MESSAGE.to_string(),
            });
        };

        debug!(
            model = self.generator.model(),
            prompt_chars = prepared.prompt.chars().count(),
            "requesting review"
        );
        let review = self.generator.generate(&prepared.prompt).await?;

        let metadata = ReviewMetadata {
            paper_ids: prepared.records.iter().map(|r| r.id.clone()).collect(),
            requested_ids: request.paper_ids.clone(),
            limit: request.limit,
        };
        let key = self
            .artifacts
            .store(&review, metadata, self.generator.model(), clock())
            .await?;

        Ok(ReviewOutcome::Success {
            paper_count: prepared.records.len(),
            s3_review_key: key,
            review,
        })
    }

    /// Build the prompt a request would send, without generating or storing.
    ///
    /// Returns `None` when no article resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the article store cannot be read.
    pub async fn preview(&self, request: &ReviewRequest) -> Result<Option<String>, LitReviewError> {
        Ok(self.prepare(request).await?.map(|p| p.prompt))
    }

    async fn prepare(&self, request: &ReviewRequest) -> Result<Option<Prepared>, LitReviewError> {
        let records = selector::resolve_articles(
            self.articles.as_ref(),
            &request.paper_ids,
            request.limit,
            self.scan_page_size,
        )
        .await?;
        if records.is_empty() {
            return Ok(None);
        }

        let mut blocks = Vec::with_capacity(records.len());
        for record in &records {
            let text = loader::load_text(self.blobs.as_ref(), record).await;
            blocks.push(prompt::article_block(record, &text));
        }
        debug!(articles = records.len(), "built prompt blocks");

        Ok(Some(Prepared {
            prompt: prompt::build_review_prompt(&blocks),
            records,
        }))
    }
}
