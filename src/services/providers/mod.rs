//! External collaborators consumed by the recommendation core
//!
//! The core never embeds text, searches the booth index or ranks booths
//! itself. Each concern sits behind a trait so the pipeline can be driven by
//! the production clients (Gemini, pgvector) or by in-memory fakes.

use std::future::Future;
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{BoothMatch, CandidatePool, RankedRecommendation},
};

pub mod gemini;
pub mod pg_search;

pub use gemini::{GeminiEmbedder, GeminiRanker};
pub use pg_search::PgSimilaritySearch;

/// Text-to-vector collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Similarity search over the pre-built booth embedding index
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Returns matches above `match_threshold`, best first, at most `match_count` of them
    async fn search(
        &self,
        query: &[f32],
        match_threshold: f64,
        match_count: usize,
    ) -> AppResult<Vec<BoothMatch>>;
}

/// Ranking and justification service
///
/// Promises `count` distinct booth ids ranked best-first. Callers must not
/// rely on the uniqueness promise.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RankingService: Send + Sync {
    async fn rank(
        &self,
        pool: &CandidatePool,
        profile_text: &str,
    ) -> AppResult<Vec<RankedRecommendation>>;
}

/// Bounds an external call, turning an elapsed deadline into a hard failure
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                operation = %operation,
                timeout_ms = limit.as_millis() as u64,
                "External call timed out"
            );
            Err(AppError::ExternalService(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}
