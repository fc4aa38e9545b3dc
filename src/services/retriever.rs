use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::AppResult,
    models::Candidate,
    services::providers::{with_timeout, Embedder, SimilaritySearch},
};

/// Issues one similarity query for a sector seed
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CandidateRetriever: Send + Sync {
    /// Returns up to `top_k` candidates, best first. An empty result is not an error.
    async fn retrieve(&self, sector: &str, seed_text: &str, top_k: usize)
        -> AppResult<Vec<Candidate>>;
}

/// Retriever that embeds the seed text and queries the booth index
pub struct EmbeddingRetriever {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn SimilaritySearch>,
    match_threshold: f64,
    timeout: Duration,
}

impl EmbeddingRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn SimilaritySearch>,
        match_threshold: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            search,
            match_threshold,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl CandidateRetriever for EmbeddingRetriever {
    async fn retrieve(
        &self,
        sector: &str,
        seed_text: &str,
        top_k: usize,
    ) -> AppResult<Vec<Candidate>> {
        let vector = with_timeout(self.timeout, "embedding", self.embedder.embed(seed_text)).await?;
        let matches = with_timeout(
            self.timeout,
            "similarity search",
            self.search.search(&vector, self.match_threshold, top_k),
        )
        .await?;

        let mut candidates: Vec<Candidate> = matches
            .into_iter()
            .take(top_k)
            .map(|m| Candidate::new(m.booth.id.clone(), m.similarity).with_booth(m.booth))
            .collect();
        candidates.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::info!(
            sector = %sector,
            top_k,
            results = candidates.len(),
            embedder = self.embedder.name(),
            "Sector candidates retrieved"
        );

        Ok(candidates)
    }
}
