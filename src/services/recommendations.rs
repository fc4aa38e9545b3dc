use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::{
    error::{AppError, AppResult},
    models::{
        Booth, CandidatePool, EvaluationSnapshot, EvaluationState, InterestProfile,
        RankedRecommendation,
    },
    services::{
        booth_catalog::BoothCatalog,
        candidate_pool::CandidatePoolBuilder,
        evaluations::{self, EvaluationStore},
        projector::{project_whole, visitor_info},
        providers::{with_timeout, RankingService},
        recommendation_list::{EvaluationProgress, RecommendationList},
        retriever::CandidateRetriever,
    },
};

/// Label used when logging the whole-profile fallback query
const FALLBACK_LABEL: &str = "전체";

/// A displayed recommendation with its booth and evaluation state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayedRecommendation {
    #[serde(flatten)]
    pub recommendation: RankedRecommendation,
    pub booth: Option<Booth>,
    pub evaluation: Option<EvaluationState>,
}

/// What a user currently sees of their recommendation list
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationView {
    pub user_id: i64,
    pub display: Vec<DisplayedRecommendation>,
    pub remaining_deletions: usize,
    pub can_delete: bool,
    pub progress: EvaluationProgress,
}

/// Recommendation pipeline and per-user list sessions
///
/// Owns the path from an interest profile to a ranked, displayed list and
/// every later transition on that list. One list is kept per user; loading
/// again replaces it. Each list sits behind its own lock, so a slow store
/// call for one user never blocks another.
pub struct RecommendationService {
    pool_builder: CandidatePoolBuilder,
    retriever: Arc<dyn CandidateRetriever>,
    ranker: Arc<dyn RankingService>,
    evaluations: Arc<dyn EvaluationStore>,
    booths: Arc<BoothCatalog>,
    sessions: RwLock<HashMap<i64, Arc<Mutex<RecommendationList>>>>,
    ranking_count: usize,
    timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        pool_builder: CandidatePoolBuilder,
        retriever: Arc<dyn CandidateRetriever>,
        ranker: Arc<dyn RankingService>,
        evaluations: Arc<dyn EvaluationStore>,
        booths: Arc<BoothCatalog>,
        ranking_count: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            pool_builder,
            retriever,
            ranker,
            evaluations,
            booths,
            sessions: RwLock::new(HashMap::new()),
            ranking_count,
            timeout,
        }
    }

    /// Builds the candidate pool, falling back to one whole-profile query
    /// when no sector carries signal
    pub async fn candidate_pool(&self, profile: &InterestProfile) -> AppResult<CandidatePool> {
        let mut pool = match self.pool_builder.build(profile).await {
            Ok(pool) => pool,
            Err(AppError::EmptySignal) => self.fallback_pool(profile).await?,
            Err(e) => return Err(e),
        };
        self.hydrate(&mut pool).await;
        Ok(pool)
    }

    async fn fallback_pool(&self, profile: &InterestProfile) -> AppResult<CandidatePool> {
        let seed = project_whole(profile);
        if seed.trim().is_empty() {
            return Err(AppError::EmptySignal);
        }

        tracing::info!(top_k = self.ranking_count, "No sector signal, using whole-profile query");

        let candidates = self
            .retriever
            .retrieve(FALLBACK_LABEL, &seed, self.ranking_count)
            .await?;
        let mut pool: CandidatePool = candidates.into_iter().collect();
        pool.sort_by_score();
        Ok(pool)
    }

    /// Fills in booth metadata the search collaborator did not supply
    async fn hydrate(&self, pool: &mut CandidatePool) {
        if pool.candidates().iter().all(|c| c.booth.is_some()) {
            return;
        }

        match self.booths.all().await {
            Ok(booths) => {
                let by_id: HashMap<&str, &Booth> =
                    booths.iter().map(|b| (b.id.as_str(), b)).collect();
                pool.fill_missing_booths(|id| by_id.get(id).map(|b| (*b).clone()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Booth catalog unavailable, ranking without metadata");
            }
        }
    }

    /// Generates a fresh recommendation list for the user
    pub async fn recommend(
        &self,
        user_id: i64,
        profile: &InterestProfile,
    ) -> AppResult<RecommendationView> {
        let pool = self.candidate_pool(profile).await?;

        let ranked = if pool.is_empty() {
            tracing::info!(user_id, "Candidate pool is empty, nothing to rank");
            Vec::new()
        } else {
            let profile_text = visitor_info(profile);
            with_timeout(self.timeout, "ranking", self.ranker.rank(&pool, &profile_text)).await?
        };

        tracing::info!(
            user_id,
            pool_size = pool.len(),
            ranked = ranked.len(),
            "Recommendations generated"
        );

        self.load(user_id, ranked).await
    }

    /// Loads a ranked list against the user's stored evaluations, replacing
    /// any existing session
    pub async fn load(
        &self,
        user_id: i64,
        ranked: Vec<RankedRecommendation>,
    ) -> AppResult<RecommendationView> {
        let snapshot = self.snapshot(user_id).await?;
        let list = RecommendationList::load(ranked, &snapshot);

        let view = self.render(user_id, &list, &snapshot).await;
        self.sessions
            .write()
            .await
            .insert(user_id, Arc::new(Mutex::new(list)));

        tracing::info!(
            user_id,
            displayed = view.display.len(),
            remaining_deletions = view.remaining_deletions,
            "Recommendation list loaded"
        );

        Ok(view)
    }

    /// The user's list; the map lock is released before the list is used
    async fn session(&self, user_id: i64) -> AppResult<Arc<Mutex<RecommendationList>>> {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| no_session(user_id))
    }

    pub async fn view(&self, user_id: i64) -> AppResult<RecommendationView> {
        let session = self.session(user_id).await?;
        let list = session.lock().await;
        let snapshot = self.snapshot(user_id).await?;
        Ok(self.render(user_id, &list, &snapshot).await)
    }

    /// Deletes a displayed recommendation
    ///
    /// Validation runs against a fresh snapshot and the tombstone is stored
    /// before the list changes, so a failure at any step leaves the session
    /// as it was.
    pub async fn delete(&self, user_id: i64, booth_id: &str) -> AppResult<RecommendationView> {
        let session = self.session(user_id).await?;
        let mut list = session.lock().await;

        let snapshot = self.snapshot(user_id).await?;
        list.check_delete(booth_id, &snapshot)?;

        with_timeout(
            self.timeout,
            "store tombstone",
            self.evaluations.upsert_tombstone(user_id, booth_id),
        )
        .await?;

        let replacement = list.delete(booth_id, &snapshot)?;

        tracing::info!(
            user_id,
            booth_id = %booth_id,
            replacement = ?replacement.as_ref().map(|r| r.booth_id.as_str()),
            remaining_deletions = list.remaining_deletions(),
            "Recommendation deleted"
        );

        let snapshot = self.snapshot(user_id).await.unwrap_or(snapshot);
        Ok(self.render(user_id, &list, &snapshot).await)
    }

    /// Records ratings for a displayed recommendation
    pub async fn rate(
        &self,
        user_id: i64,
        booth_id: &str,
        booth_rating: Option<u8>,
        recommendation_rating: Option<u8>,
    ) -> AppResult<EvaluationProgress> {
        evaluations::validate_ratings(booth_rating, recommendation_rating)?;

        let session = self.session(user_id).await?;
        let list = session.lock().await;

        let snapshot = self.snapshot(user_id).await?;
        if list.deleted_ids().contains(booth_id) || snapshot.is_deleted(booth_id) {
            return Err(AppError::InvalidTransition(format!(
                "Booth {} was deleted and cannot be rated",
                booth_id
            )));
        }
        if !list.is_displayed(booth_id) {
            return Err(AppError::InvalidTransition(format!(
                "Booth {} is not in the displayed recommendations",
                booth_id
            )));
        }

        with_timeout(
            self.timeout,
            "store evaluation",
            self.evaluations
                .upsert_rating(user_id, booth_id, booth_rating, recommendation_rating),
        )
        .await?;

        let snapshot = self.snapshot(user_id).await?;
        let progress = list.evaluation_progress(&snapshot);

        tracing::info!(
            user_id,
            booth_id = %booth_id,
            evaluated = progress.evaluated_count,
            required = progress.required,
            "Recommendation rated"
        );

        Ok(progress)
    }

    pub async fn progress(&self, user_id: i64) -> AppResult<EvaluationProgress> {
        let session = self.session(user_id).await?;
        let list = session.lock().await;
        let snapshot = self.snapshot(user_id).await?;
        Ok(list.evaluation_progress(&snapshot))
    }

    async fn snapshot(&self, user_id: i64) -> AppResult<EvaluationSnapshot> {
        with_timeout(
            self.timeout,
            "load evaluations",
            evaluations::snapshot(self.evaluations.as_ref(), user_id),
        )
        .await
    }

    async fn render(
        &self,
        user_id: i64,
        list: &RecommendationList,
        snapshot: &EvaluationSnapshot,
    ) -> RecommendationView {
        let booths = match self.booths.all().await {
            Ok(booths) => Some(booths),
            Err(e) => {
                tracing::warn!(error = %e, "Booth catalog unavailable, rendering without metadata");
                None
            }
        };

        let display = list
            .display()
            .iter()
            .map(|recommendation| DisplayedRecommendation {
                booth: booths.as_ref().and_then(|all| {
                    all.iter()
                        .find(|b| b.id == recommendation.booth_id)
                        .cloned()
                }),
                evaluation: snapshot.state(&recommendation.booth_id),
                recommendation: recommendation.clone(),
            })
            .collect();

        RecommendationView {
            user_id,
            display,
            remaining_deletions: list.remaining_deletions(),
            can_delete: list.can_delete(),
            progress: list.evaluation_progress(snapshot),
        }
    }
}

fn no_session(user_id: i64) -> AppError {
    AppError::NotFound(format!("No recommendations loaded for user {}", user_id))
}
