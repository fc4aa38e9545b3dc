use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{Candidate, CandidatePool, InterestProfile},
    services::{projector::ProfileProjector, retriever::CandidateRetriever, sectors::SectorCatalog},
};

/// Strategy deciding how large a candidate pool a profile should get
pub trait PoolSizing: Send + Sync {
    /// Total candidates to gather for a profile with `interest_count` tags
    fn target_total(&self, interest_count: usize) -> usize;

    /// Query size for each of `active_sectors` sectors
    fn per_sector(&self, target_total: usize, active_sectors: usize) -> usize {
        if active_sectors == 0 {
            return 0;
        }
        (target_total / active_sectors).max(1)
    }
}

/// Step function over interest diversity: sparse profiles get larger pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSizing {
    pub sparse_max: usize,
    pub moderate_max: usize,
    pub sparse_target: usize,
    pub moderate_target: usize,
    pub rich_target: usize,
}

impl Default for StepSizing {
    fn default() -> Self {
        Self {
            sparse_max: 3,
            moderate_max: 6,
            sparse_target: 80,
            moderate_target: 65,
            rich_target: 50,
        }
    }
}

impl PoolSizing for StepSizing {
    fn target_total(&self, interest_count: usize) -> usize {
        if interest_count <= self.sparse_max {
            self.sparse_target
        } else if interest_count <= self.moderate_max {
            self.moderate_target
        } else {
            self.rich_target
        }
    }
}

/// Sector queries planned for one profile
#[derive(Debug, Clone, PartialEq)]
pub struct PoolPlan {
    /// `(sector name, seed text)` in catalog order
    pub sectors: Vec<(String, String)>,
    pub target_total: usize,
    pub per_sector: usize,
}

/// Builds deduplicated, sector-balanced candidate pools
pub struct CandidatePoolBuilder {
    catalog: Arc<SectorCatalog>,
    retriever: Arc<dyn CandidateRetriever>,
    sizing: Arc<dyn PoolSizing>,
}

impl CandidatePoolBuilder {
    pub fn new(
        catalog: Arc<SectorCatalog>,
        retriever: Arc<dyn CandidateRetriever>,
        sizing: Arc<dyn PoolSizing>,
    ) -> Self {
        Self {
            catalog,
            retriever,
            sizing,
        }
    }

    /// Decides which sectors to query and how many results to ask each for
    ///
    /// Fails with [`AppError::EmptySignal`] when no sector has matchable signal.
    pub fn plan(&self, profile: &InterestProfile) -> AppResult<PoolPlan> {
        let projector = ProfileProjector::new(&self.catalog);
        let sectors: Vec<(String, String)> = projector
            .active_sectors(profile)
            .into_iter()
            .map(|(sector, seed)| (sector.name.clone(), seed))
            .collect();

        if sectors.is_empty() {
            return Err(AppError::EmptySignal);
        }

        let target_total = self.sizing.target_total(profile.interest_count());
        let per_sector = self.sizing.per_sector(target_total, sectors.len());

        Ok(PoolPlan {
            sectors,
            target_total,
            per_sector,
        })
    }

    /// Queries every active sector concurrently and merges the results
    pub async fn build(&self, profile: &InterestProfile) -> AppResult<CandidatePool> {
        let plan = self.plan(profile)?;

        tracing::info!(
            active_sectors = plan.sectors.len(),
            interest_count = profile.interest_count(),
            target_total = plan.target_total,
            per_sector = plan.per_sector,
            "Building candidate pool"
        );

        let mut tasks = Vec::with_capacity(plan.sectors.len());
        for (sector, seed) in plan.sectors {
            let retriever = Arc::clone(&self.retriever);
            let top_k = plan.per_sector;
            let name = sector.clone();
            let task =
                tokio::spawn(async move { retriever.retrieve(&name, &seed, top_k).await });
            tasks.push((sector, task));
        }

        // Awaited in catalog order so the merge never depends on completion order
        let mut sector_results: Vec<(String, Vec<Candidate>)> = Vec::new();
        let mut failed = 0usize;
        for (sector, task) in tasks {
            match task.await {
                Ok(Ok(candidates)) => sector_results.push((sector, candidates)),
                Ok(Err(e)) => {
                    failed += 1;
                    tracing::warn!(sector = %sector, error = %e, "Sector retrieval failed");
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(sector = %sector, error = %e, "Sector retrieval task panicked");
                }
            }
        }

        if sector_results.is_empty() {
            return Err(AppError::ExternalService(format!(
                "All {} sector queries failed",
                failed
            )));
        }

        if failed > 0 {
            tracing::warn!(
                success_count = sector_results.len(),
                error_count = failed,
                "Partial sector retrieval failure"
            );
        }

        let mut pool = CandidatePool::new();
        for (sector, candidates) in sector_results {
            pool.merge_sector(&sector, candidates);
        }
        pool.sort_by_score();

        tracing::info!(
            pool_size = pool.len(),
            target_total = plan.target_total,
            "Candidate pool built"
        );

        Ok(pool)
    }
}
