pub mod booth_catalog;
pub mod candidate_pool;
pub mod evaluations;
pub mod projector;
pub mod providers;
pub mod recommendation_list;
pub mod recommendations;
pub mod retriever;
pub mod sectors;

pub use booth_catalog::{BoothCatalog, BoothSource, JsonlBoothSource};
pub use candidate_pool::{CandidatePoolBuilder, PoolSizing, StepSizing};
pub use evaluations::{EvaluationStore, PgEvaluationStore};
pub use projector::ProfileProjector;
pub use recommendation_list::{EvaluationProgress, ListError, RecommendationList, DISPLAY_COUNT};
pub use recommendations::{RecommendationService, RecommendationView};
pub use retriever::{CandidateRetriever, EmbeddingRetriever};
pub use sectors::{Sector, SectorCatalog};
