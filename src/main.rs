use std::sync::Arc;

use booth_recommender::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache},
    routes::{create_router, AppState},
    services::{
        providers::{GeminiEmbedder, GeminiRanker, PgSimilaritySearch},
        BoothCatalog, CandidatePoolBuilder, CandidateRetriever, EmbeddingRetriever,
        JsonlBoothSource, PgEvaluationStore, RecommendationService, SectorCatalog, StepSizing,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "booth_recommender=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db_pool = create_pool(&config.database_url).await?;
    run_migrations(&db_pool).await?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client).await;

    let embedder = Arc::new(GeminiEmbedder::new(
        cache,
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.embedding_model.clone(),
        config.embedding_cache_ttl_secs,
    ));
    let search = Arc::new(PgSimilaritySearch::new(db_pool.clone()));
    let retriever: Arc<dyn CandidateRetriever> = Arc::new(EmbeddingRetriever::new(
        embedder,
        search,
        config.match_threshold,
        config.external_timeout(),
    ));
    let ranker = Arc::new(GeminiRanker::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.ranking_model.clone(),
        config.ranking_count,
    ));

    let pool_builder = CandidatePoolBuilder::new(
        Arc::new(SectorCatalog::standard().clone()),
        Arc::clone(&retriever),
        Arc::new(StepSizing::default()),
    );
    let booths = Arc::new(BoothCatalog::new(Arc::new(JsonlBoothSource::new(
        &config.booth_data_path,
    ))));
    let recommendations = Arc::new(RecommendationService::new(
        pool_builder,
        retriever,
        ranker,
        Arc::new(PgEvaluationStore::new(db_pool)),
        Arc::clone(&booths),
        config.ranking_count,
        config.external_timeout(),
    ));

    let app = create_router(Arc::new(AppState {
        recommendations,
        booths,
    }));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
