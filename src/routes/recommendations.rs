use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{InterestProfile, RankedRecommendation},
    routes::AppState,
    services::RecommendationView,
};

/// Handler generating a fresh recommendation list from an interest profile
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Json(profile): Json<InterestProfile>,
) -> AppResult<Json<RecommendationView>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        interest_count = profile.interest_count(),
        "Processing recommendation request"
    );

    let view = state.recommendations.recommend(user_id, &profile).await?;

    tracing::info!(
        request_id = %request_id,
        user_id,
        displayed = view.display.len(),
        "Recommendation request completed"
    );

    Ok(Json(view))
}

/// Handler restoring a previously persisted ranking
pub async fn restore(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(user_id): Path<i64>,
    Json(ranked): Json<Vec<RankedRecommendation>>,
) -> AppResult<Json<RecommendationView>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        ranked = ranked.len(),
        "Restoring recommendations"
    );

    let view = state.recommendations.load(user_id, ranked).await?;
    Ok(Json(view))
}

pub async fn current(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<RecommendationView>> {
    let view = state.recommendations.view(user_id).await?;
    Ok(Json(view))
}

/// Handler deleting one displayed recommendation
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((user_id, booth_id)): Path<(i64, String)>,
) -> AppResult<Json<RecommendationView>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        booth_id = %booth_id,
        "Deleting recommendation"
    );

    let view = state.recommendations.delete(user_id, &booth_id).await?;
    Ok(Json(view))
}
