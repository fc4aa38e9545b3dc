use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult, middleware::request_id::RequestId, routes::AppState,
    services::EvaluationProgress,
};

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    #[serde(default)]
    pub booth_rating: Option<u8>,
    #[serde(default, alias = "rec_rating")]
    pub recommendation_rating: Option<u8>,
}

/// Handler recording ratings for a displayed recommendation
pub async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((user_id, booth_id)): Path<(i64, String)>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<EvaluationProgress>> {
    tracing::info!(
        request_id = %request_id,
        user_id,
        booth_id = %booth_id,
        "Recording evaluation"
    );

    let progress = state
        .recommendations
        .rate(
            user_id,
            &booth_id,
            request.booth_rating,
            request.recommendation_rating,
        )
        .await?;

    Ok(Json(progress))
}

pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<EvaluationProgress>> {
    let progress = state.recommendations.progress(user_id).await?;
    Ok(Json(progress))
}
