use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Candidate, InterestProfile},
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct CandidatePoolResponse {
    pub candidates: Vec<Candidate>,
    pub sector_distribution: HashMap<String, usize>,
}

/// Handler for building a candidate pool without ranking it
pub async fn build_pool(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(profile): Json<InterestProfile>,
) -> AppResult<Json<CandidatePoolResponse>> {
    tracing::info!(
        request_id = %request_id,
        interest_count = profile.interest_count(),
        "Processing candidate pool request"
    );

    let pool = state.recommendations.candidate_pool(&profile).await?;
    let sector_distribution = pool.sector_distribution();

    tracing::info!(
        request_id = %request_id,
        pool_size = pool.len(),
        "Candidate pool built"
    );

    Ok(Json(CandidatePoolResponse {
        candidates: pool.candidates().to_vec(),
        sector_distribution,
    }))
}
