use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::AppResult, middleware::request_id::RequestId, models::Booth, routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Handler for booth keyword search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Booth>>> {
    let booths = state.booths.search(&params.q).await?;

    tracing::info!(
        request_id = %request_id,
        term = %params.q,
        results = booths.len(),
        "Booth search completed"
    );

    Ok(Json(booths))
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    booths: usize,
}

/// Handler that refreshes the cached booth catalog from its source
pub async fn reload(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<ReloadResponse>> {
    let booths = state.booths.reload().await?;

    tracing::info!(request_id = %request_id, booths, "Booth catalog reloaded");

    Ok(Json(ReloadResponse { booths }))
}
