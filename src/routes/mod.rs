use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{BoothCatalog, RecommendationService},
};

pub mod booths;
pub mod candidates;
pub mod evaluations;
pub mod recommendations;

/// Shared state handed to every handler
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
    pub booths: Arc<BoothCatalog>,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/booths/search", get(booths::search))
        .route("/booths/reload", post(booths::reload))
        .route("/candidates", post(candidates::build_pool))
        .route(
            "/users/:user_id/recommendations",
            post(recommendations::generate)
                .put(recommendations::restore)
                .get(recommendations::current),
        )
        .route(
            "/users/:user_id/recommendations/:booth_id",
            delete(recommendations::remove),
        )
        .route(
            "/users/:user_id/evaluations/:booth_id",
            put(evaluations::rate),
        )
        .route("/users/:user_id/progress", get(evaluations::progress))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
