pub mod error;
pub mod routes;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(routes::health_check))
        // Worker registry endpoints
        .route("/api/workers/register", post(routes::register_worker))
        .route("/api/workers", get(routes::list_workers))
        // Pipeline endpoints
        .route("/api/models/load", post(routes::load_model))
        .route("/api/generate", post(routes::generate))
        // Attach application state
        .with_state(state)
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
