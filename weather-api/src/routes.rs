//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Weather lookups
        .route("/weather", get(handlers::get_weather))
        .route("/forecast", get(handlers::get_forecast))

        // Operations
        .route("/logs", get(handlers::get_logs))
        .route("/admin/cache/clear", post(handlers::clear_cache))
        .route("/admin/cache/stats", get(handlers::cache_stats))

        .fallback(handlers::fallback)
        .with_state(state)
}
