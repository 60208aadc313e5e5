//! Route configuration and setup

use crate::handlers;
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use fluxio_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    // The reference deployment serves the form from the same origin; the
    // API itself stays permissive.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/submit_task", post(handlers::submit::submit_task))
        .route("/api/validate_path", post(handlers::validate::validate_path))
        .route("/api/task_status", post(handlers::status::task_status))
        .route("/api/upload", post(handlers::upload::upload))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .with_state(state)
}
