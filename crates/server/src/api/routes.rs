use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::metrics_middleware;
use super::{admission, handlers, pdf};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Archives are accepted up to their uncompressed budget.
    let body_limit =
        usize::try_from(state.config().generation.max_archive_bytes).unwrap_or(usize::MAX);

    // Admin routes
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/admission", get(admission::get_status));

    Router::new()
        // Generation
        .route("/pdf", post(pdf::generate_from_template))
        .route("/zippedpdf", post(pdf::generate_from_archive))
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
