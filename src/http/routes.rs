use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Chunks arrive at ~10MB from the client's transfer strategy; leave
/// headroom for multipart framing.
const MAX_CHUNK_BODY: usize = 32 * 1024 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Chunked upload intake
        .route("/upload/chunk", post(handlers::upload_chunk))
        // Pipeline trigger for a reassembled file
        .route("/process", post(handlers::process_video))
        .layer(DefaultBodyLimit::max(MAX_CHUNK_BODY))
        .layer(cors)
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
