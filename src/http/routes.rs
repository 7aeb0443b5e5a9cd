use super::handlers;
use super::state::AppState;
use crate::upload::IMPORT_SIZE_LIMIT_MB;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // Import limit plus one byte
    let body_limit = (IMPORT_SIZE_LIMIT_MB * 1024 * 1024 + 1) as usize;

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recorder state
        .route("/recordings", get(handlers::get_recorder))
        .route("/recordings/submit", post(handlers::submit_recordings))
        .route("/recordings/:channel", get(handlers::get_recording))
        .route("/recordings/:channel/artifact", get(handlers::get_artifact))
        // Capture control
        .route("/recordings/:channel/start", post(handlers::start_recording))
        .route("/recordings/:channel/pause", post(handlers::pause_recording))
        .route("/recordings/:channel/resume", post(handlers::resume_recording))
        .route("/recordings/:channel/stop", post(handlers::stop_recording))
        .route("/recordings/:channel/clear", post(handlers::clear_recording))
        .route("/recordings/:channel/playback", post(handlers::toggle_playback))
        // Imported files
        .route("/imports", post(handlers::select_import).delete(handlers::clear_import))
        .route("/imports/submit", post(handlers::submit_import))
        .layer(DefaultBodyLimit::max(body_limit))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
