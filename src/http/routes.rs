use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Wizard progress
        .route("/wizard", get(handlers::get_wizard))
        .route("/wizard/consent", post(handlers::accept_consent))
        .route("/wizard/details", post(handlers::submit_details))
        // Recording control
        .route(
            "/recording",
            get(handlers::get_recording).delete(handlers::close_recording),
        )
        .route("/recording/start", post(handlers::start_recording))
        .route("/recording/pause", post(handlers::pause_recording))
        .route("/recording/resume", post(handlers::resume_recording))
        .route("/recording/stop", post(handlers::stop_recording))
        .route("/recording/rerecord", post(handlers::rerecord))
        .route("/recording/submit", post(handlers::submit_story))
        .route("/recording/artifact", get(handlers::get_artifact))
        .route("/recording/leave-guard", get(handlers::leave_guard))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
