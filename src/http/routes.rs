use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/start", post(handlers::start_session))
        .route("/stop", post(handlers::stop_session))
        .route("/toggle-mute", post(handlers::toggle_mute))
        // Queries
        .route("/status", get(handlers::get_status))
        .route("/stats", get(handlers::get_stats))
        .layer(TraceLayer::new_for_http())
        // The desktop front end calls from another origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
