use super::state::AppState;
use crate::error::ControlConflict;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    /// Hold-to-talk instead of toggle mute
    #[serde(default)]
    pub push_to_talk: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ControlConflict {
    fn into_response(self) -> Response {
        let status = match self {
            ControlConflict::AlreadyRunning => StatusCode::CONFLICT,
            ControlConflict::NotRunning => StatusCode::NOT_FOUND,
            ControlConflict::WrongMode => StatusCode::BAD_REQUEST,
        };
        warn!("Rejected control request: {}", self);
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /start
/// Start a session; a request without a JSON body means toggle mode.
/// A malformed JSON body is rejected.
pub async fn start_session(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(JsonRejection::MissingJsonContentType(_)) => {
            info!("No JSON body; defaulting to toggle mode");
            StartRequest::default()
        }
        Err(rejection) => {
            warn!("Rejected start request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };
    info!("Start requested (push_to_talk={})", req.push_to_talk);

    match state.manager.start(req.push_to_talk).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(conflict) => conflict.into_response(),
    }
}

/// POST /stop
pub async fn stop_session(State(state): State<AppState>) -> Response {
    info!("Stop requested");
    match state.manager.stop().await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(conflict) => conflict.into_response(),
    }
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.manager.status().await))
}

/// POST /toggle-mute
pub async fn toggle_mute(State(state): State<AppState>) -> Response {
    match state.manager.toggle_mute().await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(conflict) => conflict.into_response(),
    }
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> Response {
    match state.manager.stats().await {
        Some(stats) => (StatusCode::OK, Json(stats)).into_response(),
        None => ControlConflict::NotRunning.into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
