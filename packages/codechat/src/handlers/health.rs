use axum::{Json, extract::State, response::IntoResponse};
use chat_session::SessionState;

use crate::AppState;
use crate::metrics;

/// Health check endpoint - returns bridge and session status
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.state();
    let metrics = state.metrics.snapshot();

    let status = match session {
        SessionState::Terminated => "degraded",
        SessionState::Authenticated => "healthy",
        SessionState::Uninitialized | SessionState::AwaitingAuthentication => "starting",
    };

    Json(metrics::HealthStatus {
        status: status.to_string(),
        session,
        viewers: state.push.viewer_count() as u64,
        uptime_secs: metrics.uptime_secs,
    })
}

/// Metrics endpoint - returns detailed server metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Liveness probe - returns 200 if the server is running
pub async fn health_live_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}
