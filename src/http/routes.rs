//! HTTP route definitions

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::app::AppState;
use crate::game::{GameCommand, OperatorSignal, WorldSnapshot};
use crate::util::time::uptime_secs;
use crate::ws::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Browser controllers are served from anywhere on the local network
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/state", get(state_handler))
        .route("/operator/proceed", post(proceed_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    phase: &'static str,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.game.snapshot();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        phase: snapshot.phase,
        players: snapshot.players.len(),
    })
}

// ============================================================================
// Renderer and operator endpoints
// ============================================================================

async fn state_handler(State(state): State<AppState>) -> Json<WorldSnapshot> {
    Json(state.game.snapshot())
}

#[derive(Serialize)]
struct ProceedResponse {
    accepted: bool,
}

async fn proceed_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state
        .game
        .send(GameCommand::Operator(OperatorSignal::Proceed))
        .await
        .map_err(|e| {
            warn!(error = %e, "Operator signal dropped");
            AppError::Unavailable(e.to_string())
        })?;

    Ok((StatusCode::ACCEPTED, Json(ProceedResponse { accepted: true })))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
