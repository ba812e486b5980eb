//! Orchestration probe endpoints

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use tracing::debug;

pub const BODY_UP: &str = "OK";
pub const BODY_DOWN: &str = "DOWN";

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/ping", get(handle_readiness))
        .route("/healthz/ready", get(handle_readiness))
        .route("/healthz/live", get(handle_liveness))
}

/// Runs the composite check. Failure causes are logged by the checker and
/// never echoed to the caller.
pub async fn handle_readiness(State(state): State<AppState>) -> impl IntoResponse {
    let verdict = state.health_checker.check().await;

    if verdict.is_healthy() {
        (StatusCode::OK, BODY_UP)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, BODY_DOWN)
    }
}

/// Process liveness only; touches no dependency.
pub async fn handle_liveness() -> StatusCode {
    debug!("liveness probe");
    StatusCode::OK
}
