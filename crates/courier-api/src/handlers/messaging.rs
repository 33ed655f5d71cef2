//! Scheduler control handlers.
//!
//! Policy refusals ("already running", "not running") arrive from the
//! scheduler as response payloads, not errors; they map to 400 while the
//! payload passes through unchanged.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use courier_delivery::ControlStatus;

use crate::AppState;

/// Starts the message dispatch loop.
pub async fn start_messaging(State(state): State<AppState>) -> axum::response::Response {
    let response = state.scheduler.start().await;

    let status_code = match response.status {
        ControlStatus::Success => StatusCode::OK,
        ControlStatus::Error => StatusCode::BAD_REQUEST,
    };

    (status_code, Json(response)).into_response()
}

/// Stops the message dispatch loop.
pub async fn stop_messaging(State(state): State<AppState>) -> axum::response::Response {
    let response = state.scheduler.stop().await;

    let status_code = match response.status {
        ControlStatus::Success => StatusCode::OK,
        ControlStatus::Error => StatusCode::BAD_REQUEST,
    };

    (status_code, Json(response)).into_response()
}

/// Reports the scheduler's live status and configuration snapshot.
pub async fn messaging_status(State(state): State<AppState>) -> axum::response::Response {
    Json(state.scheduler.status().await).into_response()
}
