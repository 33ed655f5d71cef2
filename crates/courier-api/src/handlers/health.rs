//! Health check handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::{config::Mode, AppState};

/// Health check response document.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when the service and its database are reachable.
    pub status: &'static str,
    /// When the check was performed.
    pub timestamp: DateTime<Utc>,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Operating mode the server was started in.
    pub mode: Mode,
}

/// Reports service liveness and database connectivity.
///
/// Returns 200 with `status: "ok"` when the database answers, 503 when it
/// does not. Designed for frequent polling; the check is a single trivial
/// query.
pub async fn health(State(state): State<AppState>) -> axum::response::Response {
    let (status, status_code) = match state.storage.health_check().await {
        Ok(()) => ("ok", StatusCode::OK),
        Err(err) => {
            error!(error = %err, "health check failed");
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
        },
    };

    let response = HealthResponse {
        status,
        timestamp: Utc::now(),
        service: "courier",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.mode,
    };

    (status_code, Json(response)).into_response()
}
