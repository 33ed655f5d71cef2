//! Request handlers for the control and query surface.

pub mod health;
pub mod messages;
pub mod messaging;

pub use health::health;
pub use messages::{get_message, list_messages};
pub use messaging::{messaging_status, start_messaging, stop_messaging};

use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Error envelope returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: &'static str,
    /// When the error was produced.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description.
    pub message: String,
}

impl ErrorResponse {
    /// Builds an error envelope with the current timestamp.
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: "error", timestamp: Utc::now(), message: message.into() }
    }

    /// Renders the envelope with the given HTTP status code.
    pub fn into_response_with(self, status: StatusCode) -> axum::response::Response {
        (status, Json(self)).into_response()
    }
}
