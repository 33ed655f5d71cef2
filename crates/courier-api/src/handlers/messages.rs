//! Sent-message history handlers.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use courier_core::Message;
use serde::Serialize;
use tracing::error;

use super::ErrorResponse;
use crate::{
    messages::{MessageService, QueryError, DEFAULT_PAGE_SIZE},
    AppState,
};

/// Paginated listing response document.
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// When the listing was produced.
    pub timestamp: DateTime<Utc>,
    /// Messages on this page.
    pub messages: Vec<Message>,
    /// Total sent messages across all pages.
    pub total: i64,
    /// Normalized page number.
    pub page: i64,
    /// Normalized page size.
    pub page_size: i64,
}

/// Single-message response document.
#[derive(Debug, Serialize)]
pub struct SingleMessageResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// The requested message.
    pub message: Message,
}

/// Lists successfully sent messages, newest first.
///
/// `page` and `page_size` are parsed leniently: a missing or non-numeric
/// value falls back to its default rather than failing the request. Range
/// validation stays with the query service.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let service = MessageService::new(state.storage.clone());

    let page = params.get("page").and_then(|raw| raw.parse::<i64>().ok()).unwrap_or(1);
    let page_size = params
        .get("page_size")
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE);

    match service.sent_messages(page, page_size).await {
        Ok(page) => Json(MessageListResponse {
            status: "ok",
            timestamp: Utc::now(),
            messages: page.messages,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        })
        .into_response(),
        Err(
            err @ (QueryError::InvalidPageSize
            | QueryError::PageSizeTooLarge
            | QueryError::PageSizeTooSmall),
        ) => ErrorResponse::new(err.to_string()).into_response_with(StatusCode::BAD_REQUEST),
        Err(err) => {
            error!(error = %err, "failed to list messages");
            ErrorResponse::new("internal server error")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}

/// Fetches a single message by id.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    let service = MessageService::new(state.storage.clone());

    match service.message_by_id(id).await {
        Ok(message) => {
            Json(SingleMessageResponse { status: "ok", timestamp: Utc::now(), message })
                .into_response()
        },
        Err(QueryError::MessageNotFound) => {
            ErrorResponse::new("message not found").into_response_with(StatusCode::NOT_FOUND)
        },
        Err(err) => {
            error!(error = %err, id, "failed to fetch message");
            ErrorResponse::new("internal server error")
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        },
    }
}
