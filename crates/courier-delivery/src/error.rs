//! Error types for webhook delivery.
//!
//! A failed HTTP exchange still produces a partially populated
//! [`WebhookResponse`] that callers may inspect; the error variants carry
//! it rather than discarding it.

use thiserror::Error;

use crate::client::WebhookResponse;

/// Result type alias for delivery operations.
pub type Result<T, E = SendError> = std::result::Result<T, E>;

/// Errors surfaced by the webhook sender.
#[derive(Debug, Error)]
pub enum SendError {
    /// Request never produced an HTTP response: connection failure, DNS,
    /// or the client-level socket timeout.
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The receiver answered outside `[200, 300)`.
    #[error("webhook returned status: {status}")]
    Status {
        /// HTTP status code of the reply.
        status: u16,
        /// The reply as far as it could be decoded.
        response: Box<WebhookResponse>,
    },

    /// Cancelled while waiting between retry attempts.
    #[error("send cancelled while waiting to retry")]
    Cancelled {
        /// Most recent response observed before cancellation, if any.
        last_response: Option<Box<WebhookResponse>>,
    },
}

impl SendError {
    /// Returns the partially populated response, when one was observed.
    pub fn response(&self) -> Option<&WebhookResponse> {
        match self {
            Self::Status { response, .. } => Some(response),
            Self::Cancelled { last_response } => last_response.as_deref(),
            Self::Transport(_) => None,
        }
    }

    /// Consumes the error, yielding the last observed response.
    pub(crate) fn into_response(self) -> Option<Box<WebhookResponse>> {
        match self {
            Self::Status { response, .. } => Some(response),
            Self::Cancelled { last_response } => last_response,
            Self::Transport(_) => None,
        }
    }
}
