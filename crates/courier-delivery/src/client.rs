//! HTTP client for webhook delivery.
//!
//! Stateless outbound client. `send` issues exactly one POST; retry policy
//! lives in `send_with_retry`: up to `max_retries` additional attempts,
//! strictly serial, with a constant delay between them. No jitter, no
//! backoff growth, and no status-class shortcut (a 4xx retries the same
//! number of times as a 5xx).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SendError};

/// Client-level socket timeout for a single request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the webhook client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Destination for outbound sends.
    pub url: String,
    /// Additional attempts after the first failure; total attempts are
    /// `max_retries + 1`.
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
}

/// Outbound message body, posted as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MessagePayload {
    /// Destination address.
    pub to: String,
    /// Text payload.
    pub content: String,
}

/// Receiver reply snapshot for one delivery attempt.
///
/// Serialized verbatim into the message's `webhook_response` column on
/// success, so the field names here are part of the stored format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// HTTP status code of the reply.
    pub status_code: u16,
    /// The receiver's `message` field, or a decode-failure marker.
    pub message: String,
    /// The receiver's `messageId` field, empty when absent.
    pub message_id: String,
    /// When the reply was observed.
    pub timestamp: DateTime<Utc>,
}

/// Shape of the receiver's JSON reply; both fields are optional.
#[derive(Debug, Default, Deserialize)]
struct ReceiverReply {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "messageId")]
    message_id: String,
}

/// Stateless webhook sender.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl WebhookClient {
    /// Creates a new client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `SendError::Transport` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self { http, config })
    }

    /// Issues a single POST with a JSON `{"to", "content"}` body.
    ///
    /// The reply body is decoded best-effort: an undecodable body records
    /// the literal message `"failed to decode response"` and is not an
    /// error by itself. A status outside `[200, 300)` fails with
    /// [`SendError::Status`], which still carries the decoded response for
    /// the caller to inspect.
    ///
    /// # Errors
    ///
    /// `SendError::Transport` when no HTTP response was produced,
    /// `SendError::Status` on a non-2xx reply.
    pub async fn send(&self, payload: &MessagePayload) -> Result<WebhookResponse> {
        let response = self.http.post(&self.config.url).json(payload).send().await?;

        let status = response.status().as_u16();
        let reply: ReceiverReply = match response.json().await {
            Ok(reply) => reply,
            Err(_) => ReceiverReply {
                message: "failed to decode response".to_string(),
                ..ReceiverReply::default()
            },
        };

        let webhook_response = WebhookResponse {
            status_code: status,
            message: reply.message,
            message_id: reply.message_id,
            timestamp: Utc::now(),
        };

        if !(200..300).contains(&status) {
            return Err(SendError::Status { status, response: Box::new(webhook_response) });
        }

        Ok(webhook_response)
    }

    /// Delivers with the retry policy: up to `max_retries + 1` serial
    /// attempts, waiting `retry_delay` between them.
    ///
    /// The inter-attempt wait selects between the delay timer and the
    /// cancellation token; cancellation during the wait returns
    /// [`SendError::Cancelled`] carrying the most recent response. The
    /// first successful attempt returns immediately; exhaustion returns
    /// the last error.
    ///
    /// # Errors
    ///
    /// The last [`SendError`] once all attempts are spent, or
    /// `SendError::Cancelled` when the token fires during a wait.
    pub async fn send_with_retry(
        &self,
        cancel: &CancellationToken,
        payload: &MessagePayload,
    ) -> Result<WebhookResponse> {
        let mut last = match self.send(payload).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        for attempt in 1..=self.config.max_retries {
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(SendError::Cancelled { last_response: last.into_response() });
                }
                () = tokio::time::sleep(self.config.retry_delay) => {}
            }

            debug!(attempt, to = %payload.to, "retrying webhook delivery");

            match self.send(payload).await {
                Ok(response) => return Ok(response),
                Err(err) => last = err,
            }
        }

        Err(last)
    }
}
