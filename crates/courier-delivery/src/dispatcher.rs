//! Per-tick batch processor.
//!
//! One tick claims up to `batch_size` messages and fans them out to
//! concurrent workers, bounded by a semaphore of the same size. Worker
//! failures never abort the batch and batch failures never abort the
//! scheduler: every outcome ends in a terminal status write or a log line.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use courier_core::{Message, MessageStatus, Storage};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::{MessagePayload, WebhookClient};

/// Hard ceiling for one message's entire send-with-retry pipeline.
pub const MAX_MESSAGE_SENDING_TIME: Duration = Duration::from_secs(5);

/// Claims and delivers one batch of messages per invocation.
#[derive(Clone)]
pub struct Dispatcher {
    storage: Storage,
    client: Arc<WebhookClient>,
    batch_size: usize,
}

impl Dispatcher {
    /// Creates a dispatcher over the given queue and sender.
    pub fn new(storage: Storage, client: Arc<WebhookClient>, batch_size: usize) -> Self {
        Self { storage, client, batch_size }
    }

    /// Runs one tick: claim up to `batch_size` messages, deliver them
    /// concurrently, and write terminal statuses.
    ///
    /// Claims are serial and stop at the first empty result; a claim error
    /// is logged and skips that slot without aborting the batch. The tick
    /// returns when every worker finished or when the token is cancelled,
    /// whichever comes first; on cancellation, in-flight workers keep
    /// running detached and observe the cancellation themselves.
    pub async fn process_batch(&self, cancel: &CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.batch_size));
        let mut workers = Vec::new();

        info!("processing messages");

        for _ in 0..self.batch_size {
            let message = match self.storage.messages.claim_next().await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(err) => {
                    error!(error = %err, "failed to claim message");
                    continue;
                },
            };

            let dispatcher = self.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();
            workers.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                dispatcher.process_message(&cancel, &message).await;
            }));
        }

        let claimed = workers.len();
        let drain = async {
            for worker in workers {
                let _ = worker.await;
            }
        };

        tokio::select! {
            () = cancel.cancelled() => {
                info!("batch processing cancelled");
            }
            () = drain => {
                info!(processed = claimed, "batch processing completed");
            }
        }
    }

    /// Delivers one claimed message and records the outcome.
    ///
    /// The whole send-with-retry pipeline runs under a hard
    /// [`MAX_MESSAGE_SENDING_TIME`] deadline derived from the tick's
    /// cancellation scope. Any send failure, deadline included, marks the
    /// message `failed` with no delivery fields.
    async fn process_message(&self, cancel: &CancellationToken, message: &Message) {
        let payload =
            MessagePayload { to: message.to.clone(), content: message.content.clone() };

        let outcome = tokio::time::timeout(
            MAX_MESSAGE_SENDING_TIME,
            self.client.send_with_retry(cancel, &payload),
        )
        .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(id = message.id, error = %err, "failed to send message");
                self.mark_failed(message.id).await;
                return;
            },
            Err(_) => {
                error!(id = message.id, "message exceeded the per-message deadline");
                self.mark_failed(message.id).await;
                return;
            },
        };

        let response_json =
            serde_json::to_value(&response).unwrap_or(serde_json::Value::Null);

        if let Err(err) = self
            .storage
            .messages
            .finalize(
                message.id,
                MessageStatus::Sent,
                Some(Utc::now()),
                Some(response.message_id),
                Some(response_json),
            )
            .await
        {
            error!(id = message.id, error = %err, "failed to record delivery");
            return;
        }

        debug!(id = message.id, to = %message.to, "message sent successfully");
    }

    async fn mark_failed(&self, id: i64) {
        if let Err(err) =
            self.storage.messages.finalize(id, MessageStatus::Failed, None, None, None).await
        {
            error!(id, error = %err, "failed to mark message as failed");
        }
    }
}
