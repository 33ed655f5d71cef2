//! Message entity and its delivery lifecycle.
//!
//! A message moves through a strict partial order of states; `sent` and
//! `failed` are terminal from the dispatcher's perspective. The status is
//! stored as a lowercase TEXT value, decoded through a manual sqlx
//! implementation so the database never sees an unknown state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type BoxDynError = sqlx::error::BoxDynError;

/// Application-enforced ceiling on message content, in bytes.
///
/// The database carries a looser CHECK at 1,000 bytes as defense in depth.
pub const MAX_CONTENT_LENGTH: usize = 160;

/// Message delivery status.
///
/// ```text
/// Pending -> Sending -> Sent
///                    -> Failed
/// ```
///
/// A row in `Sending` is held by exactly one claimer; there are no
/// backward transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Enqueued and waiting to be claimed.
    Pending,
    /// Claimed by a dispatcher; delivery in flight.
    Sending,
    /// Delivered to the webhook receiver (terminal).
    Sent,
    /// Delivery failed after all attempts (terminal).
    Failed,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sending => write!(f, "sending"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl sqlx::Type<PgDb> for MessageStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for MessageStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "pending" => Ok(Self::Pending),
            "sending" => Ok(Self::Sending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid message status: {s}").into()),
        }
    }
}

/// Persistent message entity, one row in the `messages` table.
///
/// `sent_at`, `message_id`, and `webhook_response` are null unless the
/// status is [`MessageStatus::Sent`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    /// Monotonically assigned identity, immutable.
    pub id: i64,

    /// Destination address in E.164 form (`+` followed by 2-15 digits).
    pub to: String,

    /// Text payload, at most [`MAX_CONTENT_LENGTH`] bytes on enqueue.
    pub content: String,

    /// Current lifecycle status.
    pub status: MessageStatus,

    /// When the webhook receiver accepted the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    /// Opaque identifier assigned by the webhook receiver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Snapshot of the receiver's reply, recorded on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_response: Option<serde_json::Value>,

    /// Insertion time, immutable.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every status transition.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for enqueuing a new message.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    /// Destination address.
    pub to: String,
    /// Text payload.
    pub content: String,
}
