//! Repository for message queue database operations.
//!
//! Owns the claim protocol: the oldest `pending` row is moved to `sending`
//! in a single conditional UPDATE whose inner SELECT uses `FOR UPDATE SKIP
//! LOCKED`, so concurrent claimers each receive a distinct row or nothing,
//! never the same row and never a block on each other's locks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::{CoreError, Result},
    models::{Message, MessageStatus, NewMessage, MAX_CONTENT_LENGTH},
};

const MESSAGE_COLUMNS: &str =
    r#"id, "to", content, status, sent_at, message_id, webhook_response, created_at, updated_at"#;

/// Repository for message rows.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Enqueues a new message in the `pending` state and returns the row.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ContentTooLong` if the content exceeds
    /// [`MAX_CONTENT_LENGTH`] bytes, or `CoreError::ConstraintViolation`
    /// when the store rejects the recipient address.
    pub async fn create(&self, new: &NewMessage) -> Result<Message> {
        if new.content.len() > MAX_CONTENT_LENGTH {
            return Err(CoreError::ContentTooLong { length: new.content.len() });
        }

        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages ("to", content, status)
            VALUES ($1, $2, 'pending')
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(&new.to)
        .bind(&new.content)
        .fetch_one(&*self.pool)
        .await?;

        Ok(message)
    }

    /// Atomically claims the oldest `pending` message, moving it to
    /// `sending`, and returns the updated row.
    ///
    /// The selection and the status transition are one SQL statement; rows
    /// locked by another claimer are skipped rather than waited on. Returns
    /// `None` when no `pending` row exists.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the statement fails.
    pub async fn claim_next(&self) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            UPDATE messages
            SET status = 'sending', updated_at = NOW()
            WHERE id = (
                SELECT id FROM messages
                WHERE status = 'pending'
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .fetch_optional(&*self.pool)
        .await?;

        Ok(message)
    }

    /// Writes a terminal status and the delivery fields that accompany it.
    ///
    /// Only the provided optional fields are written; absent options leave
    /// the stored values untouched. `updated_at` is always refreshed. The
    /// source status is not validated; callers are trusted.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the update fails.
    pub async fn finalize(
        &self,
        id: i64,
        status: MessageStatus,
        sent_at: Option<DateTime<Utc>>,
        message_id: Option<String>,
        webhook_response: Option<serde_json::Value>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE messages
            SET status = $2,
                updated_at = NOW(),
                sent_at = COALESCE($3, sent_at),
                message_id = COALESCE($4, message_id),
                webhook_response = COALESCE($5, webhook_response)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(sent_at)
        .bind(message_id)
        .bind(webhook_response)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Lists successfully delivered messages, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the query fails.
    pub async fn list_sent(&self, limit: i64, offset: i64) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE status = 'sent'
            ORDER BY sent_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await?;

        Ok(messages)
    }

    /// Counts successfully delivered messages.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the query fails.
    pub async fn count_sent(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE status = 'sent'")
                .fetch_one(&*self.pool)
                .await?;

        Ok(count)
    }

    /// Fetches a message by id, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_rejects_oversized_content_before_touching_the_store() {
        // Lazy pool: the length check must fire before any connection is
        // attempted, so this test needs no database.
        let pool = PgPool::connect_lazy("postgresql://localhost/courier").unwrap();
        let repo = Repository::new(Arc::new(pool));

        let new = NewMessage { to: "+905551111111".to_string(), content: "x".repeat(161) };
        let err = repo.create(&new).await.unwrap_err();

        assert!(matches!(err, CoreError::ContentTooLong { length: 161 }));
    }
}
