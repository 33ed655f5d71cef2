//! Database access layer for the message queue.
//!
//! The repository is the only place that touches SQL; the database *is*
//! the queue, so there is no in-memory work queue anywhere else. All
//! operations propagate store errors verbatim.

use std::sync::Arc;

use sqlx::PgPool;

pub mod messages;

use crate::error::Result;

/// Container for repository instances providing unified database access.
#[derive(Clone)]
pub struct Storage {
    /// Repository for message queue operations.
    pub messages: Arc<messages::Repository>,
}

impl Storage {
    /// Creates a new storage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self { messages: Arc::new(messages::Repository::new(pool)) }
    }

    /// Performs a health check on the database connection.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.messages.pool()).await?;

        Ok(())
    }
}

/// Creates the `messages` table and its indexes if they do not exist.
///
/// Idempotent; safe to run on every startup. The CHECK constraints are the
/// store-level defense: content capped at 1,000 bytes and recipients
/// matching an E.164-like pattern.
///
/// # Errors
///
/// Returns `CoreError::Database` if any DDL statement fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id BIGSERIAL PRIMARY KEY,
            "to" TEXT NOT NULL,
            content TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            sent_at TIMESTAMPTZ,
            message_id TEXT,
            webhook_response JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT check_content_length CHECK (length(content) <= 1000),
            CONSTRAINT check_recipient_format CHECK ("to" ~ '^\+[1-9]\d{1,14}$')
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_status ON messages(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_sent_at ON messages(sent_at)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_can_be_created() {
        // Lazy pool never connects; actual database behavior is covered by
        // the integration tests.
        let pool = PgPool::connect_lazy("postgresql://localhost/courier").unwrap();
        let _storage = Storage::new(pool);
    }
}
