//! Error types and result handling for queue operations.
//!
//! Store errors are propagated verbatim; the queue layer never retries.
//! Database errors are classified so callers can distinguish missing rows
//! and constraint violations (such as the recipient format check) from
//! connectivity failures.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for queue and storage operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Message content exceeds the application ceiling of
    /// [`crate::MAX_CONTENT_LENGTH`] bytes.
    #[error("message content exceeds maximum length: {length} bytes")]
    ContentTooLong {
        /// Length of the rejected content in bytes.
        length: usize,
    },

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Constraint violation, e.g. an invalid recipient address rejected by
    /// the store's check constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = CoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn content_too_long_reports_length() {
        let err = CoreError::ContentTooLong { length: 161 };
        assert_eq!(err.to_string(), "message content exceeds maximum length: 161 bytes");
    }
}
