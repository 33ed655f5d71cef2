//! Read-only message history queries with pagination rules.
//!
//! Pages start at 1; anything lower is normalized. A page size of zero
//! selects the default, negative sizes are rejected, and sizes above
//! [`MAX_PAGE_SIZE`] fail rather than silently clamping.

use courier_core::{CoreError, Message, Storage};
use thiserror::Error;

/// Page size applied when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Upper bound on the page size, keeping response sizes predictable.
pub const MAX_PAGE_SIZE: i64 = 100;
/// Smallest acceptable explicit page size.
pub const MIN_PAGE_SIZE: i64 = 1;
/// Pages are numbered from 1.
pub const MIN_PAGE: i64 = 1;

/// Errors for history queries.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Negative page size.
    #[error("page size cannot be negative")]
    InvalidPageSize,

    /// Page size above [`MAX_PAGE_SIZE`].
    #[error("page size cannot exceed {MAX_PAGE_SIZE}")]
    PageSizeTooLarge,

    /// Page size below [`MIN_PAGE_SIZE`].
    #[error("page size must be at least {MIN_PAGE_SIZE}")]
    PageSizeTooSmall,

    /// No message with the requested id.
    #[error("message not found")]
    MessageNotFound,

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] CoreError),
}

/// One page of sent-message history.
#[derive(Debug)]
pub struct SentPage {
    /// Messages on this page, most recently sent first.
    pub messages: Vec<Message>,
    /// Total number of sent messages.
    pub total: i64,
    /// Normalized page number.
    pub page: i64,
    /// Normalized page size.
    pub page_size: i64,
}

/// Validates and normalizes a requested page size.
///
/// # Errors
///
/// `QueryError::InvalidPageSize` for negative values,
/// `QueryError::PageSizeTooLarge` above [`MAX_PAGE_SIZE`], and
/// `QueryError::PageSizeTooSmall` below [`MIN_PAGE_SIZE`].
pub fn normalize_page_size(page_size: i64) -> Result<i64, QueryError> {
    if page_size < 0 {
        return Err(QueryError::InvalidPageSize);
    }
    if page_size == 0 {
        return Ok(DEFAULT_PAGE_SIZE);
    }
    if page_size > MAX_PAGE_SIZE {
        return Err(QueryError::PageSizeTooLarge);
    }
    if page_size < MIN_PAGE_SIZE {
        return Err(QueryError::PageSizeTooSmall);
    }

    Ok(page_size)
}

/// History query service over the persistent queue.
pub struct MessageService {
    storage: Storage,
}

impl MessageService {
    /// Creates the service.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Returns one page of sent messages plus the total count.
    ///
    /// # Errors
    ///
    /// Pagination validation errors, or `QueryError::Store` on database
    /// failure.
    pub async fn sent_messages(&self, page: i64, page_size: i64) -> Result<SentPage, QueryError> {
        let page = page.max(MIN_PAGE);
        let page_size = normalize_page_size(page_size)?;
        let offset = (page - 1) * page_size;

        let messages = self.storage.messages.list_sent(page_size, offset).await?;
        let total = self.storage.messages.count_sent().await?;

        Ok(SentPage { messages, total, page, page_size })
    }

    /// Fetches a single message by id.
    ///
    /// # Errors
    ///
    /// `QueryError::MessageNotFound` when the id does not exist.
    pub async fn message_by_id(&self, id: i64) -> Result<Message, QueryError> {
        match self.storage.messages.find_by_id(id).await? {
            Some(message) => Ok(message),
            None => Err(QueryError::MessageNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_selects_default() {
        assert_eq!(normalize_page_size(0).unwrap(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn maximum_page_size_is_accepted() {
        assert_eq!(normalize_page_size(MAX_PAGE_SIZE).unwrap(), MAX_PAGE_SIZE);
    }

    #[test]
    fn page_size_above_maximum_is_rejected() {
        let err = normalize_page_size(MAX_PAGE_SIZE + 1).unwrap_err();
        assert!(matches!(err, QueryError::PageSizeTooLarge));
        assert_eq!(err.to_string(), "page size cannot exceed 100");
    }

    #[test]
    fn negative_page_size_is_rejected() {
        let err = normalize_page_size(-1).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPageSize));
    }
}
