//! Core domain models and persistence for the Courier message dispatcher.
//!
//! Defines the message entity with its delivery lifecycle, the error
//! taxonomy shared across crates, and the PostgreSQL-backed queue that
//! owns all durability. The queue supports lock-free concurrent claiming
//! via `FOR UPDATE SKIP LOCKED`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod storage;

pub use error::{CoreError, Result};
pub use models::{Message, MessageStatus, NewMessage, MAX_CONTENT_LENGTH};
pub use storage::Storage;
