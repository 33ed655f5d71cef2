//! Webhook delivery engine for the Courier message dispatcher.
//!
//! Three cooperating pieces:
//!
//! - [`client::WebhookClient`] delivers one message over HTTP with a
//!   fixed-delay retry policy.
//! - [`dispatcher::Dispatcher`] turns one scheduler tick into a bounded
//!   batch of concurrent deliveries claimed from PostgreSQL.
//! - [`scheduler::Scheduler`] owns the running/stopped state machine and
//!   the periodic driver loop.
//!
//! Work distribution is lock-free: claims go through the queue's
//! `FOR UPDATE SKIP LOCKED` protocol, so independent processes can share
//! one queue without ever handing the same message to two workers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod scheduler;

pub use client::{ClientConfig, MessagePayload, WebhookClient, WebhookResponse};
pub use dispatcher::Dispatcher;
pub use error::SendError;
pub use scheduler::{ControlResponse, ControlStatus, Scheduler, SchedulerConfig, SchedulerStatus};
