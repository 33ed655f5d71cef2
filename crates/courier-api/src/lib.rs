//! HTTP control and query surface for Courier.
//!
//! A thin axum adapter over the scheduler's control operations and the
//! queue's read-only history queries, plus figment-based configuration
//! loading. The engine itself lives in `courier-delivery`; nothing here
//! owns delivery state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use courier_core::Storage;
use courier_delivery::Scheduler;

pub mod config;
pub mod handlers;
pub mod messages;
pub mod server;

pub use config::{Config, Mode};
pub use server::{create_router, start_server};

/// Shared application state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistent queue access.
    pub storage: Storage,
    /// Scheduler control surface.
    pub scheduler: Arc<Scheduler>,
    /// Operating mode reported by the health document.
    pub mode: Mode,
}

impl AppState {
    /// Creates the shared state.
    pub fn new(storage: Storage, scheduler: Arc<Scheduler>, mode: Mode) -> Self {
        Self { storage, scheduler, mode }
    }
}
