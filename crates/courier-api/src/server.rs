//! HTTP server configuration and request routing.
//!
//! The router mounts the control and query surface under `/api/v1` with
//! request tracing and a timeout layer. Shutdown is driven by the same
//! process-scoped cancellation token the scheduler observes, so one signal
//! winds down both the driver loop and the listener.

use std::{net::SocketAddr, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{handlers, AppState};

/// Creates the axum router with all routes and middleware.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/messaging/start", post(handlers::start_messaging))
        .route("/api/v1/messaging/stop", post(handlers::stop_messaging))
        .route("/api/v1/messaging/status", get(handlers::messaging_status))
        .route("/api/v1/messages", get(handlers::list_messages))
        .route("/api/v1/messages/{id}", get(handlers::get_message))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves until the shutdown token is cancelled.
///
/// In-flight requests are allowed to complete after cancellation.
///
/// # Errors
///
/// Returns `std::io::Error` when the address cannot be bound.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let app = create_router(state, request_timeout);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}
