//! Courier service entry point.
//!
//! Wires the queue, webhook client, dispatcher, and scheduler together,
//! serves the REST control surface, and coordinates graceful shutdown
//! through a single process-scoped cancellation token.

mod seed;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courier_api::{server, AppState, Config};
use courier_core::{storage, Storage};
use courier_delivery::{Dispatcher, Scheduler, WebhookClient};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "courier", about = "Persistent, controllable webhook message dispatcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run migrations and serve the REST API
    Serve,
    /// Apply the database schema and exit
    Migrate,
    /// Insert random sample messages for local testing
    Seed {
        /// Number of messages to insert
        #[arg(long, default_value_t = 50)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let pool = create_pool(&config).await?;
            storage::migrate(&pool).await?;
            info!("database schema is up to date");
            Ok(())
        },
        Command::Seed { count } => {
            let pool = create_pool(&config).await?;
            storage::migrate(&pool).await?;
            seed::seed_messages(&Storage::new(pool), count).await
        },
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(
        mode = %config.server_mode,
        database_url = %config.database_url_masked(),
        webhook_url = %config.webhook_url,
        "starting courier"
    );

    let pool = create_pool(&config).await?;
    info!("database connection pool established");

    storage::migrate(&pool).await.context("failed to run migrations")?;
    info!("database migrations completed");

    let storage = Storage::new(pool.clone());
    let client = Arc::new(WebhookClient::new(config.client_config())?);
    let dispatcher = Dispatcher::new(storage.clone(), client, config.messaging_batch_size);

    let shutdown = CancellationToken::new();
    let scheduler =
        Arc::new(Scheduler::new(dispatcher, config.scheduler_config(), shutdown.clone()));

    if config.messaging_enabled {
        scheduler.start().await;
    }

    let state = AppState::new(storage, scheduler, config.server_mode);
    let addr = config.server_addr()?;
    let request_timeout = Duration::from_secs(config.request_timeout);

    let server_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = server::start_server(state, addr, request_timeout, shutdown).await {
                error!(error = %err, "server failed");
            }
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received, starting graceful shutdown");

    shutdown.cancel();
    let _ = server_handle.await;

    pool.close().await;
    info!("courier shutdown complete");

    Ok(())
}

/// Initializes tracing, preferring `RUST_LOG` over the configured level.
fn init_tracing(default_level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_target(true)).init();
}

/// Creates the database connection pool, retrying while the database
/// comes up.
async fn create_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let mut retries = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(_) if retries < MAX_RETRIES => {
                retries += 1;
                info!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    "database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(err) => {
                return Err(err)
                    .context("failed to create database connection pool after retries");
            },
        }
    }
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received CTRL+C");
        },
        () = terminate => {
            info!("received SIGTERM");
        },
    }
}
