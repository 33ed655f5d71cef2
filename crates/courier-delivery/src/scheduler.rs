//! Controllable scheduler driving periodic dispatch.
//!
//! Two states, stopped and running. Starting allocates a fresh stop token
//! and spawns the driver loop; stopping closes the token. "Already
//! running" and "not running" are policy outcomes encoded in the response
//! status, never error values. The `running` flag and the stop token are
//! only ever changed together under the write lock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::RwLock,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::dispatcher::Dispatcher;

/// Scheduler configuration snapshot, immutable per process.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Duration between ticks.
    pub interval: Duration,
    /// Maximum messages per tick; also the worker concurrency cap.
    pub batch_size: usize,
    /// Additional send attempts after the first failure.
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub retry_delay: Duration,
    /// When false the driver loop exits immediately after start, so
    /// `start` succeeds but no ticks fire.
    pub enabled: bool,
}

/// Outcome discriminator for control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    /// The transition happened.
    Success,
    /// Policy refusal: the scheduler was already in the requested state.
    Error,
}

/// Reply to a start or stop request.
#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    /// Whether the transition happened.
    pub status: ControlStatus,
    /// When the request was handled.
    pub timestamp: DateTime<Utc>,
    /// Human-readable outcome description.
    pub message: String,
}

impl ControlResponse {
    fn success(message: &str) -> Self {
        Self { status: ControlStatus::Success, timestamp: Utc::now(), message: message.into() }
    }

    fn error(message: &str) -> Self {
        Self { status: ControlStatus::Error, timestamp: Utc::now(), message: message.into() }
    }
}

/// Point-in-time scheduler status snapshot.
///
/// `enabled` reflects the live running flag, not the configuration's
/// `enabled` option. Durations are rendered as compact human-readable
/// strings such as `"2m0s"`.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    /// Always `"ok"`.
    pub status: &'static str,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Live running flag.
    pub enabled: bool,
    /// Tick period.
    pub interval: String,
    /// Maximum messages per tick.
    pub batch_size: usize,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Delay between attempts.
    pub retry_delay: String,
}

struct DriverState {
    running: bool,
    stop: CancellationToken,
}

/// Controllable state machine owning the periodic driver loop.
pub struct Scheduler {
    dispatcher: Dispatcher,
    config: SchedulerConfig,
    shutdown: CancellationToken,
    state: RwLock<DriverState>,
}

impl Scheduler {
    /// Creates a stopped scheduler.
    ///
    /// `shutdown` is the process-scoped cancellation handle; cancelling it
    /// terminates the driver loop and propagates to in-flight workers, but
    /// leaves the running flag untouched until `stop` is called.
    pub fn new(
        dispatcher: Dispatcher,
        config: SchedulerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dispatcher,
            config,
            shutdown,
            state: RwLock::new(DriverState { running: false, stop: CancellationToken::new() }),
        }
    }

    /// Starts the driver loop.
    ///
    /// Returns a policy error response when already running; the state is
    /// unchanged in that case.
    pub async fn start(&self) -> ControlResponse {
        let mut state = self.state.write().await;

        if state.running {
            return ControlResponse::error("messaging service is already running");
        }

        state.running = true;
        state.stop = CancellationToken::new();

        tokio::spawn(run_driver(
            self.dispatcher.clone(),
            self.config.clone(),
            self.shutdown.clone(),
            state.stop.clone(),
        ));

        info!("messaging service started");

        ControlResponse::success("messaging service started successfully")
    }

    /// Stops the driver loop by closing the stop token.
    ///
    /// Returns a policy error response when not running.
    pub async fn stop(&self) -> ControlResponse {
        let mut state = self.state.write().await;

        if !state.running {
            return ControlResponse::error("messaging service is not running");
        }

        state.running = false;
        state.stop.cancel();

        info!("messaging service stopped");

        ControlResponse::success("messaging service stopped successfully")
    }

    /// Returns a status snapshot under the read lock.
    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.read().await;

        SchedulerStatus {
            status: "ok",
            timestamp: Utc::now(),
            enabled: state.running,
            interval: format_duration(self.config.interval),
            batch_size: self.config.batch_size,
            max_retries: self.config.max_retries,
            retry_delay: format_duration(self.config.retry_delay),
        }
    }

    /// Returns the live running flag under the read lock.
    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }
}

/// The driver loop: one tick per interval until either cancellation path
/// fires.
///
/// A slow batch delays the next tick rather than overlapping with it, and
/// a missed tick deadline is silently skipped.
async fn run_driver(
    dispatcher: Dispatcher,
    config: SchedulerConfig,
    shutdown: CancellationToken,
    stop: CancellationToken,
) {
    if !config.enabled {
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("message processing loop started");

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("message processing stopped due to shutdown");
                return;
            }
            () = stop.cancelled() => {
                info!("message processing stopped");
                return;
            }
            _ = ticker.tick() => {
                dispatcher.process_batch(&shutdown).await;
            }
        }
    }
}

/// Renders a duration in Go's compact style: `"30s"`, `"2m0s"`, `"1h5m0s"`.
/// Sub-second durations render as milliseconds.
fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return format!("{}ms", duration.as_millis());
    }

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m{seconds}s"),
        _ => format!("{hours}h{minutes}m{seconds}s"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use courier_core::Storage;
    use sqlx::PgPool;

    use super::*;
    use crate::client::{ClientConfig, WebhookClient};

    /// Scheduler over a lazy pool: control operations never touch the
    /// database, and the interval is long enough that no tick fires
    /// within a test run.
    fn test_scheduler(enabled: bool, shutdown: CancellationToken) -> Scheduler {
        let pool = PgPool::connect_lazy("postgresql://localhost/courier").unwrap();
        let storage = Storage::new(pool);
        let client = Arc::new(
            WebhookClient::new(ClientConfig {
                url: "http://localhost:9/webhook".to_string(),
                max_retries: 3,
                retry_delay: Duration::from_secs(30),
            })
            .unwrap(),
        );
        let dispatcher = Dispatcher::new(storage, client, 2);
        let config = SchedulerConfig {
            interval: Duration::from_secs(120),
            batch_size: 2,
            max_retries: 3,
            retry_delay: Duration::from_secs(30),
            enabled,
        };

        Scheduler::new(dispatcher, config, shutdown)
    }

    #[tokio::test]
    async fn start_stop_lifecycle() {
        let scheduler = test_scheduler(true, CancellationToken::new());

        let response = scheduler.start().await;
        assert_eq!(response.status, ControlStatus::Success);
        assert!(response.message.contains("started successfully"));
        assert!(scheduler.is_running().await);

        let response = scheduler.start().await;
        assert_eq!(response.status, ControlStatus::Error);
        assert!(response.message.contains("already running"));
        assert!(scheduler.is_running().await);

        let response = scheduler.stop().await;
        assert_eq!(response.status, ControlStatus::Success);
        assert!(response.message.contains("stopped successfully"));
        assert!(!scheduler.is_running().await);

        let response = scheduler.stop().await;
        assert_eq!(response.status, ControlStatus::Error);
        assert!(response.message.contains("not running"));
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn repeated_cycles_end_stopped() {
        let scheduler = test_scheduler(true, CancellationToken::new());

        for _ in 0..2 {
            assert_eq!(scheduler.start().await.status, ControlStatus::Success);
            assert_eq!(scheduler.stop().await.status, ControlStatus::Success);
        }

        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn status_snapshot_reflects_running_flag_and_config() {
        let scheduler = test_scheduler(true, CancellationToken::new());

        let status = scheduler.status().await;
        assert_eq!(status.status, "ok");
        assert!(!status.enabled);
        assert_eq!(status.interval, "2m0s");
        assert_eq!(status.batch_size, 2);
        assert_eq!(status.max_retries, 3);
        assert_eq!(status.retry_delay, "30s");

        scheduler.start().await;
        assert!(scheduler.status().await.enabled);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn start_succeeds_when_processing_disabled() {
        // Config-disabled processing: the driver loop exits immediately,
        // but the control surface still reports a running scheduler.
        let scheduler = test_scheduler(false, CancellationToken::new());

        assert_eq!(scheduler.start().await.status, ControlStatus::Success);
        assert!(scheduler.is_running().await);
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn shutdown_cancellation_leaves_running_flag_set() {
        let shutdown = CancellationToken::new();
        let scheduler = test_scheduler(true, shutdown.clone());

        scheduler.start().await;
        shutdown.cancel();

        // The surrounding context terminates the driver loop, not the
        // control state; only an explicit stop clears the flag.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn concurrent_is_running_reads_are_safe() {
        let scheduler = Arc::new(test_scheduler(true, CancellationToken::new()));

        let readers: Vec<_> = (0..10)
            .map(|_| {
                let scheduler = scheduler.clone();
                tokio::spawn(async move {
                    for _ in 0..100 {
                        let _ = scheduler.is_running().await;
                    }
                })
            })
            .collect();

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        scheduler.stop().await;

        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[test]
    fn duration_rendering_matches_compact_style() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3900)), "1h5m0s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
    }
}
