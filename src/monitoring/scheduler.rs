//! Recurring monitoring scheduler
//!
//! Owns the single background task that drives full monitoring runs at a
//! fixed wall-clock interval. The loop polls at a short grain and compares a
//! monotonic clock against the interval, so a slow run delays the next tick
//! instead of queueing overlapping runs, and `stop()` takes effect promptly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::monitor::{CycleMonitor, OverallCheckResult};

const POLL_GRAIN: Duration = Duration::from_secs(60);
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Introspectable scheduler state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerState {
    pub is_running: bool,
    pub interval_secs: u64,
    pub last_run_at: Option<String>,
    pub next_run_at: Option<String>,
}

struct Inner {
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
    last_run_at: Option<NaiveDateTime>,
}

/// Drives periodic monitoring runs on a dedicated tokio task.
pub struct MonitoringScheduler {
    monitor: Arc<CycleMonitor>,
    interval: Duration,
    poll_grain: Duration,
    inner: Mutex<Inner>,
}

impl MonitoringScheduler {
    pub fn new(monitor: Arc<CycleMonitor>, interval_secs: u64) -> Self {
        Self {
            monitor,
            interval: Duration::from_secs(interval_secs.max(1)),
            poll_grain: POLL_GRAIN,
            inner: Mutex::new(Inner {
                running: false,
                stop_tx: None,
                handle: None,
                last_run_at: None,
            }),
        }
    }

    /// Override the loop's poll grain (mainly for tests).
    pub fn with_poll_grain(mut self, poll_grain: Duration) -> Self {
        self.poll_grain = poll_grain.max(Duration::from_millis(1));
        self
    }

    /// Start the scheduler: one immediate run, then the background loop.
    ///
    /// A no-op with a warning when already running.
    pub async fn start(self: &Arc<Self>) {
        // The stop signal must exist before the first await so a concurrent
        // stop() always has something to fire.
        let stop_rx = {
            let mut inner = self.inner.lock();
            if inner.running {
                warn!("Monitoring scheduler is already running");
                return;
            }
            inner.running = true;
            let (stop_tx, stop_rx) = watch::channel(false);
            inner.stop_tx = Some(stop_tx);
            stop_rx
        };

        // Immediate run so failures surface now, not after the first interval
        info!("Running initial snapshot freshness check...");
        self.run_once().await;

        {
            let mut inner = self.inner.lock();
            if !inner.running || *stop_rx.borrow() {
                // stop() landed during the initial run; never spawn the loop
                info!("Monitoring scheduler stopped during the initial check");
                return;
            }
            inner.handle = Some(tokio::spawn(Self::run_loop(Arc::clone(self), stop_rx)));
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Monitoring scheduler started"
        );
    }

    /// Signal the loop to exit and join it with a bounded timeout.
    ///
    /// Safe to call when not running. An in-flight run is allowed to finish.
    pub async fn stop(&self) {
        let (stop_tx, handle) = {
            let mut inner = self.inner.lock();
            if !inner.running {
                debug!("Monitoring scheduler stop requested while not running");
                return;
            }
            inner.running = false;
            (inner.stop_tx.take(), inner.handle.take())
        };

        if let Some(tx) = stop_tx {
            let _ = tx.send(true);
        }
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("Monitoring scheduler loop did not exit within timeout");
            }
        }

        info!("Monitoring scheduler stopped");
    }

    /// Current state, without side effects.
    pub fn status(&self) -> SchedulerState {
        let inner = self.inner.lock();
        let next_run_at = if inner.running {
            inner
                .last_run_at
                .map(|t| t + ChronoDuration::seconds(self.interval.as_secs() as i64))
        } else {
            None
        };
        SchedulerState {
            is_running: inner.running,
            interval_secs: self.interval.as_secs(),
            last_run_at: inner.last_run_at.map(format_ts),
            next_run_at: next_run_at.map(format_ts),
        }
    }

    /// On-demand full check, independent of the timer.
    pub async fn run_check_now(&self) -> OverallCheckResult {
        self.monitor.run_all().await
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        // The initial run already happened in start()
        let mut last_run = Instant::now();

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_grain) => {}
            }
            if *stop_rx.borrow() {
                break;
            }

            // Monotonic comparison: a long run pushes the next one out
            // instead of letting runs queue up.
            if last_run.elapsed() >= self.interval {
                self.run_once().await;
                last_run = Instant::now();
            }
        }

        debug!("Monitoring scheduler loop exited");
    }

    /// One full run. Faults never escape: the monitor reports them in its
    /// result, and the loop must survive every iteration.
    async fn run_once(&self) {
        let result = self.monitor.run_all().await;
        info!(
            status = ?result.overall_status,
            "Monitoring check completed: {}",
            result.message
        );
        self.inner.lock().last_run_at = Some(Local::now().naive_local());
    }
}

fn format_ts(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
