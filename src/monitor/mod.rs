//! Background profile monitor.
//!
//! The monitor owns the watermark and the single background worker. The
//! worker polls the interaction log, and for each newly observed record
//! drives exactly one update attempt. The watermark lives only in the
//! worker's memory: every process start looks at the single latest record
//! regardless of age, which is the intended at-most-once behavior, not an
//! exactly-once log consumer.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped
//! ```
//!
//! `start` is idempotent while running; `stop` is reentrant and also runs
//! best-effort on drop. Stop uses a channel-disconnect pattern: the worker
//! sleeps in short slices on the stop channel, so a stop request interrupts
//! the sleep rather than waiting out the poll interval.

use crate::config::MonitorConfig;
use crate::logstore::InteractionLog;
use crate::updater::ProfileUpdater;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Handle to the background profile monitor.
///
/// One instance per process, owned by the fragment surface; there is no
/// global state.
pub struct ProfileMonitor {
    /// Interaction log reader.
    log: Arc<InteractionLog>,
    /// Profile updater.
    updater: Arc<ProfileUpdater>,
    /// Polling policy.
    config: MonitorConfig,
    /// Live worker, when running.
    worker: Mutex<Option<Worker>>,
}

/// Channels and thread handle for a live worker.
struct Worker {
    /// Dropping this disconnects the stop channel, which the worker treats
    /// as a stop request.
    stop_tx: mpsc::Sender<()>,
    /// Signalled by the worker just before it exits.
    done_rx: mpsc::Receiver<()>,
    /// The worker thread.
    handle: std::thread::JoinHandle<()>,
}

impl ProfileMonitor {
    /// Creates a monitor over the given collaborators. Does not start it.
    #[must_use]
    pub fn new(
        log: Arc<InteractionLog>,
        updater: Arc<ProfileUpdater>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            log,
            updater,
            config,
            worker: Mutex::new(None),
        }
    }

    /// Builds the full production wiring (host tool, log reader, updater)
    /// from configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::PromemConfig) -> Self {
        let host = crate::host::HostTool::from_config(&config.host);
        let store = crate::profile::ProfileStore::from_config(config);
        let invoker = Arc::new(crate::llm::HostToolInvoker::new(host.clone()));
        let log = Arc::new(InteractionLog::new(host));
        let updater = Arc::new(ProfileUpdater::new(store, invoker));
        Self::new(log, updater, config.monitor.clone())
    }

    /// Starts the background worker. No-op when already running.
    pub fn start(&self) {
        let mut worker = lock_worker(&self.worker);
        if worker.is_some() {
            tracing::debug!("profile monitor already running");
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let log = Arc::clone(&self.log);
        let updater = Arc::clone(&self.updater);
        let poll_interval = self.config.poll_interval;
        let check_interval = self.config.stop_check_interval;

        let spawned = std::thread::Builder::new()
            .name("promem-monitor".to_string())
            .spawn(move || {
                run_worker(&log, &updater, &stop_rx, poll_interval, check_interval);
                // The receiver may already be gone if stop() timed out.
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                *worker = Some(Worker {
                    stop_tx,
                    done_rx,
                    handle,
                });
                tracing::info!(
                    poll_interval_ms = poll_interval.as_millis() as u64,
                    "profile monitor started"
                );
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to spawn profile monitor worker");
            },
        }
    }

    /// Signals the worker to stop and waits a bounded interval for it to
    /// acknowledge. Transitions to stopped regardless; calling `stop` when
    /// already stopped is a no-op.
    pub fn stop(&self) {
        let Some(worker) = lock_worker(&self.worker).take() else {
            return;
        };

        drop(worker.stop_tx);
        match worker.done_rx.recv_timeout(self.config.stop_join_timeout) {
            Ok(()) => {
                let _ = worker.handle.join();
                tracing::debug!("profile monitor stopped");
            },
            Err(_) => {
                // The worker is mid-iteration (likely a model call); it will
                // observe the disconnect at its next check and exit on its own.
                tracing::debug!("profile monitor worker did not acknowledge stop in time");
            },
        }
    }

    /// Whether a worker is currently live.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock_worker(&self.worker).is_some()
    }
}

impl Drop for ProfileMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Acquires the worker slot, recovering from poisoning.
fn lock_worker(worker: &Mutex<Option<Worker>>) -> std::sync::MutexGuard<'_, Option<Worker>> {
    match worker.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("monitor mutex was poisoned, recovering");
            poisoned.into_inner()
        },
    }
}

/// Worker loop: poll, then sleep in stop-aware slices.
fn run_worker(
    log: &InteractionLog,
    updater: &ProfileUpdater,
    stop_rx: &mpsc::Receiver<()>,
    poll_interval: Duration,
    check_interval: Duration,
) {
    tracing::debug!("profile monitor worker running");
    let mut watermark: Option<String> = None;

    loop {
        poll_once(log, updater, &mut watermark);
        if sleep_until_stop(stop_rx, poll_interval, check_interval) {
            break;
        }
    }

    tracing::debug!("profile monitor worker exiting");
}

/// Runs one poll iteration.
///
/// The watermark is advanced as soon as a record is observed, before the
/// update attempt: a failing update drops that interaction permanently
/// instead of retrying against a possibly misbehaving backend. Liveness of
/// the monitor outranks completeness of the profile.
///
/// Every failure is logged and discarded; this function must never panic
/// the worker.
pub(crate) fn poll_once(
    log: &InteractionLog,
    updater: &ProfileUpdater,
    watermark: &mut Option<String>,
) {
    let record = match log.latest_since(watermark.as_deref()) {
        Ok(Some(record)) => record,
        Ok(None) => return,
        Err(e) => {
            tracing::debug!(error = %e, "interaction log unavailable");
            return;
        },
    };

    tracing::debug!(
        id = record.id,
        timestamp = %record.timestamp,
        "new interaction observed"
    );
    *watermark = Some(record.timestamp.clone());

    if record.is_blank() {
        return;
    }

    match updater.apply(&record) {
        Ok(outcome) => {
            tracing::debug!(outcome = ?outcome, id = record.id, "update attempt finished");
        },
        Err(e) => {
            tracing::debug!(error = %e, id = record.id, "profile update failed");
        },
    }
}

/// Sleeps for `total`, checking the stop channel every `slice`.
///
/// Returns true when a stop was requested (explicitly or by the handle
/// being dropped).
fn sleep_until_stop(stop_rx: &mpsc::Receiver<()>, total: Duration, slice: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let wait = slice.min(deadline - now);
        match stop_rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => {},
        }
    }
}
