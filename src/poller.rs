//! poller.rs — interval telemetry fetch with immutable snapshot swap.
//! Each dashboard consumer owns its own poller and cadence; a fetch either
//! publishes a fresh snapshot or leaves the previous one in place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::gateway::{Gateway, LogEntry};
use crate::logging::{client_info, client_warn};

// ── Snapshot ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// At least one fetch has succeeded; entries are the latest known list.
    Live,
    /// No fetch has succeeded yet; derived views use their fixed defaults.
    Unavailable,
}

/// One immutable, point-in-time copy of the log list. A poll always swaps
/// in a fresh value; consumers never observe an in-place mutation.
#[derive(Debug, Clone)]
pub struct LogSnapshot {
    entries: Arc<Vec<LogEntry>>,
    status: SnapshotStatus,
}

impl LogSnapshot {
    pub fn unavailable() -> Self {
        LogSnapshot {
            entries: Arc::new(Vec::new()),
            status: SnapshotStatus::Unavailable,
        }
    }

    pub fn live(entries: Vec<LogEntry>) -> Self {
        LogSnapshot {
            entries: Arc::new(entries),
            status: SnapshotStatus::Live,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn status(&self) -> SnapshotStatus {
        self.status
    }

    pub fn is_unavailable(&self) -> bool {
        self.status == SnapshotStatus::Unavailable
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Poller ───────────────────────────────────────────

/// Owns one polling task. Cancellation is guaranteed on teardown: explicit
/// `cancel()`, or Drop when the owning view goes away.
pub struct TelemetryPoller {
    cancel: CancellationToken,
    rx: watch::Receiver<LogSnapshot>,
}

impl TelemetryPoller {
    /// Start polling `/logs` at the given cadence. The first fetch fires
    /// immediately, matching a dashboard that loads on mount.
    pub fn spawn<G: Gateway + 'static>(gateway: Arc<G>, every: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(LogSnapshot::unavailable());

        let token = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match gateway.logs().await {
                            Ok(entries) => {
                                tx.send_replace(LogSnapshot::live(entries));
                            }
                            Err(e) => {
                                client_warn(format!(
                                    "Log poll failed, keeping previous snapshot: {e}"
                                ));
                            }
                        }
                    }
                }
            }
            client_info("Telemetry poller stopped");
        });

        TelemetryPoller { cancel, rx }
    }

    /// The latest snapshot. Cheap clone of an Arc-backed value; reads and
    /// the swap to a newer snapshot never interleave.
    pub fn snapshot(&self) -> LogSnapshot {
        self.rx.borrow().clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
