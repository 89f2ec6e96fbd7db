use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::measurement::Measurement;
use super::path::CallPath;
use super::stats::{ReportOutcome, ReportStats, ReportStatsSnapshot};
use super::tree::{MergeableTree, Snapshot};

/// Reasons a report is refused at the producer boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("elapsed time must be non-negative, got {0} ns")]
    NegativeElapsed(i64),

    #[error("call path must not be empty")]
    EmptyPath,

    #[error("recording service has stopped")]
    Stopped,
}

/// Failures of the recording service itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// The worker did not acknowledge `stop` in time. It may still be flushing.
    #[error("recording service did not respond within {0:?}")]
    Timeout(Duration),

    #[error("recording service worker exited before producing a snapshot")]
    WorkerGone,
}

enum Message {
    Report {
        elapsed_ns: f64,
        path: CallPath,
    },
    /// Barrier: everything enqueued before it is applied, then the worker
    /// replies with a snapshot and exits.
    Stop {
        reply: oneshot::Sender<Snapshot<Measurement>>,
    },
    #[cfg(test)]
    Stall(Duration),
}

/// Producer side of the recording service. Cheap to clone and safe to use
/// from any thread, inside or outside a tokio runtime.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::UnboundedSender<Message>,
    stats: Arc<ReportStats>,
}

impl RecorderHandle {
    /// Enqueues one elapsed-time sample for `path` without waiting for it to
    /// be applied. Reports from one producer are applied in order.
    pub fn report(&self, elapsed: Duration, path: CallPath) -> Result<(), ReportError> {
        self.enqueue(elapsed.as_nanos() as f64, path)
    }

    /// Like [`RecorderHandle::report`] for raw nanosecond readings, which may
    /// be negative when taken from a misbehaving clock.
    pub fn report_nanos(&self, elapsed_ns: i64, path: CallPath) -> Result<(), ReportError> {
        if elapsed_ns < 0 {
            self.stats.record(ReportOutcome::Rejected);
            return Err(ReportError::NegativeElapsed(elapsed_ns));
        }
        self.enqueue(elapsed_ns as f64, path)
    }

    /// Current report counters.
    pub fn stats(&self) -> ReportStatsSnapshot {
        self.stats.snapshot()
    }

    fn enqueue(&self, elapsed_ns: f64, path: CallPath) -> Result<(), ReportError> {
        if path.is_empty() {
            self.stats.record(ReportOutcome::Rejected);
            return Err(ReportError::EmptyPath);
        }

        if self.tx.send(Message::Report { elapsed_ns, path }).is_err() {
            self.stats.record(ReportOutcome::Dropped);
            return Err(ReportError::Stopped);
        }

        self.stats.record(ReportOutcome::Accepted);
        Ok(())
    }
}

/// Single sequential owner of a live [`MergeableTree`].
///
/// All mutations go through one unbounded queue drained by one tokio task,
/// so the tree is never touched by two threads at once. Reports racing with
/// a `stop` that has already been enqueued are dropped and counted.
pub struct RecordingService {
    handle: RecorderHandle,
    worker: JoinHandle<()>,
}

impl RecordingService {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// Cancelling `cancel` terminates the worker without a snapshot.
    pub fn spawn(cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stats = Arc::new(ReportStats::new());
        let worker_stats = Arc::clone(&stats);

        let worker = tokio::spawn(async move {
            let mut tree = MergeableTree::new();

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("recording worker cancelled, discarding live tree");
                        break;
                    }
                    msg = rx.recv() => {
                        let Some(msg) = msg else {
                            debug!("all recorder handles dropped");
                            break;
                        };
                        if apply(&mut tree, msg, &worker_stats).await.is_break() {
                            break;
                        }
                    }
                }
            }

            // Anything still queued arrived after the barrier.
            rx.close();
            let mut dropped = 0u64;
            while let Ok(msg) = rx.try_recv() {
                if let Message::Report { .. } = msg {
                    worker_stats.record(ReportOutcome::Dropped);
                    dropped += 1;
                }
            }
            if dropped > 0 {
                warn!(dropped, "reports arrived after stop and were dropped");
            }
        });

        info!("recording service started");

        Self {
            handle: RecorderHandle { tx, stats },
            worker,
        }
    }

    /// Returns a new producer handle.
    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    /// Current report counters.
    pub fn stats(&self) -> ReportStatsSnapshot {
        self.handle.stats()
    }

    /// Flushes every report enqueued so far, snapshots the tree and shuts the
    /// worker down. Fails with [`RecorderError::Timeout`] if the worker does
    /// not answer within `timeout`.
    pub async fn stop(self, timeout: Duration) -> Result<Snapshot<Measurement>, RecorderError> {
        info!("stopping recording service");

        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .handle
            .tx
            .send(Message::Stop { reply: reply_tx })
            .is_err()
        {
            return Err(RecorderError::WorkerGone);
        }

        let snapshot = match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(_)) => return Err(RecorderError::WorkerGone),
            Err(_) => {
                warn!(?timeout, "recording service did not acknowledge stop");
                return Err(RecorderError::Timeout(timeout));
            }
        };

        if let Err(e) = self.worker.await {
            warn!(error = %e, "recording worker join failed");
        }

        let stats = self.handle.stats();
        info!(
            applied = stats.applied,
            rejected = stats.rejected,
            dropped = stats.dropped,
            nodes = snapshot.node_count(),
            "recording service stopped",
        );

        Ok(snapshot)
    }

    /// Makes the worker sleep before handling the next message.
    #[cfg(test)]
    fn stall(&self, duration: Duration) {
        let _ = self.handle.tx.send(Message::Stall(duration));
    }
}

async fn apply(
    tree: &mut MergeableTree<Measurement>,
    msg: Message,
    stats: &ReportStats,
) -> ControlFlow<()> {
    match msg {
        Message::Report { elapsed_ns, path } => {
            tree.record_elapsed(&path, elapsed_ns);
            stats.record(ReportOutcome::Applied);
            ControlFlow::Continue(())
        }
        Message::Stop { reply } => {
            let snapshot = tree.snapshot();
            debug!("final aggregation tree:\n{snapshot}");
            if reply.send(snapshot).is_err() {
                warn!("stop requester went away before the snapshot was delivered");
            }
            ControlFlow::Break(())
        }
        #[cfg(test)]
        Message::Stall(duration) => {
            tokio::time::sleep(duration).await;
            ControlFlow::Continue(())
        }
    }
}
