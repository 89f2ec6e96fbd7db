use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::RecorderConfig;

use super::measurement::Measurement;
use super::path::CallPath;
use super::service::{RecorderError, RecorderHandle, RecordingService, ReportError};
use super::tree::Snapshot;

/// Blocking facade over a [`RecordingService`] for synchronous call sites.
///
/// Owns a small multi-threaded runtime that hosts the recording worker, so
/// instrumented code never has to be async.
pub struct TimeRecorder {
    runtime: Runtime,
    service: RecordingService,
    handle: RecorderHandle,
    cancel: CancellationToken,
    stop_timeout: Duration,
}

impl TimeRecorder {
    /// Starts a runtime and a recording worker on it.
    pub fn start(cfg: &RecorderConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("time-recorder")
            .enable_all()
            .build()
            .context("building recorder runtime")?;

        let cancel = CancellationToken::new();
        let service = {
            let _guard = runtime.enter();
            RecordingService::spawn(cancel.clone())
        };
        let handle = service.handle();

        info!(stop_timeout = ?cfg.stop_timeout, "time recorder started");

        Ok(Self {
            runtime,
            service,
            handle,
            cancel,
            stop_timeout: cfg.stop_timeout,
        })
    }

    /// Producer handle for reporting from other threads.
    pub fn handle(&self) -> RecorderHandle {
        self.handle.clone()
    }

    /// Reports one elapsed time in nanoseconds for `stack`. Never blocks.
    pub fn report_time(&self, elapsed_ns: i64, stack: CallPath) -> Result<(), ReportError> {
        self.handle.report_nanos(elapsed_ns, stack)
    }

    /// Runs `f`, reporting its wall-clock duration under `path`.
    pub fn time<R>(&self, path: &CallPath, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        if let Err(e) = self.handle.report(start.elapsed(), path.clone()) {
            debug!(error = %e, path = %path, "timing report refused");
        }
        result
    }

    /// Flushes pending reports and returns the final tree, waiting at most
    /// the configured stop timeout.
    pub fn stop(self) -> Result<Snapshot<Measurement>, RecorderError> {
        let Self {
            runtime,
            service,
            cancel,
            stop_timeout,
            ..
        } = self;

        let result = runtime.block_on(service.stop(stop_timeout));

        // On timeout the worker may still be flushing; abandon it.
        cancel.cancel();
        runtime.shutdown_background();

        result
    }
}
