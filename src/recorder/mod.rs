//! Call-site timing aggregation.
//!
//! Producers report `(elapsed, call path)` samples through a
//! [`RecorderHandle`]; a single [`RecordingService`] worker owns the live
//! [`MergeableTree`] and hands out a [`Snapshot`] when stopped.

pub mod client;
pub mod measurement;
pub mod path;
pub mod service;
pub mod stats;
pub mod tree;

pub use self::client::TimeRecorder;
pub use self::measurement::{Measurement, Mergeable};
pub use self::path::{CallPath, Frame};
pub use self::service::{RecorderError, RecorderHandle, RecordingService, ReportError};
pub use self::stats::{ReportOutcome, ReportStats, ReportStatsSnapshot};
pub use self::tree::{MergeableTree, Snapshot};
