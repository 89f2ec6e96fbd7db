use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of a single report, used to index [`ReportStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ReportOutcome {
    /// Enqueued for the worker.
    Accepted = 0,
    /// Rejected at the boundary (negative elapsed time, empty path).
    Rejected = 1,
    /// Valid, but the worker was already gone.
    Dropped = 2,
    /// Applied to the live tree by the worker.
    Applied = 3,
}

impl ReportOutcome {
    const COUNT: usize = 4;

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Dropped => "dropped",
            Self::Applied => "applied",
        }
    }
}

/// Lock-free per-outcome report counters, shared between producers and
/// the recording worker.
pub struct ReportStats {
    counts: [AtomicU64; ReportOutcome::COUNT],
}

impl ReportStats {
    pub fn new() -> Self {
        Self {
            counts: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Increment the counter for the given outcome by one.
    pub fn record(&self, outcome: ReportOutcome) {
        self.counts[outcome as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value of one counter.
    pub fn get(&self, outcome: ReportOutcome) -> u64 {
        self.counts[outcome as usize].load(Ordering::Relaxed)
    }

    /// Point-in-time read of all counters. Counters are not reset.
    pub fn snapshot(&self) -> ReportStatsSnapshot {
        ReportStatsSnapshot {
            accepted: self.get(ReportOutcome::Accepted),
            rejected: self.get(ReportOutcome::Rejected),
            dropped: self.get(ReportOutcome::Dropped),
            applied: self.get(ReportOutcome::Applied),
        }
    }
}

impl Default for ReportStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of [`ReportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportStatsSnapshot {
    pub accepted: u64,
    pub rejected: u64,
    pub dropped: u64,
    pub applied: u64,
}
