use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe commit counters, updated with relaxed atomics on the two
/// commit paths plus the `try_write` reject path.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    records_committed: AtomicU64,
    bytes_committed: AtomicU64,
    records_consumed: AtomicU64,
    bytes_consumed: AtomicU64,
    writes_rejected: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_committed(&self, bytes: u64) {
        self.records_committed.fetch_add(1, Ordering::Relaxed);
        self.bytes_committed.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_consumed(&self, bytes: u64) {
        self.records_consumed.fetch_add(1, Ordering::Relaxed);
        self.bytes_consumed.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_write_rejected(&self) {
        self.writes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_committed: self.records_committed.load(Ordering::Relaxed),
            bytes_committed: self.bytes_committed.load(Ordering::Relaxed),
            records_consumed: self.records_consumed.load(Ordering::Relaxed),
            bytes_consumed: self.bytes_consumed.load(Ordering::Relaxed),
            writes_rejected: self.writes_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a buffer's metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records published by write commits.
    pub records_committed: u64,
    /// Total bytes (headers included) published by write commits.
    pub bytes_committed: u64,
    /// Records reclaimed by read commits.
    pub records_consumed: u64,
    /// Total bytes (headers included) reclaimed by read commits.
    pub bytes_consumed: u64,
    /// `try_write` attempts rejected for lack of room.
    pub writes_rejected: u64,
}
