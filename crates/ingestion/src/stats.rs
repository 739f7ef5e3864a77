//! Per-queue counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters owned by one `FrameQueue`, shared with its producer callback
#[derive(Debug, Default)]
pub struct QueueMetrics {
    /// Records pushed by the producer
    pub records_received: AtomicU64,

    /// Records the producer could not enqueue (queue already closed)
    pub records_rejected: AtomicU64,

    /// Successful pops
    pub records_popped: AtomicU64,

    /// Pops that hit the deadline
    pub timeouts: AtomicU64,

    /// Queue length observed at the last push/pop
    pub queue_len: AtomicUsize,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self, queue_len: usize) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
        self.queue_len.store(queue_len, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_popped(&self, queue_len: usize) {
        self.records_popped.fetch_add(1, Ordering::Relaxed);
        self.queue_len.store(queue_len, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
            records_popped: self.records_popped.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueMetricsSnapshot {
    pub records_received: u64,
    pub records_rejected: u64,
    pub records_popped: u64,
    pub timeouts: u64,
    pub queue_len: usize,
}
