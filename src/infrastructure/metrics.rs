//! Metrics collection for engine monitoring
//!
//! Lock-free counters using relaxed atomics. Written from the feed threads
//! and the stats engine, read by the summary logger and the API. Every
//! exported value is approximate.

use crate::core::{MarketUpdate, QueueGauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// Engine metrics collector
pub struct MetricsCollector {
    /// Ticks written into the store (consumer side)
    updates_processed: AtomicU64,
    /// Ticks accepted by the queue (producer side)
    ticks_published: AtomicU64,
    /// Ticks discarded under the drop policy
    ticks_dropped: AtomicU64,
    /// Producer retries against a full queue
    full_queue_spins: AtomicU64,
    /// Highest sampled queue depth
    max_queue_depth: AtomicU64,
    /// Store snapshots taken by stats engines
    snapshots_taken: AtomicU64,
    /// Snapshot attempts discarded because a write overlapped
    snapshot_retries: AtomicU64,
    /// Completed signal computation cycles
    signal_cycles: AtomicU64,
    /// Depth probe of the feed queue, once a feed is attached
    queue: OnceLock<QueueGauge<MarketUpdate>>,
    start_time: Instant,
}

/// Metrics snapshot for export
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub updates_processed: u64,
    pub ticks_published: u64,
    pub ticks_dropped: u64,
    pub full_queue_spins: u64,
    pub max_queue_depth: u64,
    pub queue_depth: u64,
    pub queue_capacity: u64,
    pub snapshots_taken: u64,
    pub snapshot_retries: u64,
    pub signal_cycles: u64,
    pub update_rate: f64, // updates per second
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            updates_processed: AtomicU64::new(0),
            ticks_published: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
            full_queue_spins: AtomicU64::new(0),
            max_queue_depth: AtomicU64::new(0),
            snapshots_taken: AtomicU64::new(0),
            snapshot_retries: AtomicU64::new(0),
            signal_cycles: AtomicU64::new(0),
            queue: OnceLock::new(),
            start_time: Instant::now(),
        }
    }

    /// Attach the feed queue for depth reporting
    ///
    /// Only the first attached queue is kept.
    pub fn attach_queue(&self, gauge: QueueGauge<MarketUpdate>) {
        if self.queue.set(gauge).is_err() {
            tracing::warn!("Metrics already attached to a feed queue");
        }
    }

    #[inline(always)]
    pub fn record_update(&self) {
        self.updates_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_published(&self) {
        self.ticks_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_full_spin(&self) {
        self.full_queue_spins.fetch_add(1, Ordering::Relaxed);
    }

    /// Raise the max-depth gauge to `depth` if higher
    #[inline]
    pub fn observe_queue_depth(&self, depth: usize) {
        self.max_queue_depth.fetch_max(depth as u64, Ordering::Relaxed);
    }

    /// Record one snapshot and the retries it needed
    #[inline]
    pub fn record_snapshot(&self, retries: u64) {
        self.snapshots_taken.fetch_add(1, Ordering::Relaxed);
        if retries > 0 {
            self.snapshot_retries.fetch_add(retries, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_signal_cycle(&self) {
        self.signal_cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn updates_processed(&self) -> u64 {
        self.updates_processed.load(Ordering::Relaxed)
    }

    /// Current snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let updates = self.updates_processed.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();
        let rate = if elapsed.as_secs_f64() > 0.0 {
            updates as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let (queue_depth, queue_capacity) = self
            .queue
            .get()
            .map(|g| (g.depth() as u64, g.capacity() as u64))
            .unwrap_or_default();

        MetricsSnapshot {
            updates_processed: updates,
            ticks_published: self.ticks_published.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            full_queue_spins: self.full_queue_spins.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
            queue_depth,
            queue_capacity,
            snapshots_taken: self.snapshots_taken.load(Ordering::Relaxed),
            snapshot_retries: self.snapshot_retries.load(Ordering::Relaxed),
            signal_cycles: self.signal_cycles.load(Ordering::Relaxed),
            update_rate: rate,
            uptime_seconds: elapsed.as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RingBuffer;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        let snapshot = collector.snapshot();

        assert_eq!(snapshot.updates_processed, 0);
        assert_eq!(snapshot.ticks_published, 0);
        assert_eq!(snapshot.queue_capacity, 0);
        assert_eq!(snapshot.signal_cycles, 0);
    }

    #[test]
    fn test_record_counters() {
        let collector = MetricsCollector::new();

        collector.record_published();
        collector.record_published();
        collector.record_update();
        collector.record_dropped();
        collector.record_full_spin();
        collector.record_signal_cycle();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.ticks_published, 2);
        assert_eq!(snapshot.updates_processed, 1);
        assert_eq!(snapshot.ticks_dropped, 1);
        assert_eq!(snapshot.full_queue_spins, 1);
        assert_eq!(snapshot.signal_cycles, 1);
    }

    #[test]
    fn test_snapshot_retries_accumulate() {
        let collector = MetricsCollector::new();
        collector.record_snapshot(0);
        collector.record_snapshot(3);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.snapshots_taken, 2);
        assert_eq!(snapshot.snapshot_retries, 3);
    }

    #[test]
    fn test_max_queue_depth_only_rises() {
        let collector = MetricsCollector::new();
        collector.observe_queue_depth(10);
        collector.observe_queue_depth(4);
        assert_eq!(collector.snapshot().max_queue_depth, 10);
    }

    #[test]
    fn test_attached_queue_reports_depth() {
        let (mut tx, _rx) = RingBuffer::<MarketUpdate>::with_capacity(8).unwrap();
        let collector = MetricsCollector::new();
        collector.attach_queue(tx.gauge());

        tx.push(MarketUpdate::default());
        tx.push(MarketUpdate::default());

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.queue_depth, 2);
        assert_eq!(snapshot.queue_capacity, 8);
    }
}
