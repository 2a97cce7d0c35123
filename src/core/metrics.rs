//! Per-sink dispatch metrics
//!
//! Producers cannot tell a filtered record from a paused or closed sink.
//! These counters are the side channel that can.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how a sink classified the records it dequeued
///
/// # Example
///
/// ```
/// use rust_kvlog::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
/// metrics.record_written();
/// metrics.record_filtered();
///
/// assert_eq!(metrics.written(), 1);
/// assert_eq!(metrics.filtered(), 1);
/// assert_eq!(metrics.classified(), 2);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Records formatted and handed to the destination
    written: AtomicU64,

    /// Records rejected by a positive or negative filter
    filtered: AtomicU64,

    /// Records dropped because the sink was paused when they were dequeued
    skipped_paused: AtomicU64,

    /// Entries released without processing because the sink was closed
    skipped_closed: AtomicU64,

    /// Destination writes that returned an error
    write_errors: AtomicU64,

    /// Formatter or destination panics caught by the worker
    panics: AtomicU64,

    /// Flush markers processed
    flushes: AtomicU64,
}

impl SinkMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            written: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            skipped_paused: AtomicU64::new(0),
            skipped_closed: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped_paused(&self) -> u64 {
        self.skipped_paused.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn skipped_closed(&self) -> u64 {
        self.skipped_closed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn panics(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Records that reached a filter decision (written or filtered)
    pub fn classified(&self) -> u64 {
        self.written() + self.filtered()
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_skipped_paused(&self) -> u64 {
        self.skipped_paused.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_skipped_closed(&self) -> u64 {
        self.skipped_closed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_panic(&self) -> u64 {
        self.panics.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of classified records rejected by filters, as a percentage
    ///
    /// Returns 0.0 if nothing has been classified.
    pub fn filter_rate(&self) -> f64 {
        let filtered = self.filtered() as f64;
        let total = self.classified() as f64;
        if total == 0.0 {
            0.0
        } else {
            (filtered / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.written.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.skipped_paused.store(0, Ordering::Relaxed);
        self.skipped_closed.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
        self.panics.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SinkMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            written: AtomicU64::new(self.written()),
            filtered: AtomicU64::new(self.filtered()),
            skipped_paused: AtomicU64::new(self.skipped_paused()),
            skipped_closed: AtomicU64::new(self.skipped_closed()),
            write_errors: AtomicU64::new(self.write_errors()),
            panics: AtomicU64::new(self.panics()),
            flushes: AtomicU64::new(self.flushes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.written(), 0);
        assert_eq!(metrics.filtered(), 0);
        assert_eq!(metrics.skipped_paused(), 0);
        assert_eq!(metrics.skipped_closed(), 0);
        assert_eq!(metrics.write_errors(), 0);
        assert_eq!(metrics.panics(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.record_filtered(), 0);
        assert_eq!(metrics.record_filtered(), 1);
        assert_eq!(metrics.filtered(), 2);
    }

    #[test]
    fn test_filter_rate() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.filter_rate(), 0.0);

        for _ in 0..3 {
            metrics.record_written();
        }
        metrics.record_filtered();

        assert_eq!(metrics.filter_rate(), 25.0);
    }

    #[test]
    fn test_reset_and_snapshot() {
        let metrics = SinkMetrics::new();
        metrics.record_written();
        metrics.record_write_error();

        let snapshot = metrics.clone();
        metrics.reset();

        assert_eq!(metrics.written(), 0);
        assert_eq!(snapshot.written(), 1);
        assert_eq!(snapshot.write_errors(), 1);
    }
}
