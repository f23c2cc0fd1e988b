//! Capture metrics
//!
//! Lock-free counters written by the producer thread and the queue, read by
//! anyone through [`CaptureMetrics::snapshot`]. Counters only ever grow;
//! a fresh session starts a fresh set.
//!
//! Counter relationships:
//!
//! - `packets_captured = packets_filtered + packets_enqueued` once a frame
//!   has been fully processed
//! - `packets_enqueued = resident + packets_dequeued + packets_dropped + packets_rejected`

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Thread-safe metrics accumulator for one capture session
#[derive(Debug)]
pub struct CaptureMetrics {
    captured: AtomicU64,
    filtered: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    dequeued: AtomicU64,
    bytes: AtomicU64,
    high_water: AtomicU64,
    started: Instant,
}

impl CaptureMetrics {
    /// Create a zeroed accumulator
    pub fn new() -> Self {
        Self {
            captured: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            high_water: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// A frame was pulled from the capture source
    pub fn record_captured(&self, bytes: usize) {
        self.captured.fetch_add(1, Ordering::Release);
        self.bytes.fetch_add(bytes as u64, Ordering::Release);
    }

    /// A frame was rejected by the filter chain
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Release);
    }

    /// A frame was handed to the queue
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Release);
    }

    /// A packet was discarded by a drop decision
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Release);
    }

    /// A packet was refused under reject-and-signal
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Release);
    }

    /// A packet was handed to a consumer
    pub fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Release);
    }

    /// Queue occupancy observed after an enqueue
    pub fn observe_occupancy(&self, occupancy: usize) {
        self.high_water.fetch_max(occupancy as u64, Ordering::Relaxed);
    }

    /// Take a consistent point-in-time view.
    ///
    /// Downstream counters are read before upstream ones, so every snapshot
    /// satisfies `captured >= filtered + enqueued` and
    /// `enqueued >= dequeued + dropped + rejected` even while capture runs.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let packets_dequeued = self.dequeued.load(Ordering::Acquire);
        let packets_dropped = self.dropped.load(Ordering::Acquire);
        let packets_rejected = self.rejected.load(Ordering::Acquire);
        let packets_enqueued = self.enqueued.load(Ordering::Acquire);
        let packets_filtered = self.filtered.load(Ordering::Acquire);
        let packets_captured = self.captured.load(Ordering::Acquire);
        let bytes_captured = self.bytes.load(Ordering::Acquire);

        MetricsSnapshot {
            packets_captured,
            packets_filtered,
            packets_enqueued,
            packets_dropped,
            packets_rejected,
            packets_dequeued,
            bytes_captured,
            high_water_mark: self.high_water.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for CaptureMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a session's counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Frames pulled from the capture source
    pub packets_captured: u64,
    /// Frames rejected by the filter chain
    pub packets_filtered: u64,
    /// Frames handed to the queue
    pub packets_enqueued: u64,
    /// Packets discarded by the drop strategy
    pub packets_dropped: u64,
    /// Packets refused under reject-and-signal
    pub packets_rejected: u64,
    /// Packets handed to consumers
    pub packets_dequeued: u64,
    /// Total captured bytes
    pub bytes_captured: u64,
    /// Highest queue occupancy seen
    pub high_water_mark: u64,
    /// Seconds since the counters were created
    pub elapsed_secs: f64,
}

impl MetricsSnapshot {
    /// Packets that were enqueued and have not left the queue yet
    pub fn in_flight(&self) -> u64 {
        self.packets_enqueued
            .saturating_sub(self.packets_dequeued + self.packets_dropped + self.packets_rejected)
    }

    /// Dropped packets as a percentage of enqueued ones
    pub fn drop_rate(&self) -> f64 {
        if self.packets_enqueued == 0 {
            return 0.0;
        }
        (self.packets_dropped as f64 / self.packets_enqueued as f64) * 100.0
    }

    /// Captured packets per second
    pub fn packets_per_second(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.packets_captured as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "captured={} ({} bytes) filtered={} enqueued={} dropped={} ({:.2}%) \
             rejected={} dequeued={} in_flight={} high_water={}",
            self.packets_captured,
            self.bytes_captured,
            self.packets_filtered,
            self.packets_enqueued,
            self.packets_dropped,
            self.drop_rate(),
            self.packets_rejected,
            self.packets_dequeued,
            self.in_flight(),
            self.high_water_mark
        )
    }
}
