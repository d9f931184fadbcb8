//! Observability and Metrics
//!
//! Counters for buffer pooling and flush dispatch. Each
//! [`MessageDispatchPool`](crate::dispatch::MessageDispatchPool) owns one
//! [`Metrics`] instance; there is no process-wide collector.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Metrics collector for pooling and dispatch operations
#[derive(Debug)]
pub struct Metrics {
    /// Buffers constructed because the free list was empty
    pub buffers_allocated: AtomicU64,
    /// Buffers served from the free list
    pub buffers_recycled: AtomicU64,
    /// Buffers returned to the free list
    pub buffers_released: AtomicU64,
    /// Buffers dropped because the free list was at capacity
    pub buffers_dropped: AtomicU64,
    /// Messages handed to a transport successfully
    pub messages_flushed: AtomicU64,
    /// Wire bytes handed to a transport successfully
    pub bytes_flushed: AtomicU64,
    /// Transport write failures
    pub write_errors: AtomicU64,
    /// Messages discarded because framing could not be written
    pub framing_errors: AtomicU64,
    /// Pending messages discarded by unregistering their connection
    pub cancellations: AtomicU64,
    /// Completed flush cycles
    pub flush_cycles: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            buffers_allocated: AtomicU64::new(0),
            buffers_recycled: AtomicU64::new(0),
            buffers_released: AtomicU64::new(0),
            buffers_dropped: AtomicU64::new(0),
            messages_flushed: AtomicU64::new(0),
            bytes_flushed: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            framing_errors: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            flush_cycles: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn buffer_allocated(&self) {
        self.buffers_allocated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_recycled(&self) {
        self.buffers_recycled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_released(&self) {
        self.buffers_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffer_dropped(&self) {
        self.buffers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message written to a transport
    pub fn message_flushed(&self, byte_count: u64) {
        self.messages_flushed.fetch_add(1, Ordering::Relaxed);
        self.bytes_flushed.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cancellation(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flush_cycle(&self) {
        self.flush_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffers_allocated: self.buffers_allocated.load(Ordering::Relaxed),
            buffers_recycled: self.buffers_recycled.load(Ordering::Relaxed),
            buffers_released: self.buffers_released.load(Ordering::Relaxed),
            buffers_dropped: self.buffers_dropped.load(Ordering::Relaxed),
            messages_flushed: self.messages_flushed.load(Ordering::Relaxed),
            bytes_flushed: self.bytes_flushed.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            flush_cycles: self.flush_cycles.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            buffers_allocated = snapshot.buffers_allocated,
            buffers_recycled = snapshot.buffers_recycled,
            buffers_released = snapshot.buffers_released,
            buffers_dropped = snapshot.buffers_dropped,
            messages_flushed = snapshot.messages_flushed,
            bytes_flushed = snapshot.bytes_flushed,
            write_errors = snapshot.write_errors,
            framing_errors = snapshot.framing_errors,
            cancellations = snapshot.cancellations,
            flush_cycles = snapshot.flush_cycles,
            uptime_seconds = snapshot.uptime_seconds,
            "Dispatch metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffers_allocated: u64,
    pub buffers_recycled: u64,
    pub buffers_released: u64,
    pub buffers_dropped: u64,
    pub messages_flushed: u64,
    pub bytes_flushed: u64,
    pub write_errors: u64,
    pub framing_errors: u64,
    pub cancellations: u64,
    pub flush_cycles: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
