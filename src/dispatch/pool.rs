use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, instrument, trace};

use crate::config::{DispatchConfig, PoolConfig, SchedulerConfig};
use crate::core::message::OutgoingMessage;
use crate::dispatch::scheduler::FlushScheduler;
use crate::error::{DispatchError, Result};
use crate::transport::connection::{Connection, ConnectionHandle};
use crate::transport::ConnectionId;
use crate::utils::metrics::{Metrics, Timer};

/// Outcome of one flush pass
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Connections taken from the pending set
    pub visited: usize,
    /// Messages successfully handed to a transport
    pub flushed: usize,
    /// Connections with nothing to send (cancelled or empty)
    pub skipped: usize,
    /// Wire bytes handed to transports
    pub bytes: u64,
    /// Per-connection failures; the rest of the cycle still ran
    pub failures: Vec<(ConnectionId, DispatchError)>,
}

impl FlushReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry of reusable message buffers and connections with buffered output.
///
/// Constructed explicitly and shared by `Arc`; every component that needs to
/// send gets a handle to the same instance.
pub struct MessageDispatchPool {
    free_list: Mutex<Vec<OutgoingMessage>>,
    pending: Mutex<BTreeMap<ConnectionId, ConnectionHandle>>,
    free_list_capacity: usize,
    flush_on_shutdown: bool,
    scheduler_armed: AtomicBool,
    metrics: Metrics,
}

impl MessageDispatchPool {
    pub fn new(config: PoolConfig) -> Self {
        Self::build(&config, &SchedulerConfig::default())
    }

    pub fn with_config(config: &DispatchConfig) -> Self {
        Self::build(&config.pool, &config.scheduler)
    }

    fn build(pool: &PoolConfig, scheduler: &SchedulerConfig) -> Self {
        let preallocate = pool.preallocate.min(pool.free_list_capacity);
        let free_list: Vec<OutgoingMessage> =
            (0..preallocate).map(|_| OutgoingMessage::new()).collect();

        let metrics = Metrics::new();
        for _ in 0..preallocate {
            metrics.buffer_allocated();
        }

        Self {
            free_list: Mutex::new(free_list),
            pending: Mutex::new(BTreeMap::new()),
            free_list_capacity: pool.free_list_capacity,
            flush_on_shutdown: scheduler.flush_on_shutdown,
            scheduler_armed: AtomicBool::new(false),
            metrics,
        }
    }

    /// Take a buffer from the free list, or construct one if it is empty.
    ///
    /// The returned message is in its initial state and exclusively owned by the caller.
    pub fn acquire_message(&self) -> OutgoingMessage {
        let recycled = self.lock_free_list().pop();
        match recycled {
            Some(message) => {
                self.metrics.buffer_recycled();
                message
            }
            None => {
                self.metrics.buffer_allocated();
                trace!("Free list empty, allocating message buffer");
                OutgoingMessage::new()
            }
        }
    }

    /// Return a buffer to the free list. Consumes the message so it cannot be used again.
    pub fn release_message(&self, mut message: OutgoingMessage) {
        message.reset();
        let mut free_list = self.lock_free_list();
        if free_list.len() < self.free_list_capacity {
            free_list.push(message);
            self.metrics.buffer_released();
        } else {
            self.metrics.buffer_dropped();
        }
    }

    /// Add a connection to the pending set. Returns `false` if it was already there.
    pub fn register_for_auto_flush(&self, connection: &ConnectionHandle) -> bool {
        let added = self
            .lock_pending()
            .insert(connection.id(), Arc::clone(connection))
            .is_none();
        if added {
            trace!(connection = %connection.id(), "Registered for auto-flush");
        }
        added
    }

    /// Remove a connection from the pending set and discard its unsent message.
    ///
    /// Safe while a flush cycle is running: a connection whose message has
    /// already been discarded is skipped by that cycle.
    pub fn unregister_from_auto_flush(&self, connection: &Connection) -> bool {
        let removed = self.lock_pending().remove(&connection.id()).is_some();

        if let Some(message) = connection.take_pending() {
            debug!(
                connection = %connection.id(),
                bytes = message.payload_len(),
                "Discarding unsent message"
            );
            self.metrics.cancellation();
            self.release_message(message);
        }
        removed
    }

    pub fn is_registered(&self, connection: &Connection) -> bool {
        self.lock_pending().contains_key(&connection.id())
    }

    /// Connections currently waiting for a flush
    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    /// Idle buffers on the free list
    pub fn available(&self) -> usize {
        self.lock_free_list().len()
    }

    /// Total buffers ever constructed by this pool
    pub fn allocated(&self) -> u64 {
        self.metrics.buffers_allocated.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Flush every connection in the pending set.
    ///
    /// The set is drained up front; the pool lock is not held while writing.
    #[instrument(skip(self))]
    pub fn flush_all(&self) -> FlushReport {
        let _timer = Timer::start("flush_all");
        let snapshot = std::mem::take(&mut *self.lock_pending());

        let mut report = FlushReport {
            visited: snapshot.len(),
            ..FlushReport::default()
        };
        for connection in snapshot.values() {
            self.flush_into(connection, &mut report);
        }

        self.metrics.flush_cycle();
        if report.visited > 0 {
            debug!(
                visited = report.visited,
                flushed = report.flushed,
                failed = report.failures.len(),
                bytes = report.bytes,
                "Flush cycle complete"
            );
        }
        report
    }

    /// Flush one connection now, outside the regular cycle.
    #[instrument(skip(self, connection), fields(connection = %connection.id()))]
    pub fn flush_connection(&self, connection: &Connection) -> FlushReport {
        self.lock_pending().remove(&connection.id());

        let mut report = FlushReport {
            visited: 1,
            ..FlushReport::default()
        };
        self.flush_into(connection, &mut report);
        report
    }

    /// Start the recurring flush timer on the current tokio runtime.
    pub fn schedule_flush_cycle(self: &Arc<Self>, interval: Duration) -> Result<FlushScheduler> {
        FlushScheduler::spawn(Arc::clone(self), interval, self.flush_on_shutdown)
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler_armed.load(Ordering::Acquire)
    }

    pub(crate) fn arm_scheduler(&self) -> Result<()> {
        if self.scheduler_armed.swap(true, Ordering::AcqRel) {
            return Err(DispatchError::SchedulerActive);
        }
        Ok(())
    }

    pub(crate) fn disarm_scheduler(&self) {
        self.scheduler_armed.store(false, Ordering::Release);
    }

    /// Frame (if needed) and write one message for `connection`, then recycle it.
    ///
    /// Returns the number of wire bytes written. Transport failures are
    /// recorded on the connection; the buffer is recycled either way.
    pub(crate) fn transmit(
        &self,
        connection: &Connection,
        mut message: OutgoingMessage,
    ) -> Result<usize> {
        if !message.is_framed() {
            let mode = connection.checksum_mode();
            let checksum = mode.compute(message.payload());
            if let Err(e) = message.finalize_framing(mode.is_enabled(), checksum) {
                error!(
                    connection = %connection.id(),
                    error = %e,
                    "Framing failed, discarding message"
                );
                self.metrics.framing_error();
                return Err(e);
            }
        }

        let frame = Bytes::copy_from_slice(message.output_buffer());
        self.release_message(message);

        let len = frame.len();
        match connection.transport().write(frame) {
            Ok(()) => {
                self.metrics.message_flushed(len as u64);
                Ok(len)
            }
            Err(e) => {
                connection.record_write_failure(&e);
                self.metrics.write_error();
                Err(DispatchError::Io(e))
            }
        }
    }

    fn flush_into(&self, connection: &Connection, report: &mut FlushReport) {
        // Held across the write so an early send on this connection cannot overtake us
        let mut outbox = connection.lock_outbox();
        let Some(message) = outbox.take() else {
            report.skipped += 1;
            return;
        };

        if message.is_empty() && !message.is_framed() {
            self.release_message(message);
            report.skipped += 1;
            return;
        }

        match self.transmit(connection, message) {
            Ok(bytes) => {
                report.flushed += 1;
                report.bytes += bytes as u64;
            }
            Err(e) => report.failures.push((connection.id(), e)),
        }
    }

    fn lock_free_list(&self) -> MutexGuard<'_, Vec<OutgoingMessage>> {
        self.free_list.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_pending(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, ConnectionHandle>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MessageDispatchPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl std::fmt::Debug for MessageDispatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatchPool")
            .field("available", &self.available())
            .field("pending", &self.pending_count())
            .field("free_list_capacity", &self.free_list_capacity)
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}
