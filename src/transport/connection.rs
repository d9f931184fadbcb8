//! # Connection Handle
//!
//! A client session as seen by the dispatch core: an id, a transport, a
//! checksum policy, and at most one pending outbound message.
//!
//! The outbox lock serializes everything that sends on behalf of one
//! connection (immediate sends and the flush cycle), which keeps frames in
//! the order their framing was finalized.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::core::checksum::ChecksumMode;
use crate::core::message::OutgoingMessage;
use crate::core::MAX_PAYLOAD_SIZE;
use crate::dispatch::MessageDispatchPool;
use crate::error::{DispatchError, Result};
use crate::transport::{ConnectionId, Transport};

/// Shared handle to a connection
pub type ConnectionHandle = Arc<Connection>;

pub struct Connection {
    id: ConnectionId,
    transport: Arc<dyn Transport>,
    checksum: ChecksumMode,
    outbox: Mutex<Option<OutgoingMessage>>,
    write_failed: AtomicBool,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        transport: Arc<dyn Transport>,
        checksum: ChecksumMode,
    ) -> ConnectionHandle {
        Arc::new(Self {
            id,
            transport,
            checksum,
            outbox: Mutex::new(None),
            write_failed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn checksum_mode(&self) -> ChecksumMode {
        self.checksum
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Append `bytes` to this connection's pending message.
    ///
    /// The first write after a flush acquires a buffer from `pool` and
    /// registers the connection for auto-flush. If the pending message has no
    /// room left, it is sent immediately and a fresh buffer takes its place.
    ///
    /// A failed early send does not fail this call. It is logged by the pool
    /// and shows up through [`write_failed`](Self::write_failed).
    pub fn write_payload(
        self: &Arc<Self>,
        pool: &MessageDispatchPool,
        bytes: &[u8],
    ) -> Result<()> {
        if bytes.len() > MAX_PAYLOAD_SIZE {
            return Err(DispatchError::BufferOverflow {
                requested: bytes.len(),
                available: MAX_PAYLOAD_SIZE,
            });
        }

        let mut outbox = self.lock_outbox();
        let full = outbox
            .as_ref()
            .is_some_and(|pending| pending.remaining() < bytes.len());
        if full {
            if let Some(pending) = outbox.take() {
                debug!(connection = %self.id, "Pending message full, sending early");
                // Failures are recorded on the connection by the pool
                let _ = pool.transmit(self, pending);
            }
        }

        if outbox.is_none() {
            pool.register_for_auto_flush(self);
        }
        outbox
            .get_or_insert_with(|| pool.acquire_message())
            .write(bytes)
    }

    /// Hand an externally built message to this connection.
    ///
    /// Unframed messages are merged into the pending one when it has room.
    /// A framed message is sent right away, after anything already pending.
    /// Only the send of `message` itself is reported; a failed send of the
    /// previously pending message shows up through [`write_failed`](Self::write_failed).
    pub fn enqueue(
        self: &Arc<Self>,
        pool: &MessageDispatchPool,
        message: OutgoingMessage,
    ) -> Result<()> {
        let mut outbox = self.lock_outbox();

        if message.is_framed() {
            if let Some(pending) = outbox.take() {
                let _ = pool.transmit(self, pending);
            }
            return pool.transmit(self, message).map(|_| ());
        }

        let mergeable = outbox
            .as_ref()
            .map(|pending| !pending.is_framed() && pending.remaining() >= message.payload_len());
        match mergeable {
            Some(true) => {
                let merged = match outbox.as_mut() {
                    Some(pending) => pending.append_message(&message),
                    None => Ok(()),
                };
                // The merged-from buffer goes back to the pool even on error
                pool.release_message(message);
                merged?;
            }
            Some(false) => {
                if let Some(pending) = outbox.replace(message) {
                    let _ = pool.transmit(self, pending);
                }
            }
            None => {
                pool.register_for_auto_flush(self);
                *outbox = Some(message);
            }
        }
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        self.lock_outbox().is_some()
    }

    /// Detach the pending message without sending it.
    pub fn take_pending(&self) -> Option<OutgoingMessage> {
        self.lock_outbox().take()
    }

    /// Whether any transport write for this connection has failed
    pub fn write_failed(&self) -> bool {
        self.write_failed.load(Ordering::Acquire)
    }

    pub(crate) fn record_write_failure(&self, error: &io::Error) {
        self.write_failed.store(true, Ordering::Release);
        warn!(connection = %self.id, error = %error, "Transport write failed");
    }

    pub(crate) fn lock_outbox(&self) -> MutexGuard<'_, Option<OutgoingMessage>> {
        self.outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("checksum", &self.checksum)
            .field("write_failed", &self.write_failed())
            .finish()
    }
}
