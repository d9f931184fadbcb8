//! # Transport Seam
//!
//! The dispatch core never touches sockets. It hands each finished frame to a
//! [`Transport`], once per flushed connection per cycle, and never partially.
//!
//! ## Components
//! - **Transport**: the write-side collaborator interface
//! - **Connection**: one client session and its pending outbound message
//! - **ChannelTransport**: a `Transport` feeding a tokio writer task

use bytes::Bytes;
use std::fmt;
use std::io;

pub mod channel;
pub mod connection;

/// Write side of a client connection.
///
/// Implementations must not block on network I/O; the flush cycle calls
/// `write` for every pending connection in turn.
pub trait Transport: Send + Sync {
    /// Deliver one complete frame.
    fn write(&self, frame: Bytes) -> io::Result<()>;
}

/// Stable identifier of a client session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}
