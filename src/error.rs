//! # Error Types
//!
//! Error handling for outbound message construction and dispatch.
//!
//! ## Error Categories
//! - **Construction Errors**: payload overflow, header reserve exhaustion, double framing.
//!   These are raised synchronously at the call site and never truncate data.
//! - **I/O Errors**: transport write failures. During a flush cycle these are
//!   collected per connection and never abort the cycle.
//! - **Scheduling Errors**: flush timer already armed, no async runtime.
//! - **Configuration Errors**: invalid or unreadable configuration.
//!
//! ## Example Usage
//! ```rust
//! use message_dispatch::core::buffer::RawMessageBuffer;
//! use message_dispatch::core::MAX_PAYLOAD_SIZE;
//! use message_dispatch::error::DispatchError;
//!
//! let mut buf = RawMessageBuffer::new();
//! let err = buf.write(&vec![0u8; MAX_PAYLOAD_SIZE + 1]).unwrap_err();
//! assert!(matches!(err, DispatchError::BufferOverflow { .. }));
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    pub const ERR_TRANSPORT_CLOSED: &str = "Transport receiver closed";
    pub const ERR_NO_RUNTIME: &str = "No tokio runtime available to drive the flush scheduler";
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Payload exceeded the protocol maximum. A programming error, not an I/O condition.
    #[error("Buffer overflow: {requested} bytes requested, {available} bytes available")]
    BufferOverflow { requested: usize, available: usize },

    /// The reserved header region is too small for the requested framing.
    /// Only reachable if the protocol constants are inconsistent.
    #[error("Header space exhausted: {needed} bytes needed, {available} bytes reserved")]
    HeaderSpaceExhausted { needed: usize, available: usize },

    #[error("Message framing already finalized")]
    AlreadyFramed,

    #[error("Flush scheduler already running for this pool")]
    SchedulerActive,

    #[error("{}", constants::ERR_NO_RUNTIME)]
    RuntimeUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DispatchError {
    /// Whether this error indicates a broken protocol invariant rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::HeaderSpaceExhausted { .. })
    }
}

/// Type alias for Results using DispatchError
pub type Result<T> = std::result::Result<T, DispatchError>;
