//! # Core Message Components
//!
//! Fixed-capacity message buffers and the outbound framing layer.
//!
//! ## Components
//! - **RawMessageBuffer**: bounded byte buffer with a write cursor and logical length
//! - **OutgoingMessage**: raw buffer plus a reserved header region filled after the payload
//! - **Checksum**: per-connection checksum policy applied at flush time
//!
//! ## Buffer Layout
//! ```text
//! 0            header_start    INITIAL_BUFFER_POSITION          position
//! |  reserved  |  headers ...  |  payload ...                   |  free ...  |
//! ```
//! Headers are written backward from `INITIAL_BUFFER_POSITION`, so the payload
//! never moves once written.

pub mod buffer;
pub mod checksum;
pub mod message;

/// Capacity in bytes of every message buffer, header reserve included.
pub const NETWORK_MESSAGE_MAX_SIZE: usize = 24590;

/// Bytes reserved ahead of the payload for framing headers.
pub const INITIAL_BUFFER_POSITION: usize = 8;

/// Width of the length header field.
pub const LENGTH_HEADER_SIZE: usize = 2;

/// Width of the optional checksum header field.
pub const CHECKSUM_HEADER_SIZE: usize = 4;

/// Largest payload a single message can carry.
pub const MAX_PAYLOAD_SIZE: usize = NETWORK_MESSAGE_MAX_SIZE - INITIAL_BUFFER_POSITION;

const _: () = assert!(INITIAL_BUFFER_POSITION >= LENGTH_HEADER_SIZE + CHECKSUM_HEADER_SIZE);
const _: () = assert!(MAX_PAYLOAD_SIZE + CHECKSUM_HEADER_SIZE <= u16::MAX as usize);
