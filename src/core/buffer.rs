//! # Raw Message Buffer
//!
//! Fixed-capacity byte buffer shared by every outbound message type.
//!
//! Writes are bounds-checked against the protocol maximum and either land in
//! full or leave the buffer untouched; nothing is ever silently truncated.

use crate::core::{INITIAL_BUFFER_POSITION, MAX_PAYLOAD_SIZE, NETWORK_MESSAGE_MAX_SIZE};
use crate::error::{DispatchError, Result};

/// Fixed-size byte buffer with a write cursor and a logical payload length.
///
/// The first `INITIAL_BUFFER_POSITION` bytes are reserved for headers; the
/// payload starts right after them.
pub struct RawMessageBuffer {
    buffer: Box<[u8]>,
    position: usize,
    length: usize,
}

impl RawMessageBuffer {
    /// Allocate a zeroed buffer of `NETWORK_MESSAGE_MAX_SIZE` bytes
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; NETWORK_MESSAGE_MAX_SIZE].into_boxed_slice(),
            position: INITIAL_BUFFER_POSITION,
            length: 0,
        }
    }

    /// Copy `bytes` at the cursor.
    ///
    /// Fails with [`DispatchError::BufferOverflow`] when the payload would grow
    /// past [`MAX_PAYLOAD_SIZE`]; the buffer is unchanged in that case.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.remaining();
        if bytes.len() > available {
            return Err(DispatchError::BufferOverflow {
                requested: bytes.len(),
                available,
            });
        }

        let end = self.position + bytes.len();
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        self.length += bytes.len();
        Ok(())
    }

    /// Concatenate another buffer's payload. Its header region is never copied.
    pub fn append(&mut self, other: &RawMessageBuffer) -> Result<()> {
        self.write(other.as_bytes())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a `u16` length-prefixed string.
    ///
    /// Checked as a unit: either prefix and bytes both land or neither does.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        let needed = 2 + bytes.len();
        let available = self.remaining();
        if needed > available || bytes.len() > u16::MAX as usize {
            return Err(DispatchError::BufferOverflow {
                requested: needed,
                available,
            });
        }

        self.write_u16(bytes.len() as u16)?;
        self.write(bytes)
    }

    /// Logical payload, excluding the header region
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[INITIAL_BUFFER_POSITION..INITIAL_BUFFER_POSITION + self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes still writable before hitting the payload maximum
    pub fn remaining(&self) -> usize {
        MAX_PAYLOAD_SIZE - self.length
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Rewind to the initial state. Stale bytes stay in memory but are unreachable.
    pub fn reset(&mut self) {
        self.position = INITIAL_BUFFER_POSITION;
        self.length = 0;
    }

    pub(crate) fn raw(&self) -> &[u8] {
        &self.buffer
    }

    pub(crate) fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}

impl Default for RawMessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RawMessageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMessageBuffer")
            .field("position", &self.position)
            .field("length", &self.length)
            .finish()
    }
}
