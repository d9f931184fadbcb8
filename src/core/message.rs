//! # Outgoing Message
//!
//! A [`RawMessageBuffer`] with a reserved header region that is filled after the
//! payload has been written.
//!
//! Headers are prepended: each field moves `header_start` backward and lands
//! directly in front of whatever was written before it, so the payload is never
//! copied or shifted. `header_start` only ever decreases.
//!
//! ## Framing
//! ```text
//! finalize_framing(false, _)  =>  [len u16][payload]
//! finalize_framing(true,  c)  =>  [c u32][len u16][payload]
//! ```
//! `len` counts everything in front of which it is written: the payload, any
//! header fields prepended earlier, and the checksum when present. It never
//! counts itself.

use crate::core::buffer::RawMessageBuffer;
use crate::core::{CHECKSUM_HEADER_SIZE, INITIAL_BUFFER_POSITION, LENGTH_HEADER_SIZE};
use crate::error::{DispatchError, Result};

/// A fixed-width integer that can be written into the header region.
pub trait HeaderField: Copy {
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Encode little-endian into `out`, which is exactly `WIDTH` bytes
    fn encode_le(self, out: &mut [u8]);
}

impl HeaderField for u16 {
    const WIDTH: usize = 2;

    fn encode_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }
}

impl HeaderField for u32 {
    const WIDTH: usize = 4;

    fn encode_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }
}

/// Outbound message with backward-growing header region.
///
/// Not `Clone`: a message has exactly one owner until it is released back to
/// its pool.
#[derive(Debug)]
pub struct OutgoingMessage {
    buffer: RawMessageBuffer,
    header_start: usize,
    framed: bool,
}

impl OutgoingMessage {
    pub fn new() -> Self {
        Self {
            buffer: RawMessageBuffer::new(),
            header_start: INITIAL_BUFFER_POSITION,
            framed: false,
        }
    }

    /// Append payload bytes. Fails once framing has been finalized.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.buffer.write(bytes)
    }

    /// Append a raw buffer's payload.
    pub fn append(&mut self, other: &RawMessageBuffer) -> Result<()> {
        self.ensure_open()?;
        self.buffer.append(other)
    }

    /// Append another message's payload (headers excluded) for a single wire write.
    pub fn append_message(&mut self, other: &OutgoingMessage) -> Result<()> {
        self.ensure_open()?;
        self.buffer.append(&other.buffer)
    }

    /// Mutable access to the payload buffer for typed writes.
    pub fn body(&mut self) -> Result<&mut RawMessageBuffer> {
        self.ensure_open()?;
        Ok(&mut self.buffer)
    }

    /// Prepend one header field in front of everything written so far.
    ///
    /// Fails with [`DispatchError::HeaderSpaceExhausted`] if the reserve cannot
    /// hold `T::WIDTH` more bytes.
    pub fn prepend_header_field<T: HeaderField>(&mut self, value: T) -> Result<()> {
        self.ensure_open()?;
        self.prepend(value)
    }

    /// Write the framing headers. Must be called exactly once, after all payload writes.
    ///
    /// The length value is computed up front so it covers the payload, any
    /// previously prepended fields and the checksum width (if any), never the
    /// length field itself.
    pub fn finalize_framing(&mut self, include_checksum: bool, checksum: u32) -> Result<()> {
        self.ensure_open()?;

        let checksum_width = if include_checksum {
            CHECKSUM_HEADER_SIZE
        } else {
            0
        };
        let needed = LENGTH_HEADER_SIZE + checksum_width;
        if self.header_start < needed {
            return Err(DispatchError::HeaderSpaceExhausted {
                needed,
                available: self.header_start,
            });
        }

        let prepended = INITIAL_BUFFER_POSITION - self.header_start;
        let covered = prepended + self.buffer.len() + checksum_width;
        let length = u16::try_from(covered).map_err(|_| DispatchError::BufferOverflow {
            requested: covered,
            available: u16::MAX as usize,
        })?;

        self.prepend(length)?;
        if include_checksum {
            self.prepend(checksum)?;
        }
        self.framed = true;
        Ok(())
    }

    /// Exactly the bytes handed to the transport: headers followed by payload.
    pub fn output_buffer(&self) -> &[u8] {
        let end = INITIAL_BUFFER_POSITION + self.buffer.len();
        &self.buffer.raw()[self.header_start..end]
    }

    pub fn payload(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn payload_len(&self) -> usize {
        self.buffer.len()
    }

    /// Headers written so far plus payload
    pub fn wire_len(&self) -> usize {
        INITIAL_BUFFER_POSITION - self.header_start + self.buffer.len()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_framed(&self) -> bool {
        self.framed
    }

    pub fn header_start(&self) -> usize {
        self.header_start
    }

    /// Return to the freshly constructed state.
    pub(crate) fn reset(&mut self) {
        self.buffer.reset();
        self.header_start = INITIAL_BUFFER_POSITION;
        self.framed = false;
    }

    fn prepend<T: HeaderField>(&mut self, value: T) -> Result<()> {
        if self.header_start < T::WIDTH {
            return Err(DispatchError::HeaderSpaceExhausted {
                needed: T::WIDTH,
                available: self.header_start,
            });
        }

        self.header_start -= T::WIDTH;
        let start = self.header_start;
        value.encode_le(&mut self.buffer.raw_mut()[start..start + T::WIDTH]);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.framed {
            Err(DispatchError::AlreadyFramed)
        } else {
            Ok(())
        }
    }
}

impl Default for OutgoingMessage {
    fn default() -> Self {
        Self::new()
    }
}
