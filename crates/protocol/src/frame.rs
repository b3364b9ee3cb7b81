//! Incremental frame decoding
//!
//! `FrameDecoder` accumulates bytes read from a socket and yields complete
//! messages as soon as a whole frame is buffered.

use bytes::{Buf, BytesMut};

use crate::Result;
use crate::error::ProtocolError;
use crate::message::Message;

/// Length prefix size (4 bytes, big-endian u32)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum frame size (1MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Default read buffer capacity (8KB)
const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Buffered decoder for length-prefixed frames
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Create a decoder with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a decoder with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(DEFAULT_CAPACITY),
            max_frame_size,
        }
    }

    /// Buffer to read socket data into
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Append raw bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes not yet consumed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to decode the next complete message
    ///
    /// Returns `Ok(None)` when more data is needed.
    pub fn decode_next(&mut self) -> Result<Option<Message>> {
        let Some(len) = read_length_prefix(&self.buf) else {
            return Ok(None);
        };
        let len = len as usize;

        if len > self.max_frame_size {
            return Err(ProtocolError::frame_too_large(len, self.max_frame_size));
        }

        if self.buf.len() < LENGTH_PREFIX_SIZE + len {
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_SIZE);
        let payload = self.buf.split_to(len).freeze();
        Message::decode(payload).map(Some)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Read exactly 4 bytes for length prefix
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
