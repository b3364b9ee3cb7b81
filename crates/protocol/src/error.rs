//! Protocol error types

use thiserror::Error;

/// Errors that can occur while framing or decoding messages
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame carried no type byte
    #[error("empty message")]
    Empty,

    /// Unknown message type discriminant
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    /// Unknown error kind discriminant
    #[error("unknown error kind: {0}")]
    UnknownErrorKind(u8),

    /// Payload ended before a field was complete
    #[error("truncated {0}")]
    Truncated(&'static str),

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 {
        /// Field being decoded
        field: &'static str,
    },

    /// Frame exceeds the maximum size
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared frame length
        size: usize,
        /// Allowed maximum
        max: usize,
    },
}

impl ProtocolError {
    /// Create a frame too large error
    #[inline]
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }
}
