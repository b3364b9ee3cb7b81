//! Error kinds carried by `Error` frames
//!
//! NOTE: These values are used on the wire and must not be renumbered.

use crate::error::ProtocolError;

/// Classification of a terminal call error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Name filter is not a valid regular expression
    InvalidPattern = 1,
    /// Dataset could not be opened
    SourceUnavailable = 2,
    /// A dataset record is malformed
    DecodeFailure = 3,
    /// Call was cancelled before the scan completed
    Cancelled = 4,
    /// Transport rejected a send
    SendFailure = 5,
    /// Client violated the wire protocol
    Protocol = 6,
    /// Server is at its connection limit
    Busy = 7,
}

impl ErrorKind {
    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get the string name of this kind
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPattern => "invalid_pattern",
            Self::SourceUnavailable => "source_unavailable",
            Self::DecodeFailure => "decode_failure",
            Self::Cancelled => "cancelled",
            Self::SendFailure => "send_failure",
            Self::Protocol => "protocol",
            Self::Busy => "busy",
        }
    }
}

impl TryFrom<u8> for ErrorKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::InvalidPattern),
            2 => Ok(Self::SourceUnavailable),
            3 => Ok(Self::DecodeFailure),
            4 => Ok(Self::Cancelled),
            5 => Ok(Self::SendFailure),
            6 => Ok(Self::Protocol),
            7 => Ok(Self::Busy),
            other => Err(ProtocolError::UnknownErrorKind(other)),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
