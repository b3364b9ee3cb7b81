//! Error types for the Servers call

use std::io;
use std::time::Duration;

use thiserror::Error;

use authority_protocol::{ErrorFrame, ErrorKind, ProtocolError};

/// Terminal outcome of a failed call
///
/// Every variant ends the call. Items already delivered before the error
/// stay delivered; nothing is sent after it.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Name filter is not a valid regular expression
    #[error("invalid name pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern as supplied by the caller
        pattern: String,
        /// Compilation error
        #[source]
        source: regex::Error,
    },

    /// Dataset could not be opened
    #[error("dataset '{path}' unavailable: {source}")]
    SourceUnavailable {
        /// Configured dataset path
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A record in the dataset is malformed
    #[error("malformed record {record}: {source}")]
    DecodeFailure {
        /// 1-based position of the record in the dataset
        record: u64,
        /// Decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Call was cancelled before the scan completed
    #[error("call cancelled")]
    Cancelled,

    /// Transport rejected a send
    #[error("send failed: {0}")]
    SendFailure(#[source] io::Error),

    /// A match could not be encoded for the transport; the connection is
    /// still usable
    #[error("match not sendable: {0}")]
    Unsendable(#[source] io::Error),
}

impl StreamError {
    /// Wire classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::SendFailure(_) => ErrorKind::SendFailure,
            Self::Unsendable(_) => ErrorKind::Protocol,
        }
    }

    /// Classify an error returned by a `ServerSink`
    pub fn from_send(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::InvalidData => Self::Unsendable(err),
            _ => Self::SendFailure(err),
        }
    }

    /// Build the `Error` frame reported to the caller
    pub fn to_frame(&self) -> ErrorFrame {
        ErrorFrame::new(self.kind(), self.to_string())
    }

    /// True if this error means the caller can no longer be reached
    #[inline]
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Self::SendFailure(_))
    }
}

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors raised by the TCP server outside of a call
#[derive(Error, Debug)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame from the client
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Client connected but never sent a complete request
    #[error("no request received within {0:?}")]
    RequestTimeout(Duration),

    /// Client sent something other than a `Servers` request
    #[error("expected Servers request, got {0}")]
    UnexpectedMessage(&'static str),
}

impl ServerError {
    /// Build the `Error` frame reported for a rejected request
    pub fn to_frame(&self) -> ErrorFrame {
        ErrorFrame::new(ErrorKind::Protocol, self.to_string())
    }
}

/// Errors seen by a `Servers` client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Server could not be reached
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame from the server
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server ended the call with an `Error` frame
    #[error("server error ({kind}): {message}")]
    Remote { kind: ErrorKind, message: String },

    /// Server sent a frame a client never expects
    #[error("unexpected {0} message from server")]
    UnexpectedMessage(&'static str),

    /// Connection closed in the middle of a frame
    #[error("connection closed mid-frame")]
    Truncated,
}

impl ClientError {
    /// Error kind reported by the server, if the server reported one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
