//! Authority Protocol - wire format for the `Servers` streaming call
//!
//! A call is one TCP connection. The client sends a single `Servers`
//! request, the server answers with zero or more `Server` items and then
//! either closes the connection (success) or sends exactly one `Error`
//! frame and closes.
//!
//! # Wire Format
//!
//! All frames are length-prefixed:
//! ```text
//! ┌──────────────┬─────────┬──────────────────────────┐
//! │ 4 bytes      │ 1 byte  │ N - 1 bytes              │
//! │ length (BE)  │ type    │ payload                  │
//! └──────────────┴─────────┴──────────────────────────┘
//! ```
//!
//! # Message Types
//!
//! - `Servers` (0x01): Client → Server, filter request
//! - `Server` (0x02): Server → Client, one matching record
//! - `Error` (0x03): Server → Client, terminal error

mod error;
mod frame;
mod kind;
mod message;

pub use error::ProtocolError;
pub use frame::{FrameDecoder, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, read_length_prefix};
pub use kind::ErrorKind;
pub use message::{ErrorFrame, Message, ServerMsg, ServersRequest};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
