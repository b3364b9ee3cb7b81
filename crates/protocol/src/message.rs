//! Message types exchanged between the Authority server and its clients
//!
//! Strings are encoded as `[u32 BE length][UTF-8 bytes]`, string lists as
//! `[u32 BE count]` followed by that many strings.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::Result;
use crate::error::ProtocolError;
use crate::frame::LENGTH_PREFIX_SIZE;
use crate::kind::ErrorKind;

/// Message type discriminants
const MSG_SERVERS: u8 = 0x01;
const MSG_SERVER: u8 = 0x02;
const MSG_ERROR: u8 = 0x03;

/// Messages exchanged over one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Client → Server: filter request that opens the call
    Servers(ServersRequest),
    /// Server → Client: one matching record
    Server(ServerMsg),
    /// Server → Client: terminal error
    Error(ErrorFrame),
}

/// Filter request for the `Servers` call
///
/// Both filters are optional: an empty pattern or an empty datacenter list
/// places no constraint on that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServersRequest {
    /// Regular expression matched against record names (empty = all names)
    pub name_filter_re: String,
    /// Acceptable datacenters (empty = all datacenters)
    pub datacenter_filter: Vec<String>,
}

/// A matching record projected for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerMsg {
    /// Server name
    pub name: String,
}

/// Terminal error reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorFrame {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
}

impl Message {
    /// Encode message to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);

        // Reserve space for length prefix (filled in at end)
        buf.put_u32(0);

        match self {
            Message::Servers(req) => {
                buf.put_u8(MSG_SERVERS);
                req.encode(&mut buf);
            }
            Message::Server(msg) => {
                buf.put_u8(MSG_SERVER);
                encode_string(&msg.name, &mut buf);
            }
            Message::Error(err) => {
                buf.put_u8(MSG_ERROR);
                buf.put_u8(err.kind.as_u8());
                encode_string(&err.message, &mut buf);
            }
        }

        let len = (buf.len() - LENGTH_PREFIX_SIZE) as u32;
        buf[0..LENGTH_PREFIX_SIZE].copy_from_slice(&len.to_be_bytes());

        buf.freeze()
    }

    /// Decode message from bytes (without length prefix)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(ProtocolError::Empty);
        }

        match buf.get_u8() {
            MSG_SERVERS => Ok(Message::Servers(ServersRequest::decode(&mut buf)?)),
            MSG_SERVER => {
                let name = decode_string(&mut buf, "server name")?;
                Ok(Message::Server(ServerMsg { name }))
            }
            MSG_ERROR => {
                if buf.remaining() < 1 {
                    return Err(ProtocolError::Truncated("error kind"));
                }
                let kind = ErrorKind::try_from(buf.get_u8())?;
                let message = decode_string(&mut buf, "error message")?;
                Ok(Message::Error(ErrorFrame { kind, message }))
            }
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }

    /// Short name of the message type, for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Servers(_) => "servers",
            Message::Server(_) => "server",
            Message::Error(_) => "error",
        }
    }
}

impl ServersRequest {
    /// Create a request with no filters (match all)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name pattern
    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter_re = pattern.into();
        self
    }

    /// Set the datacenter filter
    pub fn with_datacenters<I, S>(mut self, datacenters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datacenter_filter = datacenters.into_iter().map(Into::into).collect();
        self
    }

    fn encode(&self, buf: &mut BytesMut) {
        encode_string(&self.name_filter_re, buf);

        buf.put_u32(self.datacenter_filter.len() as u32);
        for dc in &self.datacenter_filter {
            encode_string(dc, buf);
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self> {
        let name_filter_re = decode_string(buf, "name filter")?;

        if buf.remaining() < 4 {
            return Err(ProtocolError::Truncated("datacenter count"));
        }
        let count = buf.get_u32() as usize;

        // Each entry needs at least its length prefix
        if buf.remaining() < count.saturating_mul(4) {
            return Err(ProtocolError::Truncated("datacenter filter"));
        }
        let mut datacenter_filter = Vec::with_capacity(count);
        for _ in 0..count {
            datacenter_filter.push(decode_string(buf, "datacenter")?);
        }

        Ok(Self {
            name_filter_re,
            datacenter_filter,
        })
    }
}

impl ServerMsg {
    /// Create a server message
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ErrorFrame {
    /// Create an error frame
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorten the message so the encoded frame payload is at most
    /// `max_frame_size` bytes
    ///
    /// The cut lands on a character boundary.
    pub fn truncate_to_fit(&mut self, max_frame_size: usize) {
        // type byte, kind byte, message length prefix
        const OVERHEAD: usize = 2 + 4;

        let room = max_frame_size.saturating_sub(OVERHEAD);
        if self.message.len() <= room {
            return;
        }
        let mut end = room;
        while !self.message.is_char_boundary(end) {
            end -= 1;
        }
        self.message.truncate(end);
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes, field: &'static str) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(ProtocolError::Truncated(field));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(ProtocolError::Truncated(field));
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8 { field })
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
