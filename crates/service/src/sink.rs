//! Destinations for streamed results
//!
//! A `ServerSink` is the transport-level send primitive the stream adapter
//! forwards matches to. A failed send ends the call; sinks are never
//! retried.
//!
//! A sink that cannot encode a match at all (as opposed to a transport
//! that went away) reports `io::ErrorKind::InvalidData` without writing
//! anything, so the caller can still be told why the call ended.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use authority_protocol::{
    ErrorFrame, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, Message, ProtocolError, ServerMsg,
};

/// Receives the matches of one call, in scan order
#[async_trait]
pub trait ServerSink: Send {
    /// Deliver one result to the caller
    async fn send(&mut self, msg: &ServerMsg) -> io::Result<()>;
}

/// Collects results in memory
#[async_trait]
impl ServerSink for Vec<ServerMsg> {
    async fn send(&mut self, msg: &ServerMsg) -> io::Result<()> {
        self.push(msg.clone());
        Ok(())
    }
}

/// Forwards results to another task; fails once the receiver is dropped
#[async_trait]
impl ServerSink for mpsc::Sender<ServerMsg> {
    async fn send(&mut self, msg: &ServerMsg) -> io::Result<()> {
        mpsc::Sender::send(self, msg.clone())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "receiver dropped"))
    }
}

/// Writes results as length-prefixed `Server` frames
#[derive(Debug)]
pub struct FrameSink<W> {
    writer: W,
    /// Largest frame payload the peer accepts
    max_frame_size: usize,
    /// Frames written so far
    frames: u64,
}

impl<W> FrameSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self::with_max_frame_size(writer, MAX_FRAME_SIZE)
    }

    /// Wrap a writer with a custom frame size limit
    pub fn with_max_frame_size(writer: W, max_frame_size: usize) -> Self {
        Self {
            writer,
            max_frame_size,
            frames: 0,
        }
    }

    /// Write the terminal `Error` frame
    ///
    /// An over-long message is cut to fit the frame size limit.
    pub async fn send_error(&mut self, mut frame: ErrorFrame) -> io::Result<()> {
        frame.truncate_to_fit(self.max_frame_size);
        self.writer
            .write_all(&Message::Error(frame).encode())
            .await?;
        self.frames += 1;
        self.writer.flush().await
    }

    /// Flush and close the write side
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }

    /// Frames written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> ServerSink for FrameSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, msg: &ServerMsg) -> io::Result<()> {
        let frame = Message::Server(msg.clone()).encode();

        let size = frame.len() - LENGTH_PREFIX_SIZE;
        if size > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                ProtocolError::frame_too_large(size, self.max_frame_size),
            ));
        }

        self.writer.write_all(&frame).await?;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authority_protocol::{ErrorKind, FrameDecoder};

    #[tokio::test]
    async fn test_vec_sink_collects_in_order() {
        let mut sink: Vec<ServerMsg> = Vec::new();
        sink.send(&ServerMsg::new("a")).await.unwrap();
        sink.send(&ServerMsg::new("b")).await.unwrap();

        assert_eq!(sink, vec![ServerMsg::new("a"), ServerMsg::new("b")]);
    }

    #[tokio::test]
    async fn test_channel_sink_fails_when_receiver_dropped() {
        let (mut tx, rx) = mpsc::channel::<ServerMsg>(1);
        drop(rx);

        let err = ServerSink::send(&mut tx, &ServerMsg::new("a"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_frame_sink_writes_decodable_frames() {
        let mut sink = FrameSink::new(Vec::<u8>::new());
        sink.send(&ServerMsg::new("server1")).await.unwrap();
        sink.send_error(ErrorFrame::new(ErrorKind::Cancelled, "call cancelled"))
            .await
            .unwrap();
        assert_eq!(sink.frames(), 2);

        let mut decoder = FrameDecoder::new();
        decoder.extend(&sink.into_inner());

        assert_eq!(
            decoder.decode_next().unwrap(),
            Some(Message::Server(ServerMsg::new("server1")))
        );
        assert!(matches!(
            decoder.decode_next().unwrap(),
            Some(Message::Error(ErrorFrame {
                kind: ErrorKind::Cancelled,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_frame_sink_rejects_oversized_match() {
        // Server payload: type byte + 4 byte length + name
        let mut sink = FrameSink::with_max_frame_size(Vec::<u8>::new(), 16);
        sink.send(&ServerMsg::new("server1")).await.unwrap();

        let err = sink
            .send(&ServerMsg::new("a-very-long-server-name"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("exceeds maximum 16"));

        // Nothing of the rejected frame reached the writer
        assert_eq!(sink.frames(), 1);
        let written = sink.into_inner();
        assert_eq!(written.len(), LENGTH_PREFIX_SIZE + 1 + 4 + "server1".len());
    }

    #[tokio::test]
    async fn test_frame_sink_fits_error_message() {
        let mut sink = FrameSink::with_max_frame_size(Vec::<u8>::new(), 32);
        sink.send_error(ErrorFrame::new(ErrorKind::InvalidPattern, "p".repeat(200)))
            .await
            .unwrap();

        let mut decoder = FrameDecoder::with_max_frame_size(32);
        decoder.extend(&sink.into_inner());

        match decoder.decode_next().unwrap() {
            Some(Message::Error(frame)) => {
                assert_eq!(frame.kind, ErrorKind::InvalidPattern);
                assert_eq!(frame.message, "p".repeat(26));
            }
            other => panic!("expected Error, got {other:?}"),
        }
    }
}
