//! Producer/consumer bridge for one call
//!
//! `ServerStream` is the stream session of a `Servers` call:
//!
//! ```text
//! spawn_blocking                         caller task
//! ┌─────────────────────────┐           ┌──────────────────────────┐
//! │ RecordSource (owned)    │  mpsc(1)  │ ServerStream::next()     │
//! │   → Pipeline(matcher) ──┼──────────►│   → ServerSink::send()   │
//! └─────────────────────────┘           └──────────────────────────┘
//! ```
//!
//! The handoff channel holds a single item, so the producer cannot run
//! ahead of a slow consumer by more than one match. The producer owns the
//! record source and drops it when it stops, on every exit path.
//!
//! Each session has its own child cancellation token. It is cancelled
//! when the call is cancelled, when the stream reaches a terminal state and
//! when it is dropped. The producer waits on that token while handing off,
//! so it never stays parked on a full channel after the call is over.

use std::path::PathBuf;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use authority_protocol::ServerMsg;

use crate::error::{Result, StreamError};
use crate::filter::Matcher;
use crate::pipeline::Pipeline;
use crate::sink::ServerSink;
use crate::source::{RecordSource, ServerRecord};

/// Number of items in flight between producer and consumer
const HANDOFF_CAPACITY: usize = 1;

/// Lifecycle of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Request received, nothing done yet
    Init,
    /// Compiling the matcher
    Compiling,
    /// Producer running, items flowing
    Scanning,
    /// Source exhausted, every match delivered
    Completed,
    /// Ended by an error
    Failed,
    /// Ended by cancellation
    Cancelled,
}

impl CallState {
    /// True for `Completed`, `Failed` and `Cancelled`
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether a call may move from `self` to `next`
    pub fn can_transition_to(self, next: CallState) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Compiling)
                | (Self::Compiling, Self::Scanning | Self::Failed)
                | (Self::Scanning, Self::Completed | Self::Failed | Self::Cancelled)
        )
    }

    /// Move to `next`
    pub(crate) fn transition(self, next: CallState) -> CallState {
        debug_assert!(
            self.can_transition_to(next),
            "invalid call state transition {self:?} -> {next:?}"
        );
        trace!(from = ?self, to = ?next, "call state");
        next
    }

    fn after_error(err: &StreamError) -> Self {
        match err {
            StreamError::Cancelled => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

/// Matches of one call, delivered in scan order
#[derive(Debug)]
pub struct ServerStream {
    receiver: mpsc::Receiver<Result<ServerMsg>>,
    /// Session token (child of the caller's token)
    cancel: CancellationToken,
    state: CallState,
    /// Items handed to the consumer so far
    received: u64,
}

impl ServerStream {
    /// Start scanning the dataset at `path`
    ///
    /// Must be called from within a tokio runtime. If the file cannot be
    /// opened the stream yields a single `SourceUnavailable` error.
    pub fn spawn(path: PathBuf, matcher: Matcher, cancel: &CancellationToken) -> Self {
        Self::spawn_with(move || RecordSource::open(path), matcher, cancel)
    }

    /// Start scanning records produced by `open`
    ///
    /// `open` runs on the producer thread, so blocking I/O is fine there.
    /// The stream starts in `Scanning`: the matcher is already compiled.
    pub fn spawn_with<F, I>(open: F, matcher: Matcher, cancel: &CancellationToken) -> Self
    where
        F: FnOnce() -> Result<I> + Send + 'static,
        I: Iterator<Item = Result<ServerRecord>>,
    {
        let session = cancel.child_token();
        let (sender, receiver) = mpsc::channel(HANDOFF_CAPACITY);

        let producer = Producer {
            handle: Handle::current(),
            cancel: session.clone(),
            sender,
        };
        tokio::task::spawn_blocking(move || producer.run(open, matcher));

        Self {
            receiver,
            cancel: session,
            state: CallState::Scanning,
            received: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CallState {
        self.state
    }

    /// Items received from the producer so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Wait for the next match
    ///
    /// Returns `None` once the stream has reached a terminal state. An
    /// error is returned at most once and nothing follows it.
    pub async fn next(&mut self) -> Option<Result<ServerMsg>> {
        if self.state.is_terminal() {
            return None;
        }

        let item = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(Err(StreamError::Cancelled)),
            item = self.receiver.recv() => item,
        };

        match &item {
            Some(Ok(_)) => self.received += 1,
            Some(Err(e)) => self.finish(CallState::after_error(e)),
            None => self.finish(CallState::Completed),
        }

        item
    }

    /// Forward every match to `sink`
    ///
    /// Returns the number of items sent, or the first error. A send failure
    /// stops the scan immediately, and so does a match the sink cannot
    /// encode.
    pub async fn forward<S>(mut self, sink: &mut S) -> Result<u64>
    where
        S: ServerSink + ?Sized,
    {
        let mut sent = 0u64;

        while let Some(item) = self.next().await {
            let msg = item?;

            if self.cancel.is_cancelled() {
                self.finish(CallState::Cancelled);
                return Err(StreamError::Cancelled);
            }

            if let Err(e) = sink.send(&msg).await {
                self.finish(CallState::Failed);
                return Err(StreamError::from_send(e));
            }
            sent += 1;
        }

        Ok(sent)
    }

    fn finish(&mut self, state: CallState) {
        debug!(?state, received = self.received, "stream finished");
        self.state = self.state.transition(state);
        // Stop the producer; it releases the source on its way out
        self.cancel.cancel();
    }
}

impl Drop for ServerStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producer side of a session: runs on a blocking thread
struct Producer {
    handle: Handle,
    cancel: CancellationToken,
    sender: mpsc::Sender<Result<ServerMsg>>,
}

impl Producer {
    /// Open the source and drive the pipeline until it ends or the
    /// consumer stops listening. The source is dropped on return.
    fn run<F, I>(self, open: F, matcher: Matcher)
    where
        F: FnOnce() -> Result<I>,
        I: Iterator<Item = Result<ServerRecord>>,
    {
        let records = match open() {
            Ok(records) => records,
            Err(e) => {
                self.hand_off(Err(e));
                return;
            }
        };

        for item in Pipeline::new(records, matcher, self.cancel.clone()) {
            if !self.hand_off(item) {
                break;
            }
        }

        trace!("producer stopped");
    }

    /// Block until the consumer takes `item` or the session is cancelled
    ///
    /// Returns false if the item was not delivered. A cancelled session
    /// already has its terminal outcome on the consumer side.
    fn hand_off(&self, item: Result<ServerMsg>) -> bool {
        self.handle.block_on(async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                sent = self.sender.send(item) => sent.is_ok(),
            }
        })
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
