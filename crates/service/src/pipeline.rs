//! Filtering pipeline
//!
//! `Pipeline` pulls records from any record iterator, drops the ones the
//! matcher rejects and projects the rest into `ServerMsg`. It does no I/O of
//! its own, so it runs the same over a dataset file or an in-memory vector.
//!
//! Cancellation is checked before every record is pulled. Once cancelled,
//! or once the upstream reports an error, the pipeline yields that error a
//! single time and then stays exhausted.

use tokio_util::sync::CancellationToken;

use authority_protocol::ServerMsg;

use crate::error::{Result, StreamError};
use crate::filter::Matcher;
use crate::source::ServerRecord;

/// Lazy filter over a record sequence
#[derive(Debug)]
pub struct Pipeline<I> {
    records: I,
    matcher: Matcher,
    cancel: CancellationToken,
    done: bool,
}

impl<I> Pipeline<I>
where
    I: Iterator<Item = Result<ServerRecord>>,
{
    /// Create a pipeline over `records`
    pub fn new(records: I, matcher: Matcher, cancel: CancellationToken) -> Self {
        Self {
            records,
            matcher,
            cancel,
            done: false,
        }
    }
}

impl<I> Iterator for Pipeline<I>
where
    I: Iterator<Item = Result<ServerRecord>>,
{
    type Item = Result<ServerMsg>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(StreamError::Cancelled));
            }

            match self.records.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(record)) => {
                    if !self.matcher.matches(&record) {
                        continue;
                    }
                    return Some(Ok(ServerMsg { name: record.name }));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
