//! Authority Service - the `Servers` streaming call
//!
//! A `Servers` call takes a filter (name regex plus datacenter set), scans
//! the persisted dataset lazily and streams the name of every matching
//! server back to the caller:
//!
//! - Records are decoded one at a time; the dataset is never loaded whole
//! - Producer and consumer meet at a single-slot channel (backpressure)
//! - Every call can be cancelled and ends with exactly one outcome
//! - The dataset is opened per call and closed on every exit path
//!
//! # Architecture
//!
//! ```text
//! AuthorityClient ──TCP──► AuthorityServer
//!                               │  one call per connection
//!                               ▼
//!                          Authority::servers()
//!                               │
//!                   Matcher::compile(request)   ◄── InvalidPattern
//!                               │
//!        ┌──────────────────────┴───────────────────┐
//!        ▼  spawn_blocking                          ▼  call task
//!   RecordSource ─► Pipeline ──► mpsc(1) ──► ServerStream ─► ServerSink
//!   (dataset file)  (matcher)                (cancel)        (FrameSink)
//! ```

mod authority;
pub mod client;
mod error;
pub mod filter;
pub mod pipeline;
pub mod server;
pub mod sink;
pub mod source;
pub mod stream;

pub use authority::Authority;
pub use client::AuthorityClient;
pub use error::{ClientError, Result, ServerError, StreamError};
pub use filter::Matcher;
pub use pipeline::Pipeline;
pub use server::AuthorityServer;
pub use sink::{FrameSink, ServerSink};
pub use source::{RecordSource, ServerRecord};
pub use stream::{CallState, ServerStream};
