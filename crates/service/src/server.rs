//! TCP server for `Servers` calls
//!
//! `AuthorityServer` accepts connections and runs one call per connection:
//!
//! 1. Read a single `Servers` request (bounded by `request_timeout`)
//! 2. Stream every match as a `Server` frame
//! 3. Close the connection, after one `Error` frame if the call failed
//!
//! While a call runs, the read half of the socket is watched. The client
//! closing its side, the server shutting down and the optional call
//! deadline all cancel the call. Connections beyond `max_connections` get
//! a `Busy` error frame and are closed.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use authority_config::ServerConfig;
use authority_protocol::{ErrorFrame, ErrorKind, FrameDecoder, Message, ServersRequest};

use crate::authority::Authority;
use crate::error::ServerError;
use crate::sink::FrameSink;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// TCP server exposing an `Authority`
pub struct AuthorityServer {
    authority: Arc<Authority>,
    config: Arc<ServerConfig>,
    /// One permit per running call
    limiter: Arc<Semaphore>,
}

impl AuthorityServer {
    /// Create a server
    pub fn new(authority: Authority, config: ServerConfig) -> Self {
        let limiter = Arc::new(Semaphore::new(config.max_connections));
        Self {
            authority: Arc::new(authority),
            config: Arc::new(config),
            limiter,
        }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let address = &self.config.address;
        TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })
    }

    /// Bind and serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await
    }

    /// Serve on an already bound listener until `cancel` fires
    ///
    /// Cancelling also cancels every call in flight.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let local = listener.local_addr()?;
        info!(
            address = %local,
            dataset = %self.authority.dataset_path().display(),
            max_connections = self.config.max_connections,
            "authority server listening"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => self.dispatch(stream, peer, &cancel),
                        Err(e) => {
                            // Transient accept errors
                            warn!(error = %e, "accept error");
                        }
                    }
                }
            }
        }

        info!(address = %local, "authority server stopped");
        Ok(())
    }

    /// Start the server in a background task
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, cancel: &CancellationToken) {
        let Ok(permit) = Arc::clone(&self.limiter).try_acquire_owned() else {
            debug!(%peer, "connection limit reached, refusing");
            let max = self.config.max_connections;
            tokio::spawn(refuse(stream, max));
            return;
        };

        let authority = Arc::clone(&self.authority);
        let config = Arc::clone(&self.config);
        let call = cancel.child_token();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, authority, config, call, permit).await {
                debug!(%peer, error = %e, "connection ended");
            }
        });
    }
}

/// Answer a connection over the limit with a `Busy` frame
async fn refuse(stream: TcpStream, max: usize) {
    let mut sink = FrameSink::new(stream);
    let frame = ErrorFrame::new(
        ErrorKind::Busy,
        format!("too many concurrent calls (max {max})"),
    );
    if sink.send_error(frame).await.is_ok() {
        let _ = sink.shutdown().await;
    }
}

/// Run one call on one connection
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    authority: Arc<Authority>,
    config: Arc<ServerConfig>,
    call: CancellationToken,
    _permit: OwnedSemaphorePermit,
) -> Result<()> {
    debug!(%peer, "client connected");

    let _ = stream.set_nodelay(true);
    let (mut reader, writer) = stream.into_split();
    let mut sink = FrameSink::new(writer);

    let request = match read_request(&mut reader, config.request_timeout).await {
        Ok(request) => request,
        Err(e) => {
            if sink.send_error(e.to_frame()).await.is_ok() {
                let _ = sink.shutdown().await;
            }
            return Err(e);
        }
    };

    info!(
        %peer,
        pattern = %request.name_filter_re,
        datacenters = ?request.datacenter_filter,
        "servers call"
    );

    let watcher = tokio::spawn(watch_peer(reader, call.clone(), config.call_timeout));

    let outcome = authority.servers(&request, &mut sink, &call).await;
    call.cancel();
    let _ = watcher.await;

    match outcome {
        Ok(sent) => {
            debug!(%peer, sent, "call completed");
        }
        Err(e) if e.is_send_failure() => {
            // Nobody left to tell
            debug!(%peer, error = %e, "call aborted");
        }
        Err(e) => {
            info!(%peer, kind = %e.kind(), error = %e, "call failed");
            sink.send_error(e.to_frame()).await?;
        }
    }

    sink.shutdown().await?;
    Ok(())
}

/// Read the single `Servers` request of a call
async fn read_request(reader: &mut OwnedReadHalf, limit: Duration) -> Result<ServersRequest> {
    let mut decoder = FrameDecoder::new();

    tokio::time::timeout(limit, read_servers(reader, &mut decoder))
        .await
        .map_err(|_| ServerError::RequestTimeout(limit))?
}

async fn read_servers(
    reader: &mut OwnedReadHalf,
    decoder: &mut FrameDecoder,
) -> Result<ServersRequest> {
    loop {
        if let Some(msg) = decoder.decode_next()? {
            return match msg {
                Message::Servers(request) => Ok(request),
                other => Err(ServerError::UnexpectedMessage(other.type_name())),
            };
        }

        let n = reader.read_buf(decoder.buffer_mut()).await?;
        if n == 0 {
            return Err(ServerError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before request",
            )));
        }
    }
}

/// Cancel `call` when the client goes away or the deadline passes
///
/// Anything the client sends after its request is discarded.
async fn watch_peer(mut reader: OwnedReadHalf, call: CancellationToken, deadline: Option<Duration>) {
    let expired = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expired);

    let mut scratch = [0u8; 512];
    loop {
        tokio::select! {
            _ = call.cancelled() => return,
            _ = &mut expired => {
                debug!("call deadline expired");
                call.cancel();
                return;
            }
            read = reader.read(&mut scratch) => {
                match read {
                    Ok(0) | Err(_) => {
                        debug!("client closed connection");
                        call.cancel();
                        return;
                    }
                    Ok(_) => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
