//! Client for the Authority `Servers` call

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use authority_protocol::{FrameDecoder, Message, ServerMsg, ServersRequest};

use crate::error::ClientError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// One connection to an Authority server
///
/// A connection carries a single call: send the request with
/// [`servers`](Self::servers), then drain [`recv`](Self::recv) until it
/// returns `None` or an error.
#[derive(Debug)]
pub struct AuthorityClient {
    stream: TcpStream,
    decoder: FrameDecoder,
    /// Set once the call has ended either way
    finished: bool,
}

impl AuthorityClient {
    /// Connect to the server at `address` (host:port)
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| ClientError::Connect {
                address: address.to_string(),
                source,
            })?;
        let _ = stream.set_nodelay(true);

        Ok(Self {
            stream,
            decoder: FrameDecoder::new(),
            finished: false,
        })
    }

    /// Send the filter request
    pub async fn servers(&mut self, request: &ServersRequest) -> Result<()> {
        let msg = Message::Servers(request.clone());
        self.stream.write_all(&msg.encode()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Receive the next match
    ///
    /// Returns `Ok(None)` once the server has closed the connection after a
    /// successful call. An `Error` frame from the server becomes
    /// [`ClientError::Remote`]; nothing is returned after it.
    pub async fn recv(&mut self) -> Result<Option<ServerMsg>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(msg) = self.decoder.decode_next()? {
                return match msg {
                    Message::Server(server) => Ok(Some(server)),
                    Message::Error(frame) => {
                        self.finished = true;
                        Err(ClientError::Remote {
                            kind: frame.kind,
                            message: frame.message,
                        })
                    }
                    other => {
                        self.finished = true;
                        Err(ClientError::UnexpectedMessage(other.type_name()))
                    }
                };
            }

            let n = self.stream.read_buf(self.decoder.buffer_mut()).await?;
            if n == 0 {
                self.finished = true;
                if self.decoder.buffered() > 0 {
                    return Err(ClientError::Truncated);
                }
                return Ok(None);
            }
        }
    }

    /// Run a whole call and collect the matching names
    pub async fn collect(mut self, request: &ServersRequest) -> Result<Vec<String>> {
        self.servers(request).await?;

        let mut names = Vec::new();
        while let Some(server) = self.recv().await? {
            names.push(server.name);
        }
        Ok(names)
    }
}
