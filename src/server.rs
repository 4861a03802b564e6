//! TCP server for BMI requests.
//!
//! Accepts connections and hands each one to its own task. A connection
//! carries exactly one exchange: one bounded read, at most one response,
//! then the socket is closed.

use crate::config::Config;
use crate::processor;
use crate::protocol::{self, Response, MAX_MESSAGE_SIZE};
use bytes::BytesMut;
use std::future::Future;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace, warn};

/// Per-connection limits, copied into every connection task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionSettings {
    /// Upper bound of the single read
    pub read_budget: usize,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl From<&Config> for ConnectionSettings {
    fn from(config: &Config) -> Self {
        ConnectionSettings {
            read_budget: MAX_MESSAGE_SIZE,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }
}

/// How a connection ended when no error occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Peer closed the connection without sending anything. Nothing is sent back.
    Disconnected,
    /// Exactly one response was written.
    Replied(Response),
}

/// Connection-level errors. These end the connection without a reply.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timed out waiting for request")]
    ReadTimeout,
    #[error("timed out writing response")]
    WriteTimeout,
}

/// Server instance
pub struct Server {
    listener: TcpListener,
    settings: ConnectionSettings,
}

impl Server {
    /// Bind the configured address. Must be called from within a Tokio
    /// runtime. Bind failures are reported here, before any accept.
    pub fn bind(config: &Config) -> io::Result<Self> {
        let addr = resolve(&config.listen)?;
        let listener = TcpListener::from_std(create_listener(addr, config.backlog)?)?;

        Ok(Server {
            listener,
            settings: ConnectionSettings::from(config),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process ends.
    ///
    /// Each accepted connection runs in a detached task. A failed accept is
    /// logged and the loop keeps going.
    pub async fn run(self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "Server listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");

                    let settings = self.settings;
                    tokio::spawn(async move {
                        match handle_connection(stream, &settings).await {
                            Ok(Outcome::Disconnected) => {
                                debug!(peer = %peer, "Client closed without sending data");
                            }
                            Ok(Outcome::Replied(response)) => {
                                debug!(peer = %peer, response = response.kind(), "Response sent");
                            }
                            Err(e) => {
                                debug!(peer = %peer, error = %e, "Connection error");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Handle a single client connection.
///
/// The stream is owned here and dropped on return, so every path closes it
/// exactly once.
pub async fn handle_connection<S>(
    mut stream: S,
    settings: &ConnectionSettings,
) -> Result<Outcome, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::zeroed(settings.read_budget);

    let n = with_deadline(settings.read_timeout, stream.read(&mut buffer[..]))
        .await
        .ok_or(ConnectionError::ReadTimeout)??;
    if n == 0 {
        return Ok(Outcome::Disconnected);
    }
    buffer.truncate(n);
    trace!(bytes = n, "Request received");

    let response = respond(&buffer);
    let payload = protocol::encode(&response)?;

    with_deadline(settings.write_timeout, async {
        stream.write_all(&payload).await?;
        stream.shutdown().await
    })
    .await
    .ok_or(ConnectionError::WriteTimeout)??;

    Ok(Outcome::Replied(response))
}

/// Build the response for one raw request payload.
pub fn respond(payload: &[u8]) -> Response {
    match protocol::decode_request(payload) {
        Ok(request) => processor::process(&request),
        Err(e) if e.is_malformed() => {
            warn!(error = %e, "Invalid message format");
            Response::invalid_format()
        }
        Err(e) => {
            debug!(error = %e, "Request is not a record");
            processor::processing_error(e)
        }
    }
}

/// Run `future` under an optional deadline. `None` means it expired.
async fn with_deadline<F: Future>(limit: Option<Duration>, future: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

fn resolve(listen: &str) -> io::Result<SocketAddr> {
    listen.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("no address found for '{listen}'"),
        )
    })
}

/// Create a non-blocking TCP listener with SO_REUSEADDR.
fn create_listener(addr: SocketAddr, backlog: u32) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog.min(i32::MAX as u32) as i32)?;

    Ok(socket.into())
}
