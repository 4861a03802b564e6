//! One-shot client: connect, send one request, read one response.

use crate::protocol::{self, DecodeError, Request, Response, MAX_MESSAGE_SIZE};
use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("timed out talking to the server")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no response received from the server")]
    NoResponse,
    #[error("invalid response: {0}")]
    Decode(#[from] DecodeError),
}

impl ClientError {
    /// True when nothing was listening at the server address.
    pub fn is_refused(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { source, .. } if source.kind() == io::ErrorKind::ConnectionRefused
        )
    }
}

/// Client for a BMI server at a fixed address
#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    timeout: Option<Duration>,
}

impl Client {
    /// `timeout` bounds each step (connect, write, read); `None` waits forever.
    pub fn new(addr: impl Into<String>, timeout: Option<Duration>) -> Self {
        Client {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Perform one request/response exchange on a fresh connection.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let payload = protocol::encode(request)?;

        debug!(addr = %self.addr, "Connecting");
        let mut stream = self
            .step(TcpStream::connect(self.addr.as_str()))
            .await?
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        self.step(stream.write_all(&payload)).await??;

        let mut buffer = BytesMut::zeroed(MAX_MESSAGE_SIZE);
        let n = self.step(stream.read(&mut buffer[..])).await??;
        if n == 0 {
            return Err(ClientError::NoResponse);
        }
        debug!(bytes = n, "Response received");

        Ok(protocol::decode(&buffer[..n])?)
    }

    async fn step<F: std::future::Future>(&self, future: F) -> Result<F::Output, ClientError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| ClientError::Timeout),
            None => Ok(future.await),
        }
    }
}
