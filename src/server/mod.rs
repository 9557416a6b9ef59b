pub mod codec;

use async_trait::async_trait;
use log::*;
use std::{fmt, io, time::Duration};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};


const REPLY_BUFFER_SIZE: usize = 4096;

/// Where the game server lives. Validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("could not connect: {0}")]
    ConnectFailure(#[source] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("server closed the connection without replying")]
    EmptyReply,
    #[error("reply contained no status fields")]
    MalformedReply,
}

impl QueryError {
    /// The annotation shown to readers when this failure takes the server offline.
    pub fn offline_message(&self) -> &'static str {
        match self {
            QueryError::ConnectFailure(_) | QueryError::Timeout(_) => "Unable to connect to server",
            QueryError::EmptyReply => "Server is offline",
            QueryError::MalformedReply => "Malformed response from server",
        }
    }

    /// Extra detail for failures that never reached the game protocol.
    pub fn detail(&self) -> Option<String> {
        match self {
            QueryError::ConnectFailure(_) | QueryError::Timeout(_) => Some(self.to_string()),
            QueryError::EmptyReply | QueryError::MalformedReply => None,
        }
    }
}

#[async_trait]
pub trait ServerConnection: Send + Sync {
    /// One status query over a fresh connection, returning the raw reply bytes.
    async fn query(&self, target: &UpstreamTarget, timeout: Duration) -> Result<Vec<u8>, QueryError>;
}

/// Talks to the real game server over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealServerConnection;

#[async_trait]
impl ServerConnection for RealServerConnection {
    async fn query(&self, target: &UpstreamTarget, timeout: Duration) -> Result<Vec<u8>, QueryError> {
        debug!("querying {}", target);
        // The stream is dropped, and so closed, on every return below.
        let mut stream = time::timeout(
            timeout,
            TcpStream::connect((target.host.as_str(), target.port)),
        )
        .await
        .map_err(|_| QueryError::Timeout(timeout))?
        .map_err(QueryError::ConnectFailure)?;

        let request = codec::encode(codec::STATUS_COMMAND);
        time::timeout(timeout, stream.write_all(&request))
            .await
            .map_err(|_| QueryError::Timeout(timeout))?
            .map_err(QueryError::ConnectFailure)?;
        debug!("sent {} bytes to {}", request.len(), target);

        let mut buffer = vec![0u8; REPLY_BUFFER_SIZE];
        let bytes_read = time::timeout(timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| QueryError::Timeout(timeout))?
            .map_err(QueryError::ConnectFailure)?;
        debug!("received {} bytes from {}", bytes_read, target);

        if bytes_read == 0 {
            return Err(QueryError::EmptyReply);
        }
        buffer.truncate(bytes_read);
        Ok(buffer)
    }
}
