//! Client error types.

use thiserror::Error;

use crate::protocol::ResponseFrame;

/// Errors surfaced by [`Client`](super::Client) operations.
///
/// Malformed response bodies are not errors: they degrade to an empty field
/// map and keep the raw text.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No live connection; nothing was written.
    #[error("Not connected")]
    NotConnected,

    /// Failed to open the transport.
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] std::io::Error),

    /// The peer did not greet with the daemon banner.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The daemon rejected the command. Carries the full frame so callers
    /// can inspect the error text.
    #[error("Command failed: {}", .0.status())]
    Ack(ResponseFrame),

    /// The connection went away before the response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error while writing to the transport.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl ClientError {
    /// The daemon's response, for `Ack` failures.
    pub fn frame(&self) -> Option<&ResponseFrame> {
        match self {
            ClientError::Ack(frame) => Some(frame),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused => {
                ClientError::ConnectionFailed(err)
            }
            _ => ClientError::Io(err),
        }
    }
}
