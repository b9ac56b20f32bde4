use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("io error: {0}")]
    Io(String),
}

/// A persistent, ordered, bidirectional message-oriented channel.
///
/// Conceptually a WebSocket: each `send` produces exactly one whole message
/// on the wire and each `recv` yields one whole message back. `mirror-core`
/// never assumes framing below this — it hands `Transport` already-complete
/// binary frames produced by the wire codec.
#[async_trait]
pub trait Transport: Send {
    /// Send one complete binary message.
    async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Receive one complete binary message, or `None` if the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Tear down the underlying connection. Idempotent.
    async fn close(&mut self);
}

/// Produces a freshly connected [`Transport`] on demand.
///
/// Reconnection logic in `mirror-core` is driven against this trait rather
/// than against a concrete dialer, so the backoff/retry state machine can be
/// unit tested with a fake connector that never touches a socket.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;
}
