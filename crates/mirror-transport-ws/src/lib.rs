//! WebSocket binding of [`mirror_platform::Transport`]/[`mirror_platform::Connector`].
//!
//! Grounded on the teacher's `connection.rs`, which dials with
//! `tokio_tungstenite::connect_async` and pumps `WsMessage::Binary` frames
//! in and out of an `mpsc` channel pair. This crate narrows that down to
//! just the socket plumbing; the reconnect loop and channel wiring now live
//! in `mirror-core::connection`, generalized behind the `Connector` trait.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use mirror_platform::{Connector, Transport, TransportError};

/// Dials a single WebSocket URL. One instance is handed to
/// `mirror_core::connection::spawn_connection` and reused across every
/// reconnect attempt.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

type InnerStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsTransport {
    stream: InnerStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.stream
            .send(WsMessage::Binary(data.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(WsMessage::Binary(data))) => return Ok(Some(data.to_vec())),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(WsMessage::Text(_))) | Some(Ok(WsMessage::Frame(_))) => continue,
                Some(Ok(WsMessage::Close(_))) => return Ok(None),
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("error closing websocket: {}", e);
        }
    }
}
