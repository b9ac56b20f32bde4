use async_trait::async_trait;
use mirror_platform::{Transport, TransportError};
use tokio::sync::mpsc;

/// An in-process `Transport` paired with another `LoopbackTransport` —
/// whatever one side sends, the other receives, no socket involved.
pub struct LoopbackTransport {
    tx: mpsc::Sender<Vec<u8>>,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl LoopbackTransport {
    /// Build a connected pair: `(a, b)` where `a.send` is visible to `b.recv`
    /// and vice versa.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (Self { tx: a_tx, rx: a_rx }, Self { tx: b_tx, rx: b_rx })
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.tx.send(data).await.map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
