//! In-memory transport.
//!
//! Used by tests to drive the call layer and the dispatch loop without sockets.

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::transport::Error;
use crate::transport::Result;
use crate::transport::Transport;

/// A duplex channel transport using tokio mpsc channels.
///
/// Frames sent on one end appear on the other end's `recv()` and vice versa.
/// Closing one end makes the other end's `recv()` return `ConnectionClosed`
/// once buffered frames are drained.
pub struct ChannelTransport {
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl ChannelTransport {
    /// Creates a pair of transports connected to each other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();

        let a = Self {
            tx: Mutex::new(Some(tx_a)),
            rx: Mutex::new(rx_b),
        };

        let b = Self {
            tx: Mutex::new(Some(tx_b)),
            rx: Mutex::new(rx_a),
        };

        (a, b)
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(Error::ConnectionLost("send after close".into()));
        };
        tx.send(payload.to_vec())
            .map_err(|_| Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> Result<Vec<u8>> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(Error::ConnectionClosed)
    }

    async fn close(&self) -> Result<()> {
        self.tx.lock().await.take();
        Ok(())
    }
}
