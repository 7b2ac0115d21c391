//! # Request Channel
//!
//! Strict request/response over a single transport. At most one exchange is in
//! flight, so a response is always the answer to the request just sent.

use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use duonet::Transport;
use duopack::Direction;
use duopack::Message;
use tokio::sync::Semaphore;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;

pub struct RequestChannel {
    gate: Semaphore,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    timeout: Option<Duration>,
}

impl RequestChannel {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { gate: Semaphore::new(1), transport: RwLock::new(None), timeout }
    }

    /// Replaces the transport. Exchanges already in flight finish on the old one.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        *self.transport.write().unwrap_or_else(|e| e.into_inner()) = Some(transport);
    }

    pub fn detach(&self) -> Option<Arc<dyn Transport>> {
        self.transport.write().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Refuses every later exchange.
    pub fn close(&self) {
        self.gate.close();
    }

    fn current(&self) -> Option<Arc<dyn Transport>> {
        self.transport.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Detaches `broken` unless a newer transport has already replaced it.
    fn discard(&self, broken: &Arc<dyn Transport>) {
        let mut slot = self.transport.write().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|t| Arc::ptr_eq(t, broken)) {
            *slot = None;
        }
    }

    /// Sends `request` and waits for the response carrying the same id.
    pub async fn exchange(&self, request: &Message) -> Result<Message> {
        if request.direction() != Direction::Request {
            return Err(Error::NotARequest(request.id()));
        }
        let frame = duopack::encode(request)?;

        let _permit = self.gate.acquire().await.map_err(|_| Error::SessionClosed)?;
        let transport = self.current().ok_or(Error::NotConnected)?;
        // declared after the permit, so a dropped exchange detaches before the next one starts
        let mut in_flight = InFlight { channel: self, transport: transport.clone(), settled: false };

        debug!("Sending message {}", request.id());
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, roundtrip(transport.as_ref(), &frame)).await {
                Ok(outcome) => outcome.map_err(Error::from),
                Err(_) => Err(Error::Timeout),
            },
            None => roundtrip(transport.as_ref(), &frame).await.map_err(Error::from),
        };

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Exchange for {} failed: {}", request.id(), e);
                return Err(e);
            }
        };
        in_flight.settled = true;

        let response = duopack::decode(Direction::Response, &bytes)?;
        if response.id() != request.id() {
            error!("Waiting for response to {}, but received {}", request.id(), response.id());
            return Err(Error::UnexpectedResponseId { expected: request.id(), received: response.id() });
        }

        debug!("Received response for {}", response.id());
        Ok(response)
    }
}

/// Detaches the transport when dropped before its exchange settled. A response
/// still owed on it would otherwise be read as the answer to the next request.
struct InFlight<'a> {
    channel: &'a RequestChannel,
    transport: Arc<dyn Transport>,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Detaching request channel with an unsettled exchange");
            self.channel.discard(&self.transport);
        }
    }
}

async fn roundtrip(transport: &dyn Transport, frame: &[u8]) -> duonet::Result<Vec<u8>> {
    transport.send(frame).await?;
    transport.recv().await
}
