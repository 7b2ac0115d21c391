//! # Callback Emitter
//!
//! Sends `Callback` messages to the initiator. Every emission holds the channel
//! lock from encode to the end of the send, so concurrent emitters never
//! interleave frames.

use std::sync::Arc;

use duonet::Transport;
use duopack::Message;
use duopack::StaticPayload;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::error::Result;

#[derive(Clone)]
pub struct CallbackEmitter {
    channel: Arc<Mutex<Option<Arc<dyn Transport>>>>,
    runtime: Handle,
}

impl CallbackEmitter {
    /// An emitter with no channel attached. `runtime` drives `emit_blocking`.
    pub fn new(runtime: Handle) -> Self {
        Self { channel: Arc::new(Mutex::new(None)), runtime }
    }

    pub async fn attach(&self, transport: Arc<dyn Transport>) {
        *self.channel.lock().await = Some(transport);
    }

    pub async fn detach(&self) -> Option<Arc<dyn Transport>> {
        self.channel.lock().await.take()
    }

    pub async fn is_attached(&self) -> bool {
        self.channel.lock().await.is_some()
    }

    pub async fn emit(&self, value: i32) -> Result<()> {
        let frame = duopack::encode(&Message::new(StaticPayload::CallbackResponse { value }))?;

        let channel = self.channel.lock().await;
        let transport = channel.as_ref().ok_or(Error::Detached)?;
        transport.send(&frame).await?;
        debug!("Emitted callback {}", value);
        Ok(())
    }

    /// `emit` for threads outside the runtime, such as a bridged library's own
    /// workers. Panics if called from inside an async context.
    pub fn emit_blocking(&self, value: i32) -> Result<()> {
        self.runtime.block_on(self.emit(value))
    }
}
