//! # Callbacks
//!
//! The companion pushes `Callback` messages on a dedicated channel whenever it
//! likes. A background listener decodes them and hands the value to whichever
//! `CallbackHandler` is registered at that moment.

use std::sync::Arc;
use std::sync::RwLock;

use duonet::Transport;
use duopack::Direction;
use duopack::StaticPayload;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Receives values pushed by the companion. Runs on the listener task, so it
/// should return quickly.
pub trait CallbackHandler: Send + Sync + 'static {
    fn on_callback(&self, value: i32);
}

impl<F> CallbackHandler for F
where
    F: Fn(i32) + Send + Sync + 'static,
{
    fn on_callback(&self, value: i32) {
        self(value)
    }
}

/// Forwards callback values into a channel, for consumers that prefer to
/// await values instead of reacting inside the listener.
impl CallbackHandler for mpsc::UnboundedSender<i32> {
    fn on_callback(&self, value: i32) {
        if self.send(value).is_err() {
            debug!("Dropping callback {}: receiver is gone", value);
        }
    }
}

/// Shared home of the current handler. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct CallbackSlot {
    inner: Arc<RwLock<Option<Arc<dyn CallbackHandler>>>>,
}

impl CallbackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, handler: Arc<dyn CallbackHandler>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(handler);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Invokes the current handler outside the lock. Returns false if none is set.
    pub fn dispatch(&self, value: i32) -> bool {
        let handler = self.inner.read().unwrap_or_else(|e| e.into_inner()).clone();
        match handler {
            Some(handler) => {
                handler.on_callback(value);
                true
            }
            None => false,
        }
    }
}

pub fn spawn_listener(transport: Arc<dyn Transport>, slot: CallbackSlot) -> JoinHandle<()> {
    tokio::spawn(listen(transport, slot))
}

/// Drains the callback channel until it closes or fails.
pub async fn listen(transport: Arc<dyn Transport>, slot: CallbackSlot) {
    info!("Start waiting for callbacks");
    loop {
        let frame = match transport.recv().await {
            Ok(frame) => frame,
            Err(duonet::Error::ConnectionClosed) => {
                info!("Stop waiting for callbacks because connection was closed");
                break;
            }
            Err(duonet::Error::FrameTooLarge { size, max }) => {
                warn!("Skipping {} byte callback frame (max {})", size, max);
                continue;
            }
            Err(e) => {
                warn!("Stop waiting for callbacks: {}", e);
                break;
            }
        };

        let message = match duopack::decode(Direction::Response, &frame) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed callback frame: {}", e);
                continue;
            }
        };

        match message.payload {
            StaticPayload::CallbackResponse { value } => {
                debug!("Callback {}", value);
                if !slot.dispatch(value) {
                    debug!("No callback handler registered, dropping {}", value);
                }
            }
            other => debug!("Ignoring {} on callback channel", other.id()),
        }
    }
}
