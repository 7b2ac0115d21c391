//! # Dispatch Loop
//!
//! ```text
//! AwaitingRequestPeer -> AwaitingCallbackPeer -> Serving -> Terminated(code)
//! ```
//!
//! While serving, one request is handled at a time. A bad frame, an id that
//! only travels unsolicited, or a failing handler never ends the loop; only
//! the initiator closing the request channel (or the channel breaking) does.

use std::sync::Arc;

use duonet::Endpoints;
use duonet::Listener;
use duonet::Transport;
use duopack::Direction;
use duopack::Message;
use duopack::MsgId;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::emitter::CallbackEmitter;
use crate::registry::Registry;

/// The initiator closed the request channel.
pub const EXIT_CLEAN: i32 = 0;
/// The request channel failed while serving.
pub const EXIT_TRANSPORT_FAILED: i32 = 1;
/// Binding or accepting the request channel failed.
pub const EXIT_REQUEST_ACCEPT_FAILED: i32 = 2;
/// Binding or accepting the callback channel failed.
pub const EXIT_CALLBACK_ACCEPT_FAILED: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingRequestPeer,
    AwaitingCallbackPeer,
    Serving,
    Terminated(i32),
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    emitter: CallbackEmitter,
    state: DispatchState,
}

impl Dispatcher {
    /// Must be called inside a tokio runtime.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            emitter: CallbackEmitter::new(Handle::current()),
            state: DispatchState::AwaitingRequestPeer,
        }
    }

    pub fn emitter(&self) -> &CallbackEmitter {
        &self.emitter
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Binds both listeners, reports the bound ports through `announce`, accepts
    /// one peer on each, and serves. Returns the process exit code.
    pub async fn run(&mut self, endpoints: Endpoints, announce: impl FnOnce(Endpoints)) -> i32 {
        self.state = DispatchState::AwaitingRequestPeer;

        let request_listener = match Listener::bind(endpoints.request_addr()).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                return self.terminate(EXIT_REQUEST_ACCEPT_FAILED);
            }
        };
        let callback_listener = match Listener::bind(endpoints.callback_addr()).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                return self.terminate(EXIT_CALLBACK_ACCEPT_FAILED);
            }
        };

        let bound = Endpoints::new(request_listener.local_addr().port(), callback_listener.local_addr().port());
        info!("Listening on {}", bound);
        announce(bound);

        let requests = match request_listener.accept_one().await {
            Ok(transport) => transport,
            Err(e) => {
                error!("{}", e);
                return self.terminate(EXIT_REQUEST_ACCEPT_FAILED);
            }
        };
        info!("Request channel connected to {}", requests.peer_addr());

        self.state = DispatchState::AwaitingCallbackPeer;
        let callbacks = match callback_listener.accept_one().await {
            Ok(transport) => transport,
            Err(e) => {
                error!("{}", e);
                if let Err(e) = requests.close().await {
                    debug!("Closing request channel: {}", e);
                }
                return self.terminate(EXIT_CALLBACK_ACCEPT_FAILED);
            }
        };
        info!("Callback channel connected to {}", callbacks.peer_addr());

        self.emitter.attach(Arc::new(callbacks)).await;
        self.serve(Arc::new(requests)).await
    }

    /// Serves requests from `requests` until it closes. The emitter should
    /// already have a callback channel attached.
    pub async fn serve(&mut self, requests: Arc<dyn Transport>) -> i32 {
        self.state = DispatchState::Serving;

        let code = loop {
            let frame = match requests.recv().await {
                Ok(frame) => frame,
                Err(duonet::Error::ConnectionClosed) => {
                    info!("Request channel closed by initiator");
                    break EXIT_CLEAN;
                }
                Err(duonet::Error::FrameTooLarge { size, max }) => {
                    warn!("Skipping {} byte request (max {})", size, max);
                    continue;
                }
                Err(e) => {
                    error!("Request channel failed: {}", e);
                    break EXIT_TRANSPORT_FAILED;
                }
            };

            let Some(response) = self.dispatch(&frame).await else {
                continue;
            };
            if let Err(e) = requests.send(&response).await {
                error!("Cannot send response: {}", e);
            }
        };

        if let Err(e) = requests.close().await {
            debug!("Closing request channel: {}", e);
        }
        if let Some(callbacks) = self.emitter.detach().await {
            if let Err(e) = callbacks.close().await {
                debug!("Closing callback channel: {}", e);
            }
        }
        self.terminate(code)
    }

    /// Turns one request frame into a response frame. `None` means the frame is
    /// dropped without an answer.
    pub async fn dispatch(&self, frame: &[u8]) -> Option<Vec<u8>> {
        let request = match duopack::decode(Direction::Request, frame) {
            Ok(request) => request,
            Err(e) => {
                warn!("Dropping malformed request: {}", e);
                return None;
            }
        };

        let id = request.id();
        if id.is_unsolicited() {
            warn!("Rejecting {} sent as a request", id);
            return None;
        }
        debug!("Handling {}", id);

        let response = self.invoke(id, request).await;
        match duopack::encode(&response) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!("Cannot encode response for {}: {}", id, e);
                duopack::encode(&Message::zeroed(id, Direction::Response)).ok()
            }
        }
    }

    /// Runs the handler on the blocking pool. Any failure is answered with a
    /// zeroed response so the initiator is never left waiting.
    async fn invoke(&self, id: MsgId, request: Message) -> Message {
        let Some(handler) = self.registry.get(id) else {
            warn!("No handler registered for {}", id);
            return Message::zeroed(id, Direction::Response);
        };

        let emitter = self.emitter.clone();
        let outcome = tokio::task::spawn_blocking(move || handler.invoke(request, &emitter)).await;
        match outcome {
            Ok(Ok(response)) if response.id() == id && response.direction() == Direction::Response => response,
            Ok(Ok(response)) => {
                error!("Handler for {} answered with {} {:?}", id, response.id(), response.direction());
                Message::zeroed(id, Direction::Response)
            }
            Ok(Err(e)) => {
                error!("Handler for {} failed: {}", id, e);
                Message::zeroed(id, Direction::Response)
            }
            Err(e) => {
                error!("Handler for {} panicked: {}", id, e);
                Message::zeroed(id, Direction::Response)
            }
        }
    }

    fn terminate(&mut self, code: i32) -> i32 {
        info!("Dispatcher terminated with code {}", code);
        self.state = DispatchState::Terminated(code);
        code
    }
}
