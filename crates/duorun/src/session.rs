//! # Session
//!
//! Keeps a companion process running with both channels connected.
//!
//! ## Lifecycle
//!
//! Every call first runs `ensure_ready`:
//!
//! 1. If the companion is not running (never started, or exited), launch it.
//!    A companion still running without a request channel is killed and
//!    relaunched: it accepts a single request peer, so it cannot be reconnected.
//! 2. If it was just launched, connect the request channel.
//! 3. If it was just launched, or the callback listener has finished, join the old
//!    listener, connect the callback channel and start a new listener.
//!
//! The request channel is dropped whenever an exchange fails, times out, or is
//! cancelled, so the next call after any of these talks to a fresh companion.
//! `shutdown` closes the request channel, which ends the companion's serve loop,
//! then waits for the process and the listener.

use std::sync::Arc;

use duonet::Transport;
use duopack::Message;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::callback::CallbackHandler;
use crate::callback::CallbackSlot;
use crate::callback::spawn_listener;
use crate::config::SessionConfig;
use crate::error::Error;
use crate::error::Result;
use crate::exchange::RequestChannel;
use crate::launcher::Companion;
use crate::launcher::describe_exit;

#[derive(Default)]
struct SessionState {
    companion: Option<Companion>,
    listener: Option<JoinHandle<()>>,
    closed: bool,
}

pub struct Session {
    config: SessionConfig,
    state: Mutex<SessionState>,
    requests: RequestChannel,
    callbacks: CallbackSlot,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let requests = RequestChannel::new(config.exchange_timeout);
        Self { config, state: Mutex::new(SessionState::default()), requests, callbacks: CallbackSlot::new() }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &CallbackSlot {
        &self.callbacks
    }

    pub fn set_callback_handler(&self, handler: Arc<dyn CallbackHandler>) {
        self.callbacks.set(handler);
    }

    /// Process id of the running companion, if any.
    pub async fn companion_pid(&self) -> Option<u32> {
        self.state.lock().await.companion.as_ref().and_then(|c| c.id())
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Starts or restarts whatever part of the session is not running.
    pub async fn ensure_ready(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(Error::SessionClosed);
        }

        let mut running = match state.companion.as_mut() {
            Some(companion) => match companion.try_exit_status()? {
                None => true,
                Some(status) => {
                    info!("Companion exited with {}", describe_exit(Some(status)));
                    false
                }
            },
            None => false,
        };

        if running && !self.requests.is_connected() {
            if let Some(companion) = state.companion.as_mut() {
                warn!("Companion {:?} lost its request channel, restarting it", companion.id());
                companion.kill().await;
            }
            running = false;
        }

        let restarted = !running;
        if restarted {
            state.companion = None;
            self.requests.detach();
            state.companion = Some(Companion::launch(&self.config).await?);
        }

        let Some(endpoints) = state.companion.as_ref().map(|c| c.endpoints()) else {
            return Err(Error::NotConnected);
        };

        if restarted {
            debug!("Connecting request channel to {}", endpoints.request_addr());
            let transport = duonet::connect(endpoints.request_addr()).await?;
            self.requests.attach(Arc::new(transport));
        }

        let listening = state.listener.as_ref().is_some_and(|h| !h.is_finished());
        if restarted || !listening {
            if let Some(old) = state.listener.take() {
                if let Err(e) = old.await {
                    warn!("Callback listener ended abnormally: {}", e);
                }
            }
            debug!("Connecting callback channel to {}", endpoints.callback_addr());
            let transport: Arc<dyn Transport> = Arc::new(duonet::connect(endpoints.callback_addr()).await?);
            state.listener = Some(spawn_listener(transport, self.callbacks.clone()));
        }

        Ok(())
    }

    /// Exchanges on the current request channel without checking the companion.
    pub async fn exchange(&self, request: &Message) -> Result<Message> {
        self.requests.exchange(request).await
    }

    /// `ensure_ready` followed by one exchange.
    pub async fn call(&self, request: &Message) -> Result<Message> {
        self.ensure_ready().await?;
        self.exchange(request).await
    }

    /// Closes both channels and waits for the companion to exit. Later calls fail
    /// with `SessionClosed`. A second shutdown does nothing.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.closed {
            debug!("Session already shut down");
            return;
        }
        state.closed = true;
        info!("Shutting down session");

        self.requests.close();
        let transport = self.requests.detach();
        if let Some(transport) = &transport {
            if let Err(e) = transport.close().await {
                warn!("Cannot close request channel: {}", e);
            }
        }

        if let Some(mut companion) = state.companion.take() {
            if transport.is_none() {
                // nothing left to signal a clean exit with
                debug!("Companion {:?} has no request channel, killing it", companion.id());
                companion.kill().await;
            }
            match companion.wait().await {
                Ok(status) => info!("Companion exited with {}", describe_exit(Some(status))),
                Err(e) => warn!("{}", e),
            }
        }

        if let Some(listener) = state.listener.take() {
            if let Err(e) = listener.await {
                warn!("Callback listener ended abnormally: {}", e);
            }
        }
    }
}
