//! # Bridge
//!
//! One method per bridged function. Each call makes sure the companion is up,
//! exchanges exactly one request, and decodes the result.

use std::sync::Arc;

use tracing::debug;

use crate::callback::CallbackHandler;
use crate::calls;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

#[derive(Clone)]
pub struct Bridge {
    session: Arc<Session>,
}

impl Bridge {
    pub fn new(config: SessionConfig) -> Self {
        Self { session: Arc::new(Session::new(config)) }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn invert(&self, input: bool) -> Result<bool> {
        let response = self.session.call(&calls::invert_request(input)).await?;
        calls::invert_result(&response)
    }

    /// Returns the companion's concatenation of `s1` and `s2`.
    pub async fn concat(&self, s1: &[u8], s2: &[u8]) -> Result<Vec<u8>> {
        let request = calls::concat_request(s1, s2)?;
        let response = self.session.call(&request).await?;
        Ok(calls::concat_result(&response)?.to_vec())
    }

    /// Like `concat`, but writes into `out`. Fails with `OutputTooSmall` rather
    /// than truncating.
    pub async fn concat_into(&self, s1: &[u8], s2: &[u8], out: &mut [u8]) -> Result<usize> {
        let request = calls::concat_request(s1, s2)?;
        let response = self.session.call(&request).await?;
        calls::concat_result_into(&response, out)
    }

    /// Registers `handler`, then asks the companion to start its callback sequence.
    /// Callbacks may arrive before this returns.
    pub async fn set_callback(&self, handler: impl CallbackHandler) -> Result<()> {
        self.session.ensure_ready().await?;
        // registered first: the companion starts emitting before it answers
        self.session.set_callback_handler(Arc::new(handler));
        debug!("Callback handler registered");

        let response = self.session.exchange(&calls::set_callback_request()).await?;
        calls::set_callback_result(&response)
    }

    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
