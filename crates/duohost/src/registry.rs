//! # Handler Registry
//!
//! Maps each request id to the bridged function that answers it. Payload sizes
//! come from the codec, so a handler only turns a decoded request into a response.

use std::collections::HashMap;
use std::sync::Arc;

use duopack::Message;
use duopack::MsgId;

use crate::emitter::CallbackEmitter;
use crate::error::Error;
use crate::error::Result;

/// A bridged function. Runs on a blocking thread and may block, spawn threads,
/// and emit callbacks through `emitter` while it runs.
pub trait Handler: Send + Sync + 'static {
    /// Must answer with a response carrying the request's id. A bridged
    /// function reports its own failures as `Error::Handler`.
    fn invoke(&self, request: Message, emitter: &CallbackEmitter) -> Result<Message>;
}

impl<F> Handler for F
where
    F: Fn(Message, &CallbackEmitter) -> Result<Message> + Send + Sync + 'static,
{
    fn invoke(&self, request: Message, emitter: &CallbackEmitter) -> Result<Message> {
        self(request, emitter)
    }
}

#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<MsgId, Arc<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: MsgId, handler: impl Handler) -> Result<()> {
        if id.is_unsolicited() {
            return Err(Error::UnsolicitedId(id));
        }
        if self.handlers.contains_key(&id) {
            return Err(Error::DuplicateHandler(id));
        }
        self.handlers.insert(id, Arc::new(handler));
        Ok(())
    }

    /// Builder form of `register`.
    pub fn with(mut self, id: MsgId, handler: impl Handler) -> Result<Self> {
        self.register(id, handler)?;
        Ok(self)
    }

    pub fn get(&self, id: MsgId) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&id).cloned()
    }

    pub fn contains(&self, id: MsgId) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
