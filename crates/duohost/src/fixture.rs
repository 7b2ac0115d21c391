//! # Fixture Library
//!
//! The functions `duo-companion` bridges: a boolean inversion, a string
//! concatenation, and a callback sequence driven from a library thread.

use std::time::Duration;

use duopack::Message;
use duopack::MsgId;
use duopack::StaticPayload;
use duopack::VarData;
use tracing::warn;

use crate::emitter::CallbackEmitter;
use crate::error::Error;
use crate::error::Result;
use crate::registry::Registry;

pub const DEFAULT_CALLBACK_COUNT: i32 = 5;
pub const DEFAULT_CALLBACK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureOptions {
    /// Values `0..callbacks` are emitted per `SetCallback`.
    pub callbacks: i32,
    /// Pause after each emitted value.
    pub interval: Duration,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self { callbacks: DEFAULT_CALLBACK_COUNT, interval: DEFAULT_CALLBACK_INTERVAL }
    }
}

/// All fixture functions, keyed by their request ids.
pub fn registry(options: FixtureOptions) -> Result<Registry> {
    Registry::new()
        .with(MsgId::Invert, invert)?
        .with(MsgId::Concat, concat)?
        .with(MsgId::SetCallback, move |request: Message, emitter: &CallbackEmitter| {
            set_callback(request, emitter, options)
        })
}

pub fn invert(request: Message, _: &CallbackEmitter) -> Result<Message> {
    match request.payload {
        StaticPayload::InvertRequest { input } => Ok(Message::new(StaticPayload::InvertResponse { output: !input })),
        other => Err(Error::Handler(format!("invert cannot take {}", other.id()))),
    }
}

/// Joins two C strings with a newline. One trailing NUL is dropped from each
/// input and a single NUL terminates the result.
pub fn concat(request: Message, _: &CallbackEmitter) -> Result<Message> {
    let StaticPayload::ConcatRequest { s1, s2 } = request.payload else {
        return Err(Error::Handler(format!("concat cannot take {}", request.id())));
    };
    let s1 = strip_nul(request.var.get(s1)?);
    let s2 = strip_nul(request.var.get(s2)?);

    let mut joined = Vec::with_capacity(s1.len() + s2.len() + 2);
    joined.extend_from_slice(s1);
    joined.push(b'\n');
    joined.extend_from_slice(s2);
    joined.push(0);

    let mut var = VarData::new();
    let out = var.push(&joined)?;
    Ok(Message::with_var(StaticPayload::ConcatResponse { out }, var))
}

/// Emits `0..options.callbacks` from a separate thread and returns once that
/// thread is done.
pub fn set_callback(request: Message, emitter: &CallbackEmitter, options: FixtureOptions) -> Result<Message> {
    if request.id() != MsgId::SetCallback {
        return Err(Error::Handler(format!("set_callback cannot take {}", request.id())));
    }

    let emitter = emitter.clone();
    let worker = std::thread::spawn(move || {
        for value in 0..options.callbacks {
            if let Err(e) = emitter.emit_blocking(value) {
                warn!("Callback {} not delivered: {}", value, e);
            }
            std::thread::sleep(options.interval);
        }
    });
    worker.join().map_err(|_| Error::Handler("callback thread panicked".to_string()))?;

    Ok(Message::new(StaticPayload::SetCallbackResponse))
}

fn strip_nul(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(&[0]).unwrap_or(bytes)
}
