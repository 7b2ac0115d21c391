//! # Duohost
//!
//! The companion side of the bridge: accepts the initiator's two channels,
//! serves requests one at a time, and pushes callbacks whenever a handler asks.
//!
//! ## Architecture
//!
//! - `Registry`: one `Handler` per request id.
//! - `Dispatcher`: accept both peers, then decode, dispatch, respond until the
//!   initiator closes the request channel.
//! - `CallbackEmitter`: the only writer on the callback channel. Cloneable and
//!   usable from any thread a handler spawns.
//! - `fixture`: the bridged functions the `duo-companion` binary serves.

pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod fixture;
pub mod registry;

#[cfg(test)]
mod tests;

pub use dispatch::DispatchState;
pub use dispatch::Dispatcher;
pub use emitter::CallbackEmitter;
pub use error::Error;
pub use error::Result;
pub use registry::Handler;
pub use registry::Registry;
