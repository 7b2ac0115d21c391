//! # Duorun
//!
//! The initiating side of the bridge. Owns the companion process, both channels
//! to it, and the background task that delivers callbacks.
//!
//! ## Architecture
//!
//! - `Session`: lifecycle of the companion and its two channels. Every call goes
//!   through `Session::ensure_ready` first.
//! - `RequestChannel`: one request/response exchange in flight at a time.
//! - `callback`: the listener task draining the callback channel into a `CallbackHandler`.
//! - `Bridge`: one typed method per bridged function.

pub mod bridge;
pub mod callback;
pub mod calls;
pub mod config;
pub mod error;
pub mod exchange;
pub mod launcher;
pub mod logging;
pub mod session;


pub use bridge::Bridge;
pub use callback::CallbackHandler;
pub use config::CompanionLocator;
pub use config::SessionConfig;
pub use error::Error;
pub use error::Result;
pub use exchange::RequestChannel;
pub use session::Session;
