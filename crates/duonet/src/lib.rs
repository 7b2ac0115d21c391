//! # Duonet
//!
//! Moves whole frames between exactly two peers.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: a `Transport` knows nothing about message ids or payloads.
//!   It moves opaque buffers, one frame per `send`, one frame per `recv`.
//! - **Single Peer**: listeners accept one connection and then stop listening.
//! - **Explicit Boundaries**: TCP frames carry a length prefix, so a read never
//!   depends on the kernel preserving write boundaries.

pub mod channel;
pub mod endpoints;
pub mod tcp;
pub mod transport;

#[cfg(test)]
mod tests;

pub use channel::ChannelTransport;
pub use endpoints::Endpoints;
pub use tcp::Listener;
pub use tcp::TcpTransport;
pub use tcp::connect;
pub use tcp::listen_and_accept;
pub use tcp::loopback;
pub use transport::Error;
pub use transport::Result;
pub use transport::Transport;
