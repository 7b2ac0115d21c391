//! # Duopack
//!
//! The wire format spoken between an initiator and its companion process.
//!
//! ## Format
//!
//! ```text
//! [version: 1][id: 1][static payload: fixed per (id, direction)][variable data: rest]
//! ```
//!
//! - **Shape-aware**: the static payload size is never transmitted. It is looked up
//!   from the `(MsgId, Direction)` pair, so both peers must agree on `PROTOCOL_VERSION`.
//! - **Packed**: static payloads have no padding. All integers are Little-Endian.
//! - **Referenced**: variable-length data is addressed by `VarRef` pairs embedded in
//!   the static payload, always relative to the start of the variable data.

mod error;
mod id;
mod message;
mod payload;
mod var;


pub use error::Error;
pub use error::Result;
pub use id::Direction;
pub use id::MsgId;
pub use message::Message;
pub use message::decode;
pub use message::encode;
pub use payload::StaticPayload;
pub use var::VarData;
pub use var::VarRef;

/// Version number of the message protocol.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of the message header (version byte + id byte).
pub const MSG_HEADER_SIZE: usize = 2;

/// Maximum size of one serialized message.
pub const MSG_MAX_SIZE: usize = 2048;
