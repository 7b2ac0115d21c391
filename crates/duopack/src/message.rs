//! # Messages
//!
//! The unit of exchange, and its conversion to and from a flat frame.
//!
//! ## Invariants
//! - **Size Bound**: `encode` never produces more than `MSG_MAX_SIZE` bytes.
//! - **Version Gate**: `decode` trusts nothing past a mismatched version byte.
//! - **No Semantic Checks**: embedded `VarRef`s are validated on access, not on decode.

use crate::MSG_HEADER_SIZE;
use crate::MSG_MAX_SIZE;
use crate::PROTOCOL_VERSION;
use crate::error::Error;
use crate::error::Result;
use crate::id::Direction;
use crate::id::MsgId;
use crate::payload::StaticPayload;
use crate::var::VarData;

/// A message: a static payload, which fixes `(id, direction)`, plus its variable data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: StaticPayload,
    pub var: VarData,
}

impl Message {
    /// A message with no variable data.
    pub fn new(payload: StaticPayload) -> Self {
        Self { payload, var: VarData::new() }
    }

    pub fn with_var(payload: StaticPayload, var: impl Into<VarData>) -> Self {
        Self { payload, var: var.into() }
    }

    /// A zeroed message for `(id, direction)`.
    pub fn zeroed(id: MsgId, direction: Direction) -> Self {
        Self::new(StaticPayload::zeroed(id, direction))
    }

    pub fn id(&self) -> MsgId {
        self.payload.id()
    }

    pub fn direction(&self) -> Direction {
        self.payload.direction()
    }

    /// Header + static payload + variable data.
    pub fn encoded_len(&self) -> usize {
        MSG_HEADER_SIZE + self.payload.size() + self.var.len()
    }
}

/// Serializes `message` into one frame.
///
/// # Errors
/// Returns `Error::FrameTooLarge` if the frame would exceed `MSG_MAX_SIZE`.
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    let size = message.encoded_len();
    if size > MSG_MAX_SIZE {
        return Err(Error::FrameTooLarge { size, max: MSG_MAX_SIZE });
    }

    let mut buf = Vec::with_capacity(size);
    buf.push(PROTOCOL_VERSION);
    buf.push(message.id().as_u8());
    message.payload.write(&mut buf);
    buf.extend_from_slice(message.var.as_bytes());

    debug_assert_eq!(buf.len(), size);
    Ok(buf)
}

/// Parses one frame travelling in `direction`.
///
/// Everything after the static payload is taken as variable data.
pub fn decode(direction: Direction, bytes: &[u8]) -> Result<Message> {
    if bytes.len() < MSG_HEADER_SIZE {
        return Err(Error::IncompleteMessage(bytes.len()));
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(Error::VersionMismatch { found: version, expected: PROTOCOL_VERSION });
    }

    let id = MsgId::from_u8(bytes[1]).ok_or(Error::UnknownMessageId(bytes[1]))?;

    let body = &bytes[MSG_HEADER_SIZE..];
    let static_size = id.static_size(direction);
    if body.len() < static_size {
        return Err(Error::TruncatedPayload { needed: static_size, found: body.len() });
    }

    let (static_bytes, var_bytes) = body.split_at(static_size);
    let payload = StaticPayload::read(id, direction, static_bytes)?;

    Ok(Message { payload, var: VarData::from(var_bytes) })
}
