//! # Error Definitions

use crate::id::Direction;
use crate::id::MsgId;

/// Failures while encoding or decoding a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Fewer bytes than the message header.
    IncompleteMessage(usize),
    /// The version byte does not match `PROTOCOL_VERSION`.
    VersionMismatch { found: u8, expected: u8 },
    /// The id byte does not name a known message.
    UnknownMessageId(u8),
    /// The frame ended before the static payload did.
    TruncatedPayload { needed: usize, found: usize },
    /// A static payload field holds a value its type cannot represent.
    MalformedPayload { id: MsgId, direction: Direction, detail: &'static str },
    /// Header + static payload + variable data exceeds `MSG_MAX_SIZE`.
    FrameTooLarge { size: usize, max: usize },
    /// A `VarRef` addresses bytes outside the filled variable data.
    RegionOutOfBounds { offset: usize, length: usize, filled: usize },
    /// A region is too large to be described by a `VarRef`.
    RegionTooLarge(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompleteMessage(n) => write!(f, "incomplete message: {} bytes", n),
            Self::VersionMismatch { found, expected } => {
                write!(f, "protocol version mismatch: peer {}, local {}", found, expected)
            }
            Self::UnknownMessageId(id) => write!(f, "unknown message id {}", id),
            Self::TruncatedPayload { needed, found } => {
                write!(f, "truncated payload: need {} bytes, found {}", needed, found)
            }
            Self::MalformedPayload { id, direction, detail } => {
                write!(f, "malformed {:?} {:?} payload: {}", id, direction, detail)
            }
            Self::FrameTooLarge { size, max } => {
                write!(f, "frame of {} bytes exceeds maximum of {}", size, max)
            }
            Self::RegionOutOfBounds { offset, length, filled } => write!(
                f,
                "region {}..{} exceeds variable data length {}",
                offset,
                offset + length,
                filled
            ),
            Self::RegionTooLarge(n) => write!(f, "region of {} bytes cannot be referenced", n),
        }
    }
}

impl std::error::Error for Error {}

/// Specialized `Result` for Duopack operations.
pub type Result<T> = std::result::Result<T, Error>;
