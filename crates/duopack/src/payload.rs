//! # Static Payloads
//!
//! One variant per `(MsgId, Direction)` pair, each with a fixed, packed byte layout.
//!
//! | variant | layout |
//! |---|---|
//! | `InvertRequest` | `[input: u8]` |
//! | `InvertResponse` | `[output: u8]` |
//! | `ConcatRequest` | `[s1: VarRef][s2: VarRef]` |
//! | `ConcatResponse` | `[out: VarRef]` |
//! | `CallbackRequest` | empty |
//! | `CallbackResponse` | `[value: i32 LE]` |
//! | `SetCallbackRequest` | empty |
//! | `SetCallbackResponse` | empty |

use crate::error::Error;
use crate::error::Result;
use crate::id::Direction;
use crate::id::MsgId;
use crate::var::VAR_REF_SIZE;
use crate::var::VarRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticPayload {
    InvertRequest { input: bool },
    InvertResponse { output: bool },
    ConcatRequest { s1: VarRef, s2: VarRef },
    ConcatResponse { out: VarRef },
    /// Never dispatched; exists so every id parses in both directions.
    CallbackRequest,
    CallbackResponse { value: i32 },
    SetCallbackRequest,
    SetCallbackResponse,
}

impl StaticPayload {
    /// The all-zero payload for `(id, direction)`.
    pub fn zeroed(id: MsgId, direction: Direction) -> Self {
        match (id, direction) {
            (MsgId::Invert, Direction::Request) => Self::InvertRequest { input: false },
            (MsgId::Invert, Direction::Response) => Self::InvertResponse { output: false },
            (MsgId::Concat, Direction::Request) => Self::ConcatRequest {
                s1: VarRef::default(),
                s2: VarRef::default(),
            },
            (MsgId::Concat, Direction::Response) => Self::ConcatResponse { out: VarRef::default() },
            (MsgId::Callback, Direction::Request) => Self::CallbackRequest,
            (MsgId::Callback, Direction::Response) => Self::CallbackResponse { value: 0 },
            (MsgId::SetCallback, Direction::Request) => Self::SetCallbackRequest,
            (MsgId::SetCallback, Direction::Response) => Self::SetCallbackResponse,
        }
    }

    pub fn id(&self) -> MsgId {
        match self {
            Self::InvertRequest { .. } | Self::InvertResponse { .. } => MsgId::Invert,
            Self::ConcatRequest { .. } | Self::ConcatResponse { .. } => MsgId::Concat,
            Self::CallbackRequest | Self::CallbackResponse { .. } => MsgId::Callback,
            Self::SetCallbackRequest | Self::SetCallbackResponse => MsgId::SetCallback,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::InvertRequest { .. }
            | Self::ConcatRequest { .. }
            | Self::CallbackRequest
            | Self::SetCallbackRequest => Direction::Request,
            Self::InvertResponse { .. }
            | Self::ConcatResponse { .. }
            | Self::CallbackResponse { .. }
            | Self::SetCallbackResponse => Direction::Response,
        }
    }

    /// Wire size of this payload.
    pub fn size(&self) -> usize {
        self.id().static_size(self.direction())
    }

    /// Appends the packed layout to `buf`.
    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Self::InvertRequest { input } => buf.push(*input as u8),
            Self::InvertResponse { output } => buf.push(*output as u8),
            Self::ConcatRequest { s1, s2 } => {
                s1.write(buf);
                s2.write(buf);
            }
            Self::ConcatResponse { out } => out.write(buf),
            Self::CallbackResponse { value } => buf.extend_from_slice(&value.to_le_bytes()),
            Self::CallbackRequest | Self::SetCallbackRequest | Self::SetCallbackResponse => {}
        }
    }

    /// Parses the packed layout for `(id, direction)`.
    ///
    /// The caller guarantees `bytes.len() == id.static_size(direction)`.
    pub(crate) fn read(id: MsgId, direction: Direction, bytes: &[u8]) -> Result<Self> {
        debug_assert_eq!(bytes.len(), id.static_size(direction));
        let payload = match (id, direction) {
            (MsgId::Invert, Direction::Request) => Self::InvertRequest {
                input: read_bool(id, direction, bytes[0])?,
            },
            (MsgId::Invert, Direction::Response) => Self::InvertResponse {
                output: read_bool(id, direction, bytes[0])?,
            },
            (MsgId::Concat, Direction::Request) => Self::ConcatRequest {
                s1: VarRef::read(&bytes[..VAR_REF_SIZE]),
                s2: VarRef::read(&bytes[VAR_REF_SIZE..]),
            },
            (MsgId::Concat, Direction::Response) => Self::ConcatResponse {
                out: VarRef::read(bytes),
            },
            (MsgId::Callback, Direction::Request) => Self::CallbackRequest,
            (MsgId::Callback, Direction::Response) => Self::CallbackResponse {
                value: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            },
            (MsgId::SetCallback, Direction::Request) => Self::SetCallbackRequest,
            (MsgId::SetCallback, Direction::Response) => Self::SetCallbackResponse,
        };
        Ok(payload)
    }
}

fn read_bool(id: MsgId, direction: Direction, b: u8) -> Result<bool> {
    match b {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::MalformedPayload { id, direction, detail: "bool byte is neither 0 nor 1" }),
    }
}
