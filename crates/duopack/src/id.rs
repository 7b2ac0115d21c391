//! # Message Identifiers
//!
//! The table of bridged functions and callback kinds, and the shape of each
//! static payload keyed by `(MsgId, Direction)`.

/// Identifies a bridged function or callback kind.
///
/// Ids are stable across processes for a given `PROTOCOL_VERSION` and always fit one byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MsgId {
    /// `invert(bool) -> bool`
    Invert = 0,
    /// `concat(s1, s2) -> out`
    Concat = 1,
    /// A callback fired by the bridged library. Only ever sent unsolicited, as a Response.
    Callback = 2,
    /// Registers the initiator's callback with the bridged library.
    SetCallback = 3,
}

impl MsgId {
    /// Every id, in wire order.
    pub const ALL: [MsgId; 4] = [MsgId::Invert, MsgId::Concat, MsgId::Callback, MsgId::SetCallback];

    /// Returns the id for a given byte, or `None` if unknown.
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(MsgId::Invert),
            1 => Some(MsgId::Concat),
            2 => Some(MsgId::Callback),
            3 => Some(MsgId::SetCallback),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for ids that a compliant initiator never sends as a request.
    pub fn is_unsolicited(self) -> bool {
        matches!(self, MsgId::Callback)
    }

    /// Byte size of the static payload for this id in the given direction.
    pub fn static_size(self, direction: Direction) -> usize {
        match (self, direction) {
            (MsgId::Invert, Direction::Request) => 1,
            (MsgId::Invert, Direction::Response) => 1,
            (MsgId::Concat, Direction::Request) => 2 * crate::var::VAR_REF_SIZE,
            (MsgId::Concat, Direction::Response) => crate::var::VAR_REF_SIZE,
            (MsgId::Callback, Direction::Request) => 0,
            (MsgId::Callback, Direction::Response) => 4,
            (MsgId::SetCallback, Direction::Request) => 0,
            (MsgId::SetCallback, Direction::Response) => 0,
        }
    }
}

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.as_u8())
    }
}

/// Direction of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Initiator -> companion.
    Request,
    /// Companion -> initiator, including unsolicited callbacks.
    Response,
}
