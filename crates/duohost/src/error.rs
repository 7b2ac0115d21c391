//! # Error Definitions

use duopack::MsgId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The id only ever travels unsolicited, so it cannot have a handler.
    UnsolicitedId(MsgId),
    /// A handler for this id is already registered.
    DuplicateHandler(MsgId),
    /// No callback channel is attached to the emitter.
    Detached,
    /// A bridged function failed.
    Handler(String),
    Transport(duonet::Error),
    Codec(duopack::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsolicitedId(id) => write!(f, "{} cannot be handled as a request", id),
            Self::DuplicateHandler(id) => write!(f, "Handler for {} already registered", id),
            Self::Detached => write!(f, "No callback channel attached"),
            Self::Handler(msg) => write!(f, "Handler failed: {}", msg),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Codec(e) => write!(f, "Codec error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<duonet::Error> for Error {
    fn from(e: duonet::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<duopack::Error> for Error {
    fn from(e: duopack::Error) -> Self {
        Self::Codec(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
