//! # Error Definitions
//!
//! Every way a bridged call can fail on the initiating side.

use std::path::PathBuf;

use duopack::MsgId;

#[derive(Debug, Clone)]
pub enum Error {
    /// A send or receive on one of the channels failed.
    Transport(duonet::Error),
    /// A message could not be encoded, decoded, or dereferenced.
    Codec(duopack::Error),
    /// The response carried a different id than the request.
    UnexpectedResponseId { expected: MsgId, received: MsgId },
    /// The response decoded, but not into the payload the call expects.
    UnexpectedPayload(MsgId),
    /// Only requests can be exchanged.
    NotARequest(MsgId),
    /// The companion executable could not be located or started.
    ProcessLaunchFailed { path: PathBuf, reason: String },
    /// The companion's exit status could not be queried.
    ProcessQueryFailed(String),
    /// The companion started but never announced its endpoints.
    CompanionNotReady(String),
    /// No request channel is connected.
    NotConnected,
    /// The exchange did not complete within the configured timeout.
    Timeout,
    /// The session was shut down.
    SessionClosed,
    /// A caller-supplied output buffer cannot hold the result.
    OutputTooSmall { needed: usize, capacity: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Codec(e) => write!(f, "Codec error: {}", e),
            Self::UnexpectedResponseId { expected, received } => {
                write!(f, "Waiting for response to {}, but received {}", expected, received)
            }
            Self::UnexpectedPayload(id) => write!(f, "Unexpected payload for {}", id),
            Self::NotARequest(id) => write!(f, "Message {} is not a request", id),
            Self::ProcessLaunchFailed { path, reason } => {
                write!(f, "Cannot start companion {}: {}", path.display(), reason)
            }
            Self::ProcessQueryFailed(msg) => write!(f, "Cannot query companion status: {}", msg),
            Self::CompanionNotReady(msg) => write!(f, "Companion not ready: {}", msg),
            Self::NotConnected => write!(f, "Request channel is not connected"),
            Self::Timeout => write!(f, "Exchange timed out"),
            Self::SessionClosed => write!(f, "Session has been shut down"),
            Self::OutputTooSmall { needed, capacity } => {
                write!(f, "Output buffer holds {} bytes, result needs {}", capacity, needed)
            }
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
