//! # Transport Abstraction
//!
//! A minimal, async interface for moving frames between the two processes.

use std::fmt;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The peer ended the stream cleanly. Expected during shutdown.
    ConnectionClosed,
    /// The stream broke mid-frame or was reset by the peer.
    ConnectionLost(String),
    /// A frame exceeded the transport's size limit. The stream is still in sync.
    FrameTooLarge { size: usize, max: usize },
    /// Could not bind a listener.
    Bind { addr: String, reason: String },
    /// Could not accept a peer.
    Accept(String),
    /// Could not connect to a listener.
    Connect { addr: String, reason: String },
    /// The operation did not finish in time.
    Timeout,
    /// Generic I/O failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "Connection closed by peer"),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::FrameTooLarge { size, max } => {
                write!(f, "Frame of {} bytes exceeds transport limit of {}", size, max)
            }
            Self::Bind { addr, reason } => write!(f, "Cannot listen on {}: {}", addr, reason),
            Self::Accept(msg) => write!(f, "Accept failed: {}", msg),
            Self::Connect { addr, reason } => write!(f, "Cannot connect to {}: {}", addr, reason),
            Self::Timeout => write!(f, "Transport operation timed out"),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => Self::ConnectionLost(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A reliable, frame-preserving, bidirectional channel to one peer.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one whole frame.
    ///
    /// Returns only after every byte has been handed to the stream, or on the first failure.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Receives exactly one frame.
    ///
    /// # invariants
    /// - Returns `Err(Error::ConnectionClosed)` when the peer ended the stream.
    /// - Never returns a partial frame.
    async fn recv(&self) -> Result<Vec<u8>>;

    /// Ends the sending side. The peer observes `ConnectionClosed`.
    async fn close(&self) -> Result<()>;
}
