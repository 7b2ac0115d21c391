//! # Logging
//!
//! Routes this process's `tracing` output into a log file. Logging stays off
//! until it is enabled, and can be enabled once per process.

use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Longest accepted log directory, in bytes, including the terminator of a C string.
pub const LOG_DIR_MAXLEN: usize = 2048;

pub const LOG_FILE_NAME: &str = "duobridge.log";

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug)]
pub enum LoggingError {
    /// The directory path is `LOG_DIR_MAXLEN` bytes or longer.
    PathTooLong(usize),
    /// No terminating NUL within `LOG_DIR_MAXLEN` bytes.
    Unterminated,
    /// The path is not valid UTF-8.
    InvalidPath,
    /// A global subscriber is already installed.
    AlreadyEnabled,
    Io(std::io::Error),
}

impl std::fmt::Display for LoggingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PathTooLong(len) => write!(f, "Log directory is {} bytes, limit is {}", len, LOG_DIR_MAXLEN),
            Self::Unterminated => write!(f, "Log directory is not terminated within {} bytes", LOG_DIR_MAXLEN),
            Self::InvalidPath => write!(f, "Log directory is not valid UTF-8"),
            Self::AlreadyEnabled => write!(f, "Logging is already enabled"),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for LoggingError {}

impl From<std::io::Error> for LoggingError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Writes all further log output to `LOG_FILE_NAME` inside `dir`, creating the
/// directory if needed. Returns the log file path.
pub fn enable_logging(dir: impl AsRef<Path>) -> Result<PathBuf, LoggingError> {
    let dir = dir.as_ref();
    let len = dir.as_os_str().len();
    if len >= LOG_DIR_MAXLEN {
        return Err(LoggingError::PathTooLong(len));
    }
    if GUARD.get().is_some() {
        return Err(LoggingError::AlreadyEnabled);
    }

    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false).with_thread_ids(true))
        .try_init()
        .map_err(|_| LoggingError::AlreadyEnabled)?;

    // lost race: the other guard already keeps a writer alive
    let _ = GUARD.set(guard);

    let path = dir.join(LOG_FILE_NAME);
    info!("Logging to {}", path.display());
    Ok(path)
}

/// Same as `enable_logging`, for a NUL-terminated path as handed over a C boundary.
pub fn enable_logging_cstr(path: &[u8]) -> Result<PathBuf, LoggingError> {
    let len = path
        .iter()
        .take(LOG_DIR_MAXLEN)
        .position(|b| *b == 0)
        .ok_or(LoggingError::Unterminated)?;
    let dir = std::str::from_utf8(&path[..len]).map_err(|_| LoggingError::InvalidPath)?;
    enable_logging(dir)
}
